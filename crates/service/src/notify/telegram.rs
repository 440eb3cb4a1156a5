use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use models::email_settings;

use super::messages::{Audience, Message};
use super::notifier::{Notifier, NotifyError};

/// Bot API client bound to one bot token. Shared by the admin notifier and the booking bot.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self { client, base: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token) })
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base)
    }

    /// POST a JSON payload to a Bot API method; non-2xx answers are rejections.
    pub async fn call<T: Serialize + ?Sized>(&self, method: &str, payload: &T) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{status}: {body}")));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

/// Posts admin notices to a chat through the Bot API.
pub struct TelegramNotifier {
    api: TelegramClient,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api: TelegramClient, chat_id: &str) -> Self {
        Self { api, chat_id: chat_id.to_string() }
    }

    /// `None` unless both token and chat id are configured.
    pub fn from_config(cfg: &configs::TelegramConfig) -> Result<Option<Self>, NotifyError> {
        match (&cfg.bot_token, &cfg.chat_id) {
            (Some(token), Some(chat)) if cfg.is_configured() => {
                Ok(Some(Self::new(TelegramClient::new(&cfg.api_base, token)?, chat)))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &'static str { "telegram" }

    fn accepts(&self, msg: &Message) -> bool {
        msg.audience == Audience::Admin
    }

    fn recipient(&self, _msg: &Message) -> String {
        self.chat_id.clone()
    }

    async fn deliver(&self, msg: &Message, _settings: &email_settings::Model) -> Result<(), NotifyError> {
        let payload = SendMessage { chat_id: &self.chat_id, text: format!("{}\n\n{}", msg.subject, msg.body) };
        self.api.call("sendMessage", &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::settings::defaults;

    #[test]
    fn unconfigured_bot_is_skipped() {
        let cfg = configs::TelegramConfig::default();
        assert!(TelegramNotifier::from_config(&cfg).expect("build").is_none());
    }

    #[test]
    fn url_is_built_from_base_and_token() {
        let api = TelegramClient::new("https://api.telegram.org/", "123:abc").expect("build");
        assert_eq!(api.method_url("sendMessage"), "https://api.telegram.org/bot123:abc/sendMessage");
        assert_eq!(TelegramNotifier::new(api, "-100").channel(), "telegram");
    }

    #[tokio::test]
    async fn unreachable_api_is_a_transport_error() {
        let n = TelegramNotifier::new(TelegramClient::new("http://127.0.0.1:9", "t").expect("build"), "1");
        let msg = crate::notify::messages::new_booking(
            &crate::notify::messages::tests::booking(models::booking::BookingStatus::Pending, None),
            "",
        );
        assert!(matches!(n.deliver(&msg, &defaults()).await, Err(NotifyError::Transport(_))));
    }
}
