//! Outgoing messages and the Bot API seam used to send them.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::callback::Callback;
use crate::notify::notifier::NotifyError;
use crate::notify::telegram::TelegramClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(Callback),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(text: impl Into<String>, cb: Callback) -> Self {
        Self { text: text.into(), action: ButtonAction::Callback(cb) }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self { text: text.into(), action: ButtonAction::Url(url.into()) }
    }

    fn to_json(&self) -> Value {
        match &self.action {
            ButtonAction::Callback(cb) => json!({ "text": self.text, "callback_data": cb.to_string() }),
            ButtonAction::Url(url) => json!({ "text": self.text, "url": url }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Inline(Vec<Vec<Button>>),
    /// One-off reply keyboard with a "share my phone" button.
    RequestContact(String),
    RemoveKeyboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: i64,
    pub text: String,
    pub markup: Option<Markup>,
}

impl Reply {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self { chat_id, text: text.into(), markup: None }
    }

    pub fn with_buttons(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.markup = Some(Markup::Inline(rows));
        self
    }

    pub fn with_contact_request(mut self, label: impl Into<String>) -> Self {
        self.markup = Some(Markup::RequestContact(label.into()));
        self
    }

    pub fn removing_keyboard(mut self) -> Self {
        self.markup = Some(Markup::RemoveKeyboard);
        self
    }

    /// Every callback attached to this reply, row by row.
    pub fn callbacks(&self) -> Vec<Callback> {
        match &self.markup {
            Some(Markup::Inline(rows)) => rows
                .iter()
                .flatten()
                .filter_map(|b| match b.action {
                    ButtonAction::Callback(cb) => Some(cb),
                    ButtonAction::Url(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `sendMessage` body.
    pub fn payload(&self) -> Value {
        let mut body = json!({ "chat_id": self.chat_id, "text": self.text });
        let markup = match &self.markup {
            Some(Markup::Inline(rows)) => Some(json!({
                "inline_keyboard": rows.iter().map(|row| row.iter().map(Button::to_json).collect::<Vec<_>>()).collect::<Vec<_>>()
            })),
            Some(Markup::RequestContact(label)) => Some(json!({
                "keyboard": [[{ "text": label, "request_contact": true }]],
                "resize_keyboard": true,
                "one_time_keyboard": true
            })),
            Some(Markup::RemoveKeyboard) => Some(json!({ "remove_keyboard": true })),
            None => None,
        };
        if let (Some(markup), Some(obj)) = (markup, body.as_object_mut()) {
            obj.insert("reply_markup".into(), markup);
        }
        body
    }
}

#[async_trait]
pub trait BotApi: Send + Sync {
    async fn send(&self, reply: &Reply) -> Result<(), NotifyError>;
    async fn answer_callback(&self, callback_id: &str) -> Result<(), NotifyError>;
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn send(&self, reply: &Reply) -> Result<(), NotifyError> {
        self.call("sendMessage", &reply.payload()).await
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), NotifyError> {
        self.call("answerCallbackQuery", &json!({ "callback_query_id": callback_id })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_keyboard_payload() {
        let reply = Reply::text(42, "Выберите действие")
            .with_buttons(vec![vec![Button::callback("Услуги", Callback::Services), Button::url("Сайт", "https://example.ru")]]);
        let body = reply.payload();
        assert_eq!(body["chat_id"], 42);
        assert_eq!(body["reply_markup"]["inline_keyboard"][0][0]["callback_data"], "services");
        assert_eq!(body["reply_markup"]["inline_keyboard"][0][1]["url"], "https://example.ru");
        assert_eq!(reply.callbacks(), vec![Callback::Services]);
    }

    #[test]
    fn contact_request_and_plain_text() {
        let body = Reply::text(1, "Телефон?").with_contact_request("📱 Отправить номер").payload();
        assert_eq!(body["reply_markup"]["keyboard"][0][0]["request_contact"], true);
        assert!(Reply::text(1, "ok").payload().get("reply_markup").is_none());
    }
}
