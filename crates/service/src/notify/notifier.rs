use async_trait::async_trait;
use thiserror::Error;

use models::email_settings;

use super::messages::Message;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rejected by channel: {0}")]
    Rejected(String),
}

/// A delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;

    /// Whether this channel handles the message at all.
    fn accepts(&self, msg: &Message) -> bool;

    /// Address written to the delivery log.
    fn recipient(&self, msg: &Message) -> String {
        msg.recipient.clone().unwrap_or_default()
    }

    /// `settings` is the snapshot current when the dispatch started.
    async fn deliver(&self, msg: &Message, settings: &email_settings::Model) -> Result<(), NotifyError>;
}
