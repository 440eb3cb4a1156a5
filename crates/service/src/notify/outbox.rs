use async_trait::async_trait;
use tracing::info;

use models::email_settings;

use super::messages::{Audience, Message};
use super::notifier::{Notifier, NotifyError};

/// Writes admin notices to the log; the delivery log row is the outbox.
/// Client messages are left to channels that actually reach the client.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn channel(&self) -> &'static str { "log" }

    fn accepts(&self, msg: &Message) -> bool {
        msg.audience == Audience::Admin
    }

    fn recipient(&self, _msg: &Message) -> String {
        "outbox".into()
    }

    async fn deliver(&self, msg: &Message, _settings: &email_settings::Model) -> Result<(), NotifyError> {
        info!(
            target: "notify.outbox",
            kind = msg.kind.as_str(),
            booking_id = ?msg.booking_id,
            subject = %msg.subject,
            "notification"
        );
        Ok(())
    }
}
