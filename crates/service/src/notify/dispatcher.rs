use std::sync::Arc;

use arc_swap::ArcSwap;
use sea_orm::DatabaseConnection;
use tracing::{instrument, warn};

use common::metrics::NOTIFICATIONS_TOTAL;
use models::{booking, email_settings, notification_log};

use super::history::{self, FAILED, SENT, SKIPPED};
use super::messages::{self, Audience, Message};
use super::notifier::Notifier;
use super::settings;
use crate::errors::ServiceError;

/// Fans messages out to the configured channels and logs every outcome.
pub struct Dispatcher {
    db: DatabaseConnection,
    notifiers: Vec<Arc<dyn Notifier>>,
    settings: ArcSwap<email_settings::Model>,
}

impl Dispatcher {
    pub async fn load(db: DatabaseConnection, notifiers: Vec<Arc<dyn Notifier>>) -> Result<Self, ServiceError> {
        let current = settings::get_settings(&db).await?;
        Ok(Self { db, notifiers, settings: ArcSwap::from_pointee(current) })
    }

    /// Swap in freshly saved settings.
    pub fn reload(&self, current: email_settings::Model) {
        self.settings.store(Arc::new(current));
    }

    pub fn settings(&self) -> Arc<email_settings::Model> {
        self.settings.load_full()
    }

    async fn log(&self, msg: &Message, channel: &str, recipient: String, status: &str, error: Option<String>) -> Option<notification_log::Model> {
        NOTIFICATIONS_TOTAL.with_label_values(&[channel, status]).inc();
        match history::record(&self.db, msg, channel, recipient, status, error).await {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(error = %e, "failed to write notification log");
                None
            }
        }
    }

    /// Deliver one message; returns the log rows written.
    #[instrument(skip(self, msg), fields(kind = msg.kind.as_str(), booking_id = ?msg.booking_id))]
    pub async fn dispatch(&self, msg: Message) -> Vec<notification_log::Model> {
        let current = self.settings();
        let recipient = msg.recipient.clone().unwrap_or_default();
        if !current.notifications_enabled {
            return self.log(&msg, "none", recipient, SKIPPED, Some("notifications disabled".into())).await.into_iter().collect();
        }
        if msg.audience == Audience::Client && msg.recipient.is_none() {
            return self.log(&msg, "none", recipient, SKIPPED, Some("client has no e-mail".into())).await.into_iter().collect();
        }

        let channels: Vec<&Arc<dyn Notifier>> = self.notifiers.iter().filter(|n| n.accepts(&msg)).collect();
        if channels.is_empty() {
            return self.log(&msg, "none", recipient, SKIPPED, Some("no delivery channel configured".into())).await.into_iter().collect();
        }

        let mut rows = Vec::new();
        for n in channels {
            let outcome = n.deliver(&msg, &current).await;
            let (status, error) = match outcome {
                Ok(()) => (SENT, None),
                Err(e) => {
                    warn!(channel = n.channel(), error = %e, "notification failed");
                    (FAILED, Some(e.to_string()))
                }
            };
            rows.extend(self.log(&msg, n.channel(), n.recipient(&msg), status, error).await);
        }
        rows
    }

    pub async fn booking_created(&self, b: &booking::Model) -> Vec<notification_log::Model> {
        let admin_email = self.settings().admin_email.clone();
        let mut rows = self.dispatch(messages::new_booking(b, &admin_email)).await;
        rows.extend(self.dispatch(messages::client_confirmation(b)).await);
        rows
    }

    pub async fn status_changed(&self, b: &booking::Model) -> Vec<notification_log::Model> {
        self.dispatch(messages::status_update(b)).await
    }

    /// Fire-and-forget variants used by request handlers.
    pub fn spawn_booking_created(self: &Arc<Self>, b: booking::Model) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.booking_created(&b).await;
        });
    }

    pub fn spawn_status_changed(self: &Arc<Self>, b: booking::Model) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.status_changed(&b).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::messages::tests::booking;
    use crate::notify::notifier::NotifyError;
    use crate::notify::outbox::LogNotifier;
    use crate::notify::smtp::tests::RecordingTransport;
    use crate::notify::smtp::SmtpNotifier;
    use crate::notify::settings::{save_settings, EmailSettingsInput};
    use crate::pagination::Pagination;
    use crate::test_support::get_db;
    use async_trait::async_trait;
    use models::booking::BookingStatus;

    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        fn channel(&self) -> &'static str { "broken" }
        fn accepts(&self, msg: &Message) -> bool { msg.audience == Audience::Admin }
        async fn deliver(&self, _msg: &Message, _settings: &email_settings::Model) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected("500".into()))
        }
    }

    async fn enable(db: &DatabaseConnection) -> email_settings::Model {
        save_settings(
            db,
            EmailSettingsInput {
                smtp_host: "smtp.yandex.ru".into(),
                smtp_port: 587,
                sender_email: "bot@example.ru".into(),
                admin_email: "admin@example.ru".into(),
                notifications_enabled: true,
            },
        )
        .await
        .expect("settings")
    }

    #[tokio::test]
    async fn disabled_notifications_are_skipped() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let d = Dispatcher::load(db.clone(), vec![Arc::new(LogNotifier)]).await?;
        let rows = d.booking_created(&booking(BookingStatus::Pending, Some("anna@example.ru"))).await;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.status == SKIPPED));
        Ok(())
    }

    #[tokio::test]
    async fn every_channel_outcome_is_logged() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let mail = RecordingTransport::default();
        let notifiers: Vec<Arc<dyn Notifier>> =
            vec![Arc::new(LogNotifier), Arc::new(Broken), Arc::new(SmtpNotifier::new(mail.clone(), None))];
        let d = Dispatcher::load(db.clone(), notifiers).await?;
        d.reload(enable(&db).await);

        let rows = d.booking_created(&booking(BookingStatus::Pending, None)).await;
        // admin: log, broken, e-mail to the admin; client: skipped for lack of e-mail
        let statuses: Vec<(&str, &str)> = rows.iter().map(|r| (r.channel.as_str(), r.status.as_str())).collect();
        assert_eq!(statuses, vec![("log", SENT), ("broken", FAILED), ("email", SENT), ("none", SKIPPED)]);
        assert_eq!(rows[0].recipient, "outbox");
        assert_eq!(rows[1].error.as_deref(), Some("rejected by channel: 500"));
        assert_eq!(rows[2].recipient, "admin@example.ru");

        let rows = d.status_changed(&booking(BookingStatus::Confirmed, Some("anna@example.ru"))).await;
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].channel.as_str(), rows[0].status.as_str()), ("email", SENT));
        assert_eq!(rows[0].recipient, "anna@example.ru");
        assert!(rows[0].subject.contains("подтверждена"));

        let sent = mail.sent.lock().map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let to: Vec<&str> = sent.iter().map(|(_, to, _)| to[0].as_str()).collect();
        assert_eq!(to, vec!["admin@example.ru", "anna@example.ru"]);
        assert_eq!(sent[1].0.host, "smtp.yandex.ru");

        assert_eq!(history::list(&db, Pagination::default()).await?.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn client_mail_is_never_marked_sent_without_a_mail_channel() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let d = Dispatcher::load(db.clone(), vec![Arc::new(LogNotifier)]).await?;
        d.reload(enable(&db).await);

        let rows = d.status_changed(&booking(BookingStatus::Confirmed, Some("anna@example.ru"))).await;
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].channel.as_str(), rows[0].status.as_str()), ("none", SKIPPED));
        assert_eq!(rows[0].error.as_deref(), Some("no delivery channel configured"));
        Ok(())
    }
}
