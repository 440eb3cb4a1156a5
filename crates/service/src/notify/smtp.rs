//! E-mail channel: the relay host, port and sender come from the saved
//! settings, the login secret from `[smtp]` / `SMTP_PASSWORD`.

use std::time::Duration;

use async_trait::async_trait;
use lettre::address::Address;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as Email, Tokio1Executor};
use tracing::debug;

use models::email_settings;

use super::messages::Message;
use super::notifier::{Notifier, NotifyError};

pub const SENDER_NAME: &str = "Гармония энергий";
/// Implicit TLS; every other port upgrades with STARTTLS.
const SMTPS_PORT: u16 = 465;

/// Where to connect and as whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    pub host: String,
    pub port: u16,
    pub username: String,
}

/// Seam between message building and the wire.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, relay: &Relay, email: Email) -> Result<(), NotifyError>;
}

/// Real SMTP submission through lettre; a connection is opened per message.
pub struct LettreTransport {
    password: String,
    timeout: Duration,
}

impl LettreTransport {
    pub fn new(password: impl Into<String>, timeout: Duration) -> Self {
        Self { password: password.into(), timeout }
    }
}

#[async_trait]
impl MailTransport for LettreTransport {
    async fn send(&self, relay: &Relay, email: Email) -> Result<(), NotifyError> {
        let builder = if relay.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&relay.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&relay.host)
        }
        .map_err(|e| NotifyError::Transport(e.to_string()))?;
        let mailer = builder
            .port(relay.port)
            .credentials(Credentials::new(relay.username.clone(), self.password.clone()))
            .timeout(Some(self.timeout))
            .build();
        let resp = mailer.send(email).await.map_err(|e| {
            if e.is_permanent() {
                NotifyError::Rejected(e.to_string())
            } else {
                NotifyError::Transport(e.to_string())
            }
        })?;
        debug!(code = %resp.code(), host = %relay.host, "smtp accepted message");
        Ok(())
    }
}

/// Sends every message that carries an e-mail address.
pub struct SmtpNotifier<T = LettreTransport> {
    transport: T,
    username: Option<String>,
}

impl<T: MailTransport> SmtpNotifier<T> {
    /// `username` defaults to the sender address of the saved settings.
    pub fn new(transport: T, username: Option<String>) -> Self {
        Self { transport, username: username.filter(|u| !u.trim().is_empty()) }
    }

    fn relay(&self, settings: &email_settings::Model) -> Result<Relay, NotifyError> {
        let host = settings.smtp_host.trim();
        if host.is_empty() {
            return Err(NotifyError::Rejected("smtp host is not configured".into()));
        }
        let port = u16::try_from(settings.smtp_port)
            .map_err(|_| NotifyError::Rejected(format!("invalid smtp port {}", settings.smtp_port)))?;
        let username = self.username.clone().unwrap_or_else(|| settings.sender_email.trim().to_string());
        Ok(Relay { host: host.to_string(), port, username })
    }
}

impl SmtpNotifier<LettreTransport> {
    /// `None` until a password is configured.
    pub fn from_config(cfg: &configs::SmtpConfig) -> Option<Self> {
        let password = cfg.password.as_deref().filter(|_| cfg.is_configured())?;
        let transport = LettreTransport::new(password, Duration::from_secs(cfg.timeout_secs));
        Some(Self::new(transport, cfg.username.clone()))
    }
}

fn address(field: &str, raw: &str) -> Result<Address, NotifyError> {
    raw.trim().parse::<Address>().map_err(|e| NotifyError::Rejected(format!("{field}: {e}")))
}

/// Plain-text message from the configured sender to `recipient`.
pub fn build_email(msg: &Message, sender: &str, recipient: &str) -> Result<Email, NotifyError> {
    if sender.trim().is_empty() {
        return Err(NotifyError::Rejected("sender e-mail is not configured".into()));
    }
    let from = Mailbox::new(Some(SENDER_NAME.into()), address("sender", sender)?);
    let to = Mailbox::new(None, address("recipient", recipient)?);
    Email::builder()
        .from(from)
        .to(to)
        .subject(msg.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(msg.body.clone())
        .map_err(|e| NotifyError::Rejected(e.to_string()))
}

#[async_trait]
impl<T: MailTransport> Notifier for SmtpNotifier<T> {
    fn channel(&self) -> &'static str { "email" }

    fn accepts(&self, msg: &Message) -> bool {
        msg.recipient.is_some()
    }

    async fn deliver(&self, msg: &Message, settings: &email_settings::Model) -> Result<(), NotifyError> {
        let recipient = msg.recipient.as_deref().ok_or_else(|| NotifyError::Rejected("no recipient".into()))?;
        let email = build_email(msg, &settings.sender_email, recipient)?;
        let relay = self.relay(settings)?;
        self.transport.send(&relay, email).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::notify::messages::{self, tests::booking};
    use crate::notify::settings::defaults;
    use models::booking::BookingStatus;

    /// Keeps what would have gone over the wire.
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        pub sent: Arc<Mutex<Vec<(Relay, Vec<String>, String)>>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, relay: &Relay, email: Email) -> Result<(), NotifyError> {
            let to = email.envelope().to().iter().map(ToString::to_string).collect();
            let raw = String::from_utf8_lossy(&email.formatted()).into_owned();
            self.sent.lock().map_err(|e| NotifyError::Transport(e.to_string()))?.push((relay.clone(), to, raw));
            Ok(())
        }
    }

    pub fn settings() -> email_settings::Model {
        email_settings::Model {
            sender_email: "bot@example.ru".into(),
            admin_email: "admin@example.ru".into(),
            notifications_enabled: true,
            ..defaults()
        }
    }

    #[tokio::test]
    async fn client_message_goes_to_the_saved_relay() {
        let transport = RecordingTransport::default();
        let n = SmtpNotifier::new(transport.clone(), None);
        let msg = messages::status_update(&booking(BookingStatus::Confirmed, Some("anna@example.ru")));
        assert!(n.accepts(&msg));
        n.deliver(&msg, &settings()).await.expect("deliver");

        let sent = transport.sent.lock().expect("lock");
        let (relay, to, raw) = &sent[0];
        assert_eq!(relay, &Relay { host: "smtp.yandex.ru".into(), port: 587, username: "bot@example.ru".into() });
        assert_eq!(to, &vec!["anna@example.ru".to_string()]);
        assert!(raw.contains("To: anna@example.ru"));
        assert!(raw.contains("bot@example.ru"));
    }

    #[tokio::test]
    async fn missing_sender_or_bad_port_is_rejected() {
        let n = SmtpNotifier::new(RecordingTransport::default(), Some("login".into()));
        let msg = messages::client_confirmation(&booking(BookingStatus::Pending, Some("anna@example.ru")));

        let no_sender = email_settings::Model { sender_email: String::new(), ..settings() };
        assert!(matches!(n.deliver(&msg, &no_sender).await, Err(NotifyError::Rejected(_))));

        let bad_port = email_settings::Model { smtp_port: 70_000, ..settings() };
        assert!(matches!(n.deliver(&msg, &bad_port).await, Err(NotifyError::Rejected(_))));

        assert_eq!(n.relay(&settings()).expect("relay").username, "login");
    }

    #[test]
    fn messages_without_address_are_not_accepted() {
        let n = SmtpNotifier::new(RecordingTransport::default(), None);
        assert!(!n.accepts(&messages::client_confirmation(&booking(BookingStatus::Pending, None))));
        assert!(SmtpNotifier::from_config(&configs::SmtpConfig::default()).is_none());
    }
}
