//! Booking notifications: message rendering, delivery channels and the delivery log.

pub mod messages;
pub mod notifier;
pub mod telegram;
pub mod smtp;
pub mod outbox;
pub mod settings;
pub mod history;
pub mod dispatcher;

pub use dispatcher::Dispatcher;
pub use messages::{Audience, Message, MessageKind};
pub use notifier::{Notifier, NotifyError};
