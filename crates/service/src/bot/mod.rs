//! Telegram booking bot: the same wizard as the site, driven by inline keyboards.
//! Also answers the chakra explorer `/1`..`/7` link commands.

pub mod update;
pub mod callback;
pub mod reply;
pub mod handler;

pub use callback::Callback;
pub use handler::{BookingBot, BotSettings};
pub use reply::{BotApi, Button, Markup, Reply};
pub use update::Update;
