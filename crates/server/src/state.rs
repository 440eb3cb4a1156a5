use std::sync::Arc;

use sea_orm::DatabaseConnection;

use service::admin::repo::seaorm::SeaOrmLoginAttemptRepository;
use service::admin::AdminAuthService;
use service::bot::BookingBot;
use service::chakra::ChakraAuth;
use service::db::booking_service::BookingPolicy;
use service::db::review_service::ReviewCache;
use service::notify::Dispatcher;
use service::scheduling::BusinessClock;

pub type AdminAuth = AdminAuthService<SeaOrmLoginAttemptRepository>;

/// Shared handles for every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub admin: Arc<AdminAuth>,
    pub chakra_auth: ChakraAuth,
    pub reviews: ReviewCache,
    pub notifier: Arc<Dispatcher>,
    pub policy: BookingPolicy,
    /// Set when a bot token is configured.
    pub bot: Option<Arc<BookingBot>>,
}

impl AppState {
    pub fn clock(&self) -> &BusinessClock {
        &self.policy.clock
    }
}
