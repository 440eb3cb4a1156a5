use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use common::utils::logging::init_logging;
use configs::AppConfig;
use service::admin::repo::seaorm::SeaOrmLoginAttemptRepository;
use service::admin::{AdminAuthConfig, AdminAuthService};
use service::bot::{BookingBot, BotApi, BotSettings};
use service::chakra::{service::bootstrap_admin, ChakraAuth};
use service::db::booking_service::BookingPolicy;
use service::db::review_service::ReviewCache;
use service::db::seed;
use service::notify::outbox::LogNotifier;
use service::notify::smtp::SmtpNotifier;
use service::notify::telegram::{TelegramClient, TelegramNotifier};
use service::notify::{Dispatcher, Notifier};
use service::scheduling::BusinessClock;

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

/// Log-backed admin outbox always; e-mail and Telegram when configured.
fn notifiers(cfg: &AppConfig) -> Result<Vec<Arc<dyn Notifier>>, StartupError> {
    let mut out: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
    match SmtpNotifier::from_config(&cfg.smtp) {
        Some(mail) => out.push(Arc::new(mail)),
        None => warn!("smtp password not configured; client e-mails will be logged as skipped"),
    }
    match TelegramNotifier::from_config(&cfg.telegram).map_err(|e| StartupError::InvalidConfig(e.to_string()))? {
        Some(tg) => out.push(Arc::new(tg)),
        None => info!("telegram notifications not configured"),
    }
    Ok(out)
}

fn booking_bot(cfg: &AppConfig, db: &DatabaseConnection, notifier: &Arc<Dispatcher>, policy: BookingPolicy) -> Result<Option<Arc<BookingBot>>, StartupError> {
    let Some(token) = cfg.telegram.bot_token.as_deref().filter(|_| cfg.telegram.bot_enabled()) else {
        info!("telegram bot not configured");
        return Ok(None);
    };
    let api: Arc<dyn BotApi> =
        Arc::new(TelegramClient::new(&cfg.telegram.api_base, token).map_err(|e| StartupError::InvalidConfig(e.to_string()))?);
    let settings = BotSettings::from_config(&cfg.telegram);
    if settings.webhook_secret.is_none() {
        warn!("telegram webhook secret not set; webhook requests are not authenticated");
    }
    Ok(Some(Arc::new(BookingBot::new(db.clone(), api, Arc::clone(notifier), policy, settings))))
}

/// Wire services over an already migrated database.
pub async fn build_state(db: DatabaseConnection, cfg: &AppConfig) -> Result<AppState, StartupError> {
    let admin_cfg = AdminAuthConfig::from_config(&cfg.admin).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    if admin_cfg.password_hash.is_none() {
        warn!("admin password not configured; admin login will fail");
    }
    let repo = Arc::new(SeaOrmLoginAttemptRepository { db: db.clone() });
    let notifier = Arc::new(
        Dispatcher::load(db.clone(), notifiers(cfg)?)
            .await
            .map_err(|e| StartupError::Runtime(e.to_string()))?,
    );
    let policy = BookingPolicy {
        clock: BusinessClock::new(cfg.schedule.utc_offset_minutes),
        horizon_days: cfg.schedule.booking_horizon_days,
    };
    Ok(AppState {
        admin: Arc::new(AdminAuthService::new(repo, admin_cfg)),
        chakra_auth: ChakraAuth::new(&cfg.chakra.jwt_secret, cfg.chakra.token_ttl_hours),
        reviews: ReviewCache::new(Duration::from_secs(cfg.reviews.cache_ttl_secs)),
        bot: booking_bot(cfg, &db, &notifier, policy)?,
        notifier,
        policy,
        db,
    })
}

/// Schema migrations, default catalogue and the optional chakra owner account.
pub async fn prepare_database(db: &DatabaseConnection, cfg: &AppConfig) -> anyhow::Result<()> {
    Migrator::up(db, None).await?;
    seed::seed_defaults(db).await?;
    if let Some(tg) = cfg.chakra.bootstrap_admin_telegram_id.as_deref().filter(|t| !t.trim().is_empty()) {
        if let Some(user) = bootstrap_admin(db, tg).await? {
            info!(user_id = user.id, "chakra owner account created");
        }
    }
    Ok(())
}

fn load_bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_and_validate()?;
    init_logging(&cfg.server.log_format);

    common::env::ensure_env(&cfg.server.frontend_dir).await?;
    common::env::ensure_sqlite_dir(&cfg.database.url).await?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    prepare_database(&db, &cfg).await?;
    let state = build_state(db, &cfg).await?;

    if let Some(admin_addr) = cfg.server.admin_addr.as_deref() {
        common::admin_http::spawn_admin_server(admin_addr, common::metrics::encode_metrics).await?;
    }

    let app: Router = routes::build_router(state, &cfg.server.frontend_dir);

    let addr = load_bind_addr(&cfg)?;
    info!(%addr, "starting server crate");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
