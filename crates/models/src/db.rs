use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

/// Build pool options from the `[database]` config section.
pub fn connect_options(cfg: &configs::DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(cfg.url.clone());
    opt.max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(cfg.max_lifetime_secs))
        .sqlx_logging(cfg.sqlx_logging);
    // An in-memory SQLite database lives and dies with its connection.
    if cfg.url.contains(":memory:") {
        opt.max_connections(1).min_connections(1);
    }
    opt
}

pub async fn connect_with_config(cfg: &configs::DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let db = Database::connect(connect_options(cfg)).await?;
    tracing::info!(backend = ?db.get_database_backend(), max = cfg.max_connections, "database connected");
    Ok(db)
}

/// Fresh private in-memory SQLite database.
pub async fn connect_memory() -> anyhow::Result<DatabaseConnection> {
    let cfg = configs::DatabaseConfig { url: "sqlite::memory:".into(), ..Default::default() };
    connect_with_config(&cfg).await
}
