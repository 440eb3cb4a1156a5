#![cfg(test)]
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;

/// Fresh in-memory database with the schema and seed data applied.
///
/// Every call gets its own SQLite instance, so tests never see each other's rows.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let db = models::db::connect_memory().await?;
    migration::Migrator::up(&db, None).await?;
    crate::db::seed::seed_defaults(&db).await?;
    Ok(db)
}
