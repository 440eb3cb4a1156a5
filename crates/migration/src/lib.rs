//! Migrator registering table migrations in dependency order.
//! Indexes are applied last; default rows are seeded by the service layer.
pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_services;
mod m20240601_000002_create_schedule;
mod m20240601_000003_create_bookings;
mod m20240601_000004_create_reviews;
mod m20240601_000005_create_site_activity;
mod m20240601_000006_create_notifications;
mod m20240601_000007_create_chakra;
mod m20240601_000008_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_services::Migration),
            Box::new(m20240601_000002_create_schedule::Migration),
            Box::new(m20240601_000003_create_bookings::Migration),
            Box::new(m20240601_000004_create_reviews::Migration),
            Box::new(m20240601_000005_create_site_activity::Migration),
            Box::new(m20240601_000006_create_notifications::Migration),
            Box::new(m20240601_000007_create_chakra::Migration),
            // Indexes should always be applied last
            Box::new(m20240601_000008_add_indexes::Migration),
        ]
    }
}
