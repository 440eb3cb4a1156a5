//! Create `services`: the bookable catalogue (duration drives slot length).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(pk_auto(Services::Id))
                    .col(string_len(Services::Name, 255))
                    .col(text_null(Services::Description))
                    .col(string_len(Services::Category, 128))
                    .col(integer(Services::DurationMinutes))
                    .col(integer(Services::Price))
                    .col(boolean(Services::IsActive).default(true))
                    .col(timestamp_with_time_zone(Services::CreatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Services::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Services { Table, Id, Name, Description, Category, DurationMinutes, Price, IsActive, CreatedAt }
