//! Create `login_attempts` (admin password throttling) and `page_visits` (site analytics).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoginAttempts::Table)
                    .if_not_exists()
                    .col(pk_auto(LoginAttempts::Id))
                    .col(string_len(LoginAttempts::IpAddress, 64))
                    .col(boolean(LoginAttempts::Success))
                    .col(timestamp_with_time_zone(LoginAttempts::AttemptTime))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PageVisits::Table)
                    .if_not_exists()
                    .col(pk_auto(PageVisits::Id))
                    .col(string_len(PageVisits::PageUrl, 512))
                    .col(string_len(PageVisits::UserIp, 64))
                    .col(text(PageVisits::UserAgent))
                    .col(text(PageVisits::Referrer))
                    .col(timestamp_with_time_zone(PageVisits::VisitedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PageVisits::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(LoginAttempts::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum LoginAttempts { Table, Id, IpAddress, Success, AttemptTime }

#[derive(DeriveIden)]
enum PageVisits { Table, Id, PageUrl, UserIp, UserAgent, Referrer, VisitedAt }
