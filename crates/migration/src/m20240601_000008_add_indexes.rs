use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Bookings: day view and availability scan
        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_date_start")
                    .table(Bookings::Table)
                    .col(Bookings::BookingDate)
                    .col(Bookings::StartTime)
                    .to_owned(),
            )
            .await?;

        // Reviews: public listing filters on status
        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_status_created")
                    .table(Reviews::Table)
                    .col(Reviews::Status)
                    .col(Reviews::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // LoginAttempts: failures per ip within a window
        manager
            .create_index(
                Index::create()
                    .name("idx_login_attempts_ip_time")
                    .table(LoginAttempts::Table)
                    .col(LoginAttempts::IpAddress)
                    .col(LoginAttempts::AttemptTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_page_visits_visited_at")
                    .table(PageVisits::Table)
                    .col(PageVisits::VisitedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chakra_entries_chakra_kind")
                    .table(ChakraEntries::Table)
                    .col(ChakraEntries::ChakraId)
                    .col(ChakraEntries::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chakra_history_chakra")
                    .table(ChakraEditHistory::Table)
                    .col(ChakraEditHistory::ChakraId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_index(Index::drop().name("idx_chakra_history_chakra").table(ChakraEditHistory::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_chakra_entries_chakra_kind").table(ChakraEntries::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_page_visits_visited_at").table(PageVisits::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_login_attempts_ip_time").table(LoginAttempts::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_reviews_status_created").table(Reviews::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_bookings_date_start").table(Bookings::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Bookings { Table, BookingDate, StartTime }

#[derive(DeriveIden)]
enum Reviews { Table, Status, CreatedAt }

#[derive(DeriveIden)]
enum LoginAttempts { Table, IpAddress, AttemptTime }

#[derive(DeriveIden)]
enum PageVisits { Table, VisitedAt }

#[derive(DeriveIden)]
enum ChakraEntries { Table, ChakraId, Kind }

#[derive(DeriveIden)]
enum ChakraEditHistory { Table, ChakraId }
