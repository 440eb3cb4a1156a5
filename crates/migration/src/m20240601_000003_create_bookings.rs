//! Create `bookings` with an optional FK to `services`.
//!
//! The service name is copied at booking time so history survives catalogue edits.
//! `telegram_chat_id` links bookings made through the bot to their chat.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(pk_auto(Bookings::Id))
                    .col(integer_null(Bookings::ServiceId))
                    .col(string_len(Bookings::ServiceName, 255))
                    .col(date(Bookings::BookingDate))
                    .col(time(Bookings::StartTime))
                    .col(time(Bookings::EndTime))
                    .col(string_len(Bookings::ClientName, 255))
                    .col(string_len(Bookings::ClientPhone, 32))
                    .col(string_len_null(Bookings::ClientEmail, 255))
                    .col(text_null(Bookings::Notes))
                    .col(big_integer_null(Bookings::TelegramChatId))
                    .col(string_len(Bookings::Status, 16).default("pending"))
                    .col(timestamp_with_time_zone(Bookings::CreatedAt))
                    .col(timestamp_with_time_zone(Bookings::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_service")
                            .from(Bookings::Table, Bookings::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Bookings::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    ServiceId,
    ServiceName,
    BookingDate,
    StartTime,
    EndTime,
    ClientName,
    ClientPhone,
    ClientEmail,
    Notes,
    TelegramChatId,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Services { Table, Id }
