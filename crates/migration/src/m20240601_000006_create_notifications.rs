//! Create `email_settings` (singleton) and `notification_log` (delivery outcomes).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EmailSettings::Table)
                    .if_not_exists()
                    .col(pk_auto(EmailSettings::Id))
                    .col(string_len(EmailSettings::SmtpHost, 255))
                    .col(integer(EmailSettings::SmtpPort))
                    .col(string_len(EmailSettings::SenderEmail, 255))
                    .col(string_len(EmailSettings::AdminEmail, 255))
                    .col(boolean(EmailSettings::NotificationsEnabled).default(true))
                    .col(timestamp_with_time_zone(EmailSettings::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NotificationLog::Table)
                    .if_not_exists()
                    .col(pk_auto(NotificationLog::Id))
                    .col(integer_null(NotificationLog::BookingId))
                    .col(string_len(NotificationLog::Kind, 32))
                    .col(string_len(NotificationLog::Channel, 32))
                    .col(string_len(NotificationLog::Recipient, 255))
                    .col(string_len(NotificationLog::Subject, 255))
                    .col(text(NotificationLog::Body))
                    .col(string_len(NotificationLog::Status, 16))
                    .col(text_null(NotificationLog::Error))
                    .col(timestamp_with_time_zone(NotificationLog::CreatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(NotificationLog::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(EmailSettings::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum EmailSettings { Table, Id, SmtpHost, SmtpPort, SenderEmail, AdminEmail, NotificationsEnabled, UpdatedAt }

#[derive(DeriveIden)]
enum NotificationLog { Table, Id, BookingId, Kind, Channel, Recipient, Subject, Body, Status, Error, CreatedAt }
