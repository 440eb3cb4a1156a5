//! Create the chakra explorer tables:
//! - `chakra_users`: explorer accounts keyed by telegram id
//! - `chakras`: the seven centres with descriptive fields
//! - `chakra_entries`: concepts, questions, responsibilities, sciences and organs
//! - `chakra_edit_history`: field-level audit trail
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChakraUsers::Table)
                    .if_not_exists()
                    .col(pk_auto(ChakraUsers::Id))
                    .col(string_len(ChakraUsers::Name, 255))
                    .col(string_len_null(ChakraUsers::Email, 255))
                    .col(string_len(ChakraUsers::Role, 32).default("viewer"))
                    .col(boolean(ChakraUsers::IsAdmin).default(false))
                    .col(string_len_null(ChakraUsers::TelegramId, 64).unique_key())
                    .col(string_len_null(ChakraUsers::TelegramUsername, 128))
                    .col(integer_null(ChakraUsers::ChakraId))
                    .col(timestamp_with_time_zone(ChakraUsers::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Chakras::Table)
                    .if_not_exists()
                    .col(pk_auto(Chakras::Id))
                    .col(string_len(Chakras::Name, 128))
                    .col(string_len(Chakras::Color, 64))
                    .col(integer(Chakras::Position))
                    .col(text_null(Chakras::RightStatement))
                    .col(text_null(Chakras::Description))
                    .col(string_len_null(Chakras::Continent, 128))
                    .col(string_len_null(Chakras::Status, 64))
                    .col(string_len_null(Chakras::SymbolUrl, 512))
                    .col(integer_null(Chakras::ResponsibleUserId))
                    .col(timestamp_with_time_zone(Chakras::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chakras_responsible")
                            .from(Chakras::Table, Chakras::ResponsibleUserId)
                            .to(ChakraUsers::Table, ChakraUsers::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChakraEntries::Table)
                    .if_not_exists()
                    .col(pk_auto(ChakraEntries::Id))
                    .col(integer(ChakraEntries::ChakraId))
                    .col(string_len(ChakraEntries::Kind, 32))
                    .col(text(ChakraEntries::Title))
                    .col(text_null(ChakraEntries::Details))
                    .col(integer_null(ChakraEntries::UserId))
                    .col(timestamp_with_time_zone(ChakraEntries::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chakra_entries_chakra")
                            .from(ChakraEntries::Table, ChakraEntries::ChakraId)
                            .to(Chakras::Table, Chakras::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chakra_entries_user")
                            .from(ChakraEntries::Table, ChakraEntries::UserId)
                            .to(ChakraUsers::Table, ChakraUsers::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChakraEditHistory::Table)
                    .if_not_exists()
                    .col(pk_auto(ChakraEditHistory::Id))
                    .col(integer(ChakraEditHistory::ChakraId))
                    .col(integer_null(ChakraEditHistory::UserId))
                    .col(string_len(ChakraEditHistory::FieldName, 128))
                    .col(text_null(ChakraEditHistory::OldValue))
                    .col(text_null(ChakraEditHistory::NewValue))
                    .col(timestamp_with_time_zone(ChakraEditHistory::ChangedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ChakraEditHistory::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ChakraEntries::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Chakras::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ChakraUsers::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ChakraUsers { Table, Id, Name, Email, Role, IsAdmin, TelegramId, TelegramUsername, ChakraId, CreatedAt }

#[derive(DeriveIden)]
enum Chakras {
    Table,
    Id,
    Name,
    Color,
    Position,
    RightStatement,
    Description,
    Continent,
    Status,
    SymbolUrl,
    ResponsibleUserId,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ChakraEntries { Table, Id, ChakraId, Kind, Title, Details, UserId, CreatedAt }

#[derive(DeriveIden)]
enum ChakraEditHistory { Table, Id, ChakraId, UserId, FieldName, OldValue, NewValue, ChangedAt }
