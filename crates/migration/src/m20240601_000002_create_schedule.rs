//! Create the schedule tables:
//! - `weekly_schedule`: one template row per ISO weekday
//! - `master_schedule`: per-date overrides
//! - `schedule_settings`: singleton slot-generation settings
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WeeklySchedule::Table)
                    .if_not_exists()
                    .col(pk_auto(WeeklySchedule::Id))
                    .col(integer(WeeklySchedule::DayOfWeek).unique_key())
                    .col(time(WeeklySchedule::StartTime))
                    .col(time(WeeklySchedule::EndTime))
                    .col(time_null(WeeklySchedule::BreakStartTime))
                    .col(time_null(WeeklySchedule::BreakEndTime))
                    .col(boolean(WeeklySchedule::IsWorking).default(true))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MasterSchedule::Table)
                    .if_not_exists()
                    .col(pk_auto(MasterSchedule::Id))
                    .col(date(MasterSchedule::Date).unique_key())
                    .col(time(MasterSchedule::StartTime))
                    .col(time(MasterSchedule::EndTime))
                    .col(time_null(MasterSchedule::BreakStartTime))
                    .col(time_null(MasterSchedule::BreakEndTime))
                    .col(boolean(MasterSchedule::IsWorking).default(true))
                    .col(text_null(MasterSchedule::Notes))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScheduleSettings::Table)
                    .if_not_exists()
                    .col(pk_auto(ScheduleSettings::Id))
                    .col(integer(ScheduleSettings::SlotIntervalMinutes).default(30))
                    .col(integer(ScheduleSettings::OverrunMinutes).default(30))
                    .col(integer(ScheduleSettings::BreakDurationMinutes).default(30))
                    .col(time(ScheduleSettings::WorkingHoursStart))
                    .col(time(ScheduleSettings::WorkingHoursEnd))
                    .col(timestamp_with_time_zone(ScheduleSettings::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ScheduleSettings::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MasterSchedule::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(WeeklySchedule::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum WeeklySchedule { Table, Id, DayOfWeek, StartTime, EndTime, BreakStartTime, BreakEndTime, IsWorking }

#[derive(DeriveIden)]
enum MasterSchedule { Table, Id, Date, StartTime, EndTime, BreakStartTime, BreakEndTime, IsWorking, Notes }

#[derive(DeriveIden)]
enum ScheduleSettings { Table, Id, SlotIntervalMinutes, OverrunMinutes, BreakDurationMinutes, WorkingHoursStart, WorkingHoursEnd, UpdatedAt }
