use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TryIntoModel};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use models::booking::{self, BookingStatus};
use models::{master_schedule, schedule_settings, weekly_schedule};

use crate::db::catalog_service;
use crate::errors::ServiceError;
use crate::scheduling::{self, available_slots, BusinessClock, BusyInterval, SlotRules, WorkingDay};
use crate::timefmt::{add_days, hhmm, hhmm_opt_serde, hhmm_serde};

/// Duration used for the overview when no service is given.
pub const DEFAULT_OVERVIEW_DURATION: i32 = 60;
pub const NON_WORKING_MESSAGE: &str = "Нерабочий день";

fn db_err(e: sea_orm::DbErr) -> ServiceError { ServiceError::Db(e.to_string()) }

fn default_settings() -> schedule_settings::Model {
    let hm = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default();
    schedule_settings::Model {
        id: 0,
        slot_interval_minutes: 30,
        overrun_minutes: 30,
        break_duration_minutes: 30,
        working_hours_start: hm(12),
        working_hours_end: hm(21),
        updated_at: Utc::now(),
    }
}

/// Settings row, or the built-in defaults when it was never saved.
pub async fn get_settings(db: &DatabaseConnection) -> Result<schedule_settings::Model, ServiceError> {
    let row = schedule_settings::Entity::find()
        .order_by_asc(schedule_settings::Column::Id)
        .one(db)
        .await
        .map_err(db_err)?;
    Ok(row.unwrap_or_else(default_settings))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingsInput {
    pub slot_interval_minutes: i32,
    pub overrun_minutes: i32,
    pub break_duration_minutes: i32,
    #[serde(with = "hhmm_serde")]
    pub working_hours_start: NaiveTime,
    #[serde(with = "hhmm_serde")]
    pub working_hours_end: NaiveTime,
}

#[instrument(skip(db, input))]
pub async fn save_settings(db: &DatabaseConnection, input: SettingsInput) -> Result<schedule_settings::Model, ServiceError> {
    schedule_settings::validate(
        input.slot_interval_minutes,
        input.overrun_minutes,
        input.break_duration_minutes,
        input.working_hours_start,
        input.working_hours_end,
    )?;
    let current = schedule_settings::Entity::find()
        .order_by_asc(schedule_settings::Column::Id)
        .one(db)
        .await
        .map_err(db_err)?;
    let mut am: schedule_settings::ActiveModel = match current {
        Some(row) => row.into(),
        None => schedule_settings::ActiveModel { ..Default::default() },
    };
    am.slot_interval_minutes = Set(input.slot_interval_minutes);
    am.overrun_minutes = Set(input.overrun_minutes);
    am.break_duration_minutes = Set(input.break_duration_minutes);
    am.working_hours_start = Set(input.working_hours_start);
    am.working_hours_end = Set(input.working_hours_end);
    am.updated_at = Set(Utc::now());
    let saved = am.save(db).await.map_err(db_err)?;
    let saved = saved.try_into_model().map_err(db_err)?;
    info!(interval = saved.slot_interval_minutes, overrun = saved.overrun_minutes, "schedule settings saved");
    Ok(saved)
}

/// Weekly template ordered Monday to Sunday.
pub async fn weekly_schedule(db: &DatabaseConnection) -> Result<Vec<weekly_schedule::Model>, ServiceError> {
    Ok(weekly_schedule::Entity::find()
        .order_by_asc(weekly_schedule::Column::DayOfWeek)
        .all(db)
        .await
        .map_err(db_err)?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeeklyDayInput {
    pub day_of_week: i32,
    #[serde(default, with = "hhmm_opt_serde")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt_serde")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt_serde")]
    pub break_start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt_serde")]
    pub break_end_time: Option<NaiveTime>,
    #[serde(default = "working")]
    pub is_working: bool,
}

fn working() -> bool { true }

/// Create or replace the template for one weekday; missing hours fall back to the settings.
#[instrument(skip(db, input), fields(day = input.day_of_week))]
pub async fn upsert_weekly_day(db: &DatabaseConnection, input: WeeklyDayInput) -> Result<weekly_schedule::Model, ServiceError> {
    if !(1..=7).contains(&input.day_of_week) {
        return Err(ServiceError::Validation("day_of_week must be within 1..=7".into()));
    }
    let settings = get_settings(db).await?;
    let start = input.start_time.unwrap_or(settings.working_hours_start);
    let end = input.end_time.unwrap_or(settings.working_hours_end);
    master_schedule::validate_hours(start, end, input.break_start_time, input.break_end_time)?;

    let existing = weekly_schedule::Entity::find()
        .filter(weekly_schedule::Column::DayOfWeek.eq(input.day_of_week))
        .one(db)
        .await
        .map_err(db_err)?;
    let mut am: weekly_schedule::ActiveModel = match existing {
        Some(row) => row.into(),
        None => weekly_schedule::ActiveModel { day_of_week: Set(input.day_of_week), ..Default::default() },
    };
    am.start_time = Set(start);
    am.end_time = Set(end);
    am.break_start_time = Set(input.break_start_time);
    am.break_end_time = Set(input.break_end_time);
    am.is_working = Set(input.is_working);
    Ok(am.save(db).await.map_err(db_err)?.try_into_model().map_err(db_err)?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct MasterDayInput {
    pub date: NaiveDate,
    #[serde(with = "hhmm_serde")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm_serde")]
    pub end_time: NaiveTime,
    #[serde(default, with = "hhmm_opt_serde")]
    pub break_start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt_serde")]
    pub break_end_time: Option<NaiveTime>,
    #[serde(default = "working")]
    pub is_working: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[instrument(skip(db, input), fields(date = %input.date))]
pub async fn upsert_master_day(db: &DatabaseConnection, input: MasterDayInput) -> Result<master_schedule::Model, ServiceError> {
    master_schedule::validate_hours(input.start_time, input.end_time, input.break_start_time, input.break_end_time)?;
    let existing = find_master_day(db, input.date).await?;
    let mut am: master_schedule::ActiveModel = match existing {
        Some(row) => row.into(),
        None => master_schedule::ActiveModel { date: Set(input.date), ..Default::default() },
    };
    am.start_time = Set(input.start_time);
    am.end_time = Set(input.end_time);
    am.break_start_time = Set(input.break_start_time);
    am.break_end_time = Set(input.break_end_time);
    am.is_working = Set(input.is_working);
    am.notes = Set(input.notes.filter(|n| !n.trim().is_empty()));
    Ok(am.save(db).await.map_err(db_err)?.try_into_model().map_err(db_err)?)
}

pub async fn find_master_day(db: &DatabaseConnection, date: NaiveDate) -> Result<Option<master_schedule::Model>, ServiceError> {
    Ok(master_schedule::Entity::find()
        .filter(master_schedule::Column::Date.eq(date))
        .one(db)
        .await
        .map_err(db_err)?)
}

pub async fn delete_master_day(db: &DatabaseConnection, date: NaiveDate) -> Result<(), ServiceError> {
    let res = master_schedule::Entity::delete_many()
        .filter(master_schedule::Column::Date.eq(date))
        .exec(db)
        .await
        .map_err(db_err)?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("master day"));
    }
    Ok(())
}

pub async fn list_master_days(db: &DatabaseConnection, from: NaiveDate, to: NaiveDate) -> Result<Vec<master_schedule::Model>, ServiceError> {
    Ok(master_schedule::Entity::find()
        .filter(master_schedule::Column::Date.gte(from))
        .filter(master_schedule::Column::Date.lte(to))
        .order_by_asc(master_schedule::Column::Date)
        .all(db)
        .await
        .map_err(db_err)?)
}

pub const MAX_GENERATE_DAYS: i64 = 366;

/// Copy the weekly template into master days for `days` dates from `from`,
/// leaving dates that already have an override untouched. Returns rows created.
#[instrument(skip(db))]
pub async fn generate_master_days(db: &DatabaseConnection, from: NaiveDate, days: i64) -> Result<u32, ServiceError> {
    if !(1..=MAX_GENERATE_DAYS).contains(&days) {
        return Err(ServiceError::Validation(format!("days must be within 1..={MAX_GENERATE_DAYS}")));
    }
    let to = add_days(from, days - 1)?;
    let template = weekly_schedule(db).await?;
    let settings = get_settings(db).await?;
    let taken: Vec<NaiveDate> = list_master_days(db, from, to).await?.into_iter().map(|m| m.date).collect();

    let mut created = 0u32;
    for offset in 0..days {
        let date = add_days(from, offset)?;
        if taken.contains(&date) {
            continue;
        }
        let Some(tpl) = template.iter().find(|t| t.day_of_week == scheduling::iso_weekday(date)) else {
            continue;
        };
        let resolved = scheduling::resolve_day(date, None, Some(tpl), &settings);
        let am = master_schedule::ActiveModel {
            date: Set(date),
            start_time: Set(tpl.start_time),
            end_time: Set(tpl.end_time),
            break_start_time: Set(resolved.as_ref().and_then(|d| d.break_start)),
            break_end_time: Set(resolved.as_ref().and_then(|d| d.break_end)),
            is_working: Set(tpl.is_working),
            notes: Set(None),
            ..Default::default()
        };
        am.insert(db).await.map_err(db_err)?;
        created += 1;
    }
    info!(created, %from, days, "master days generated");
    Ok(created)
}

/// Effective hours for a date, `None` for a day off.
pub async fn working_day_for(db: &DatabaseConnection, date: NaiveDate) -> Result<Option<WorkingDay>, ServiceError> {
    let master = find_master_day(db, date).await?;
    let template = weekly_schedule::Entity::find()
        .filter(weekly_schedule::Column::DayOfWeek.eq(scheduling::iso_weekday(date)))
        .one(db)
        .await
        .map_err(db_err)?;
    let settings = get_settings(db).await?;
    Ok(scheduling::resolve_day(date, master.as_ref(), template.as_ref(), &settings))
}

/// Bookings that still hold their time on `date`, ordered by start.
pub async fn open_bookings(db: &DatabaseConnection, date: NaiveDate) -> Result<Vec<booking::Model>, ServiceError> {
    Ok(booking::Entity::find()
        .filter(booking::Column::BookingDate.eq(date))
        .filter(booking::Column::Status.is_in([BookingStatus::Pending, BookingStatus::Confirmed]))
        .order_by_asc(booking::Column::StartTime)
        .all(db)
        .await
        .map_err(db_err)?)
}

pub fn busy_from(bookings: &[booking::Model]) -> Vec<BusyInterval> {
    bookings
        .iter()
        .filter(|b| b.status.blocks_slot())
        .map(|b| BusyInterval { start: b.start_time, end: b.end_time })
        .collect()
}

/// Free start times on `date` for a session of `duration` minutes.
pub async fn free_slots(
    db: &DatabaseConnection,
    clock: &BusinessClock,
    day: &WorkingDay,
    duration: i32,
) -> Result<Vec<NaiveTime>, ServiceError> {
    let now = clock.now();
    if day.date < now.date() {
        return Ok(Vec::new());
    }
    let settings = get_settings(db).await?;
    let rules = SlotRules { step_minutes: settings.slot_interval_minutes, overrun_minutes: settings.overrun_minutes };
    let not_before = (day.date == now.date()).then(|| now.time());
    let busy = busy_from(&open_bookings(db, day.date).await?);
    Ok(available_slots(day, duration, &busy, rules, not_before))
}

#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub date: NaiveDate,
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_duration: Option<i32>,
    pub available_slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[instrument(skip(db, clock))]
pub async fn availability(
    db: &DatabaseConnection,
    clock: &BusinessClock,
    date: NaiveDate,
    service_id: i32,
) -> Result<Availability, ServiceError> {
    let service = catalog_service::get_active(db, service_id).await?;
    let Some(day) = working_day_for(db, date).await? else {
        return Ok(Availability {
            date,
            service_name: service.name,
            service_duration: None,
            available_slots: Vec::new(),
            working_hours: None,
            message: Some(NON_WORKING_MESSAGE.into()),
        });
    };
    let slots = free_slots(db, clock, &day, service.duration_minutes).await?;
    Ok(Availability {
        date,
        service_name: service.name,
        service_duration: Some(service.duration_minutes),
        available_slots: slots.into_iter().map(hhmm).collect(),
        working_hours: Some(day),
        message: None,
    })
}

/// Booking as shown in the admin day view.
#[derive(Debug, Clone, Serialize)]
pub struct BookingSummary {
    pub id: i32,
    #[serde(with = "hhmm_serde")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm_serde")]
    pub end_time: NaiveTime,
    pub service_name: String,
    pub client_name: String,
    pub client_phone: String,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayOverview {
    pub date: NaiveDate,
    pub day_of_week: i32,
    pub working_hours: WorkingDay,
    pub available_slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookings: Option<Vec<BookingSummary>>,
}

pub const OVERVIEW_DAYS: i64 = 7;

/// Working days with their free slots: the given date, or the next week from today.
/// With `include_bookings` each day also lists every booking (admin view).
#[instrument(skip(db, clock))]
pub async fn days_overview(
    db: &DatabaseConnection,
    clock: &BusinessClock,
    date: Option<NaiveDate>,
    service_id: Option<i32>,
    include_bookings: bool,
) -> Result<Vec<DayOverview>, ServiceError> {
    let duration = match service_id {
        Some(id) => catalog_service::get_active(db, id).await?.duration_minutes,
        None => DEFAULT_OVERVIEW_DURATION,
    };
    let dates: Vec<NaiveDate> = match date {
        Some(d) => vec![d],
        None => {
            let today = clock.today();
            (0..OVERVIEW_DAYS).map(|i| today + Duration::days(i)).collect()
        }
    };

    let mut out = Vec::with_capacity(dates.len());
    for date in dates {
        let Some(day) = working_day_for(db, date).await? else { continue };
        let slots = free_slots(db, clock, &day, duration).await?;
        let bookings = if include_bookings {
            let rows = booking::Entity::find()
                .filter(booking::Column::BookingDate.eq(date))
                .order_by_asc(booking::Column::StartTime)
                .all(db)
                .await
                .map_err(db_err)?;
            Some(
                rows.into_iter()
                    .map(|b| BookingSummary {
                        id: b.id,
                        start_time: b.start_time,
                        end_time: b.end_time,
                        service_name: b.service_name,
                        client_name: b.client_name,
                        client_phone: b.client_phone,
                        status: b.status,
                    })
                    .collect(),
            )
        } else {
            None
        };
        out.push(DayOverview {
            date,
            day_of_week: scheduling::iso_weekday(date),
            working_hours: day,
            available_slots: slots.into_iter().map(hhmm).collect(),
            bookings,
        });
    }
    Ok(out)
}
