use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use common::metrics::{BOOKINGS_CREATED_TOTAL, BOOKING_CONFLICTS_TOTAL};
use models::booking::{self, BookingStatus};

use crate::booking::{BookingDraft, ClientInput, SelectedService};
use crate::db::{catalog_service, schedule_service};
use crate::errors::ServiceError;
use crate::pagination::Pagination;
use crate::scheduling::BusinessClock;
use crate::timefmt::{parse_date, parse_time};

// Serialises the free-slot check and the insert that claims the slot.
static BOOKING_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn db_err(e: sea_orm::DbErr) -> ServiceError { ServiceError::Db(e.to_string()) }

/// Public booking form payload. Every field is optional on the wire so that a
/// missing one can be reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub service_id: Option<i32>,
    pub booking_date: Option<String>,
    pub start_time: Option<String>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub client_email: Option<String>,
    pub notes: Option<String>,
    /// Set by the Telegram bot, never read from the public form.
    #[serde(skip)]
    pub telegram_chat_id: Option<i64>,
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, ServiceError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ServiceError::missing_field(field)),
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BookingPolicy {
    pub clock: BusinessClock,
    pub horizon_days: i64,
}

impl Default for BookingPolicy {
    fn default() -> Self { Self { clock: BusinessClock::default(), horizon_days: 60 } }
}

/// Run the submitted form through the wizard and store the booking as `pending`.
#[instrument(skip(db, req, policy), fields(service_id = ?req.service_id, date = ?req.booking_date))]
pub async fn create_booking(db: &DatabaseConnection, req: BookingRequest, policy: BookingPolicy) -> Result<booking::Model, ServiceError> {
    let service_id = req.service_id.ok_or_else(|| ServiceError::missing_field("service_id"))?;
    let date = parse_date("booking_date", required("booking_date", &req.booking_date)?)?;
    let start = parse_time("start_time", required("start_time", &req.start_time)?)?;
    let client = ClientInput {
        name: required("client_name", &req.client_name)?.to_string(),
        phone: required("client_phone", &req.client_phone)?.to_string(),
        email: req.client_email,
        notes: req.notes,
    };

    let service = catalog_service::get_active(db, service_id).await?;
    let mut draft = BookingDraft::new();
    draft.select_service(SelectedService { id: service.id, name: service.name, duration_minutes: service.duration_minutes });
    draft.select_date(date, policy.clock.today(), policy.horizon_days)?;

    let _guard = BOOKING_LOCK.lock().await;
    let day = schedule_service::working_day_for(db, date)
        .await?
        .ok_or_else(|| ServiceError::Validation(format!("{date} is not a working day")))?;
    let slots = schedule_service::free_slots(db, &policy.clock, &day, service.duration_minutes).await?;
    if let Err(e) = draft.select_time(start, &slots) {
        BOOKING_CONFLICTS_TOTAL.inc();
        warn!(%date, %start, "requested slot is taken");
        return Err(e.into());
    }
    draft.fill_client(client)?;
    let new = draft.finish()?;

    let now = Utc::now();
    let created = booking::ActiveModel {
        service_id: Set(Some(new.service.id)),
        service_name: Set(new.service.name),
        booking_date: Set(new.date),
        start_time: Set(new.start),
        end_time: Set(new.end),
        client_name: Set(new.client.name),
        client_phone: Set(new.client.phone),
        client_email: Set(new.client.email),
        notes: Set(new.client.notes),
        telegram_chat_id: Set(req.telegram_chat_id),
        status: Set(BookingStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(db_err)?;
    BOOKINGS_CREATED_TOTAL.inc();
    info!(booking_id = created.id, "booking created");
    Ok(created)
}

pub async fn get(db: &DatabaseConnection, id: i32) -> Result<booking::Model, ServiceError> {
    booking::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ServiceError::not_found("booking"))
}

/// All bookings of a date ordered by start time.
pub async fn list_for_date(db: &DatabaseConnection, date: NaiveDate) -> Result<Vec<booking::Model>, ServiceError> {
    Ok(booking::Entity::find()
        .filter(booking::Column::BookingDate.eq(date))
        .order_by_asc(booking::Column::StartTime)
        .all(db)
        .await
        .map_err(db_err)?)
}

/// Open bookings a Telegram chat made, from `from` on, soonest first.
pub async fn list_for_chat(db: &DatabaseConnection, chat_id: i64, from: NaiveDate) -> Result<Vec<booking::Model>, ServiceError> {
    Ok(booking::Entity::find()
        .filter(booking::Column::TelegramChatId.eq(chat_id))
        .filter(booking::Column::BookingDate.gte(from))
        .filter(booking::Column::Status.is_in([BookingStatus::Pending, BookingStatus::Confirmed]))
        .order_by_asc(booking::Column::BookingDate)
        .order_by_asc(booking::Column::StartTime)
        .all(db)
        .await
        .map_err(db_err)?)
}

/// One person who has booked, keyed by normalised phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub phone: String,
    pub name: String,
    pub email: Option<String>,
    pub bookings: u64,
    pub last_booking_date: NaiveDate,
}

/// Everyone who has booked, with the name and e-mail of their latest booking. Sorted by name.
#[instrument(skip(db))]
pub async fn clients(db: &DatabaseConnection) -> Result<Vec<ClientSummary>, ServiceError> {
    let rows = booking::Entity::find()
        .order_by_asc(booking::Column::BookingDate)
        .order_by_asc(booking::Column::StartTime)
        .order_by_asc(booking::Column::Id)
        .all(db)
        .await
        .map_err(db_err)?;
    let mut by_phone: HashMap<String, ClientSummary> = HashMap::new();
    for b in rows {
        let entry = by_phone.entry(b.client_phone.clone()).or_insert_with(|| ClientSummary {
            phone: b.client_phone.clone(),
            name: b.client_name.clone(),
            email: None,
            bookings: 0,
            last_booking_date: b.booking_date,
        });
        entry.bookings += 1;
        entry.name = b.client_name;
        entry.last_booking_date = b.booking_date;
        if b.client_email.is_some() {
            entry.email = b.client_email;
        }
    }
    let mut out: Vec<ClientSummary> = by_phone.into_values().collect();
    out.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.phone.cmp(&b.phone)));
    Ok(out)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
}

/// Admin listing, newest dates first.
pub async fn list(db: &DatabaseConnection, filter: BookingFilter, opts: Pagination) -> Result<Vec<booking::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = booking::Entity::find();
    if let Some(raw) = filter.status.as_deref().filter(|s| !s.is_empty()) {
        let status = BookingStatus::parse(raw).ok_or_else(|| ServiceError::Validation(format!("unknown status: {raw}")))?;
        q = q.filter(booking::Column::Status.eq(status));
    }
    if let Some(from) = filter.from {
        q = q.filter(booking::Column::BookingDate.gte(from));
    }
    Ok(q.order_by_desc(booking::Column::BookingDate)
        .order_by_asc(booking::Column::StartTime)
        .paginate(db, per_page)
        .fetch_page(page_idx)
        .await
        .map_err(db_err)?)
}

/// Result of a status change; `changed` is false for a same-status no-op.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking: booking::Model,
    pub changed: bool,
}

#[instrument(skip(db))]
pub async fn update_status(db: &DatabaseConnection, id: i32, status: &str) -> Result<StatusChange, ServiceError> {
    let next = BookingStatus::parse(status).ok_or_else(|| ServiceError::Validation(format!("unknown status: {status}")))?;
    let current = get(db, id).await?;
    if current.status == next {
        return Ok(StatusChange { booking: current, changed: false });
    }
    if !current.status.can_transition_to(next) {
        return Err(ServiceError::Conflict(format!(
            "cannot move booking from {} to {}",
            current.status.as_str(),
            next.as_str()
        )));
    }
    let _guard = BOOKING_LOCK.lock().await;
    if next.blocks_slot() && !current.status.blocks_slot() {
        // reopening a cancelled booking must not double-book its slot
        let clash = schedule_service::open_bookings(db, current.booking_date)
            .await?
            .into_iter()
            .any(|b| b.id != id && !(current.end_time <= b.start_time || current.start_time >= b.end_time));
        if clash {
            BOOKING_CONFLICTS_TOTAL.inc();
            return Err(ServiceError::Conflict("slot is already taken".into()));
        }
    }
    let mut am: booking::ActiveModel = current.into();
    am.status = Set(next);
    am.updated_at = Set(Utc::now());
    let updated = am.update(db).await.map_err(db_err)?;
    info!(booking_id = id, status = next.as_str(), "booking status changed");
    Ok(StatusChange { booking: updated, changed: true })
}

pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let res = booking::Entity::delete_by_id(id).exec(db).await.map_err(db_err)?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("booking"));
    }
    info!(booking_id = id, "booking deleted");
    Ok(())
}
