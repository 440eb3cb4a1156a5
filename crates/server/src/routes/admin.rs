//! Admin panel API. Every handler here sits behind [`crate::extract::require_admin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use common::types::SuccessMessage;
use models::{booking, email_settings, master_schedule, notification_log, review, schedule_settings, service_item, weekly_schedule};
use service::db::booking_service::{self, BookingFilter};
use service::db::review_service::{self, ReviewEdit};
use service::db::schedule_service::{self, MasterDayInput, SettingsInput, WeeklyDayInput};
use service::db::{analytics_service, catalog_service};
use service::notify::history;
use service::notify::settings::{self as email, EmailSettingsInput};
use service::pagination::Pagination;
use service::timefmt::{add_days, parse_date};

use crate::errors::JsonApiError;
use crate::routes::catalog::DaysQuery;
use crate::state::AppState;

// services

pub async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<service_item::Model>>, JsonApiError> {
    Ok(Json(catalog_service::list_all(&state.db).await?))
}

pub async fn create_service(
    State(state): State<AppState>,
    Json(fields): Json<service_item::ServiceFields>,
) -> Result<(StatusCode, Json<service_item::Model>), JsonApiError> {
    Ok((StatusCode::CREATED, Json(catalog_service::create(&state.db, fields).await?)))
}

pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(fields): Json<service_item::ServiceFields>,
) -> Result<Json<service_item::Model>, JsonApiError> {
    Ok(Json(catalog_service::update(&state.db, id, fields).await?))
}

/// Services are deactivated, never removed: bookings keep pointing at them.
pub async fn deactivate_service(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<service_item::Model>, JsonApiError> {
    Ok(Json(catalog_service::deactivate(&state.db, id).await?))
}

// schedule

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<schedule_settings::Model>, JsonApiError> {
    Ok(Json(schedule_service::get_settings(&state.db).await?))
}

pub async fn save_settings(
    State(state): State<AppState>,
    Json(input): Json<SettingsInput>,
) -> Result<Json<schedule_settings::Model>, JsonApiError> {
    Ok(Json(schedule_service::save_settings(&state.db, input).await?))
}

pub async fn weekly(State(state): State<AppState>) -> Result<Json<Vec<weekly_schedule::Model>>, JsonApiError> {
    Ok(Json(schedule_service::weekly_schedule(&state.db).await?))
}

pub async fn upsert_weekly(
    State(state): State<AppState>,
    Json(input): Json<WeeklyDayInput>,
) -> Result<Json<weekly_schedule::Model>, JsonApiError> {
    Ok(Json(schedule_service::upsert_weekly_day(&state.db, input).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Dated overrides; defaults to the next 30 days.
pub async fn master_days(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<Vec<master_schedule::Model>>, JsonApiError> {
    let from = q.from.unwrap_or_else(|| state.clock().today());
    let to = match q.to {
        Some(to) => to,
        None => add_days(from, 30)?,
    };
    if to < from {
        return Err(JsonApiError::bad_request("to must not be before from"));
    }
    Ok(Json(schedule_service::list_master_days(&state.db, from, to).await?))
}

pub async fn upsert_master(
    State(state): State<AppState>,
    Json(input): Json<MasterDayInput>,
) -> Result<Json<master_schedule::Model>, JsonApiError> {
    Ok(Json(schedule_service::upsert_master_day(&state.db, input).await?))
}

pub async fn delete_master(State(state): State<AppState>, Path(date): Path<String>) -> Result<Json<SuccessMessage>, JsonApiError> {
    let date = parse_date("date", &date)?;
    schedule_service::delete_master_day(&state.db, date).await?;
    Ok(Json(SuccessMessage::new("Schedule day deleted")))
}

#[derive(Debug, Deserialize)]
pub struct GenerateInput {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default = "default_generate_days")]
    pub days: i64,
}

fn default_generate_days() -> i64 { 30 }

#[derive(Debug, Serialize)]
pub struct Generated {
    pub success: bool,
    pub created: u32,
}

/// Materialise the weekly template into dated rows, keeping existing ones.
pub async fn generate(State(state): State<AppState>, Json(input): Json<GenerateInput>) -> Result<Json<Generated>, JsonApiError> {
    let from = input.from.unwrap_or_else(|| state.clock().today());
    let created = schedule_service::generate_master_days(&state.db, from, input.days).await?;
    Ok(Json(Generated { success: true, created }))
}

pub async fn schedule_days(
    State(state): State<AppState>,
    Query(q): Query<DaysQuery>,
) -> Result<Json<Vec<schedule_service::DayOverview>>, JsonApiError> {
    let days = schedule_service::days_overview(&state.db, state.clock(), q.date()?, q.service_id, true).await?;
    Ok(Json(days))
}

// bookings

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(q): Query<BookingListQuery>,
) -> Result<Json<Vec<booking::Model>>, JsonApiError> {
    let page = Pagination { page: q.page.unwrap_or(1), per_page: q.per_page.unwrap_or(20) };
    let rows = booking_service::list(&state.db, BookingFilter { status: q.status, from: q.from }, page).await?;
    Ok(Json(rows))
}

/// Everyone who has booked, one row per phone number.
pub async fn clients(State(state): State<AppState>) -> Result<Json<Vec<booking_service::ClientSummary>>, JsonApiError> {
    Ok(Json(booking_service::clients(&state.db).await?))
}

pub async fn bookings_for_date(State(state): State<AppState>, Path(date): Path<String>) -> Result<Json<Vec<booking::Model>>, JsonApiError> {
    let date = parse_date("date", &date)?;
    Ok(Json(booking_service::list_for_date(&state.db, date).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    #[serde(default)]
    pub status: String,
}

/// Moves the booking and tells the client when the status actually changed.
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<StatusInput>,
) -> Result<Json<booking::Model>, JsonApiError> {
    let change = booking_service::update_status(&state.db, id, &input.status).await?;
    if change.changed {
        state.notifier.spawn_status_changed(change.booking.clone());
    }
    Ok(Json(change.booking))
}

pub async fn delete_booking(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<SuccessMessage>, JsonApiError> {
    booking_service::delete(&state.db, id).await?;
    Ok(Json(SuccessMessage::new("Booking deleted")))
}

// reviews

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListQuery {
    pub status: Option<String>,
    pub service: Option<String>,
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Query(q): Query<ReviewListQuery>,
) -> Result<Json<Vec<review::Model>>, JsonApiError> {
    Ok(Json(review_service::list(&state.db, q.status.as_deref(), q.service.as_deref()).await?))
}

pub async fn set_review_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<StatusInput>,
) -> Result<Json<review::Model>, JsonApiError> {
    Ok(Json(review_service::set_status(&state.db, &state.reviews, id, &input.status).await?))
}

pub async fn edit_review(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<ReviewEdit>,
) -> Result<Json<review::Model>, JsonApiError> {
    Ok(Json(review_service::edit(&state.db, &state.reviews, id, input).await?))
}

pub async fn delete_review(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<SuccessMessage>, JsonApiError> {
    review_service::delete(&state.db, &state.reviews, id).await?;
    Ok(Json(SuccessMessage::new("Review deleted")))
}

// analytics

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

pub async fn analytics_stats(
    State(state): State<AppState>,
    Query(q): Query<StatsQuery>,
) -> Result<Json<analytics_service::VisitStats>, JsonApiError> {
    Ok(Json(analytics_service::stats(&state.db, state.clock(), q.days).await?))
}

// notifications

pub async fn notification_settings(State(state): State<AppState>) -> Result<Json<email_settings::Model>, JsonApiError> {
    Ok(Json(email::get_settings(&state.db).await?))
}

/// Persist and hot-swap into the running dispatcher.
pub async fn save_notification_settings(
    State(state): State<AppState>,
    Json(input): Json<EmailSettingsInput>,
) -> Result<Json<email_settings::Model>, JsonApiError> {
    let saved = email::save_settings(&state.db, input).await?;
    state.notifier.reload(saved.clone());
    Ok(Json(saved))
}

pub async fn notification_log(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<notification_log::Model>>, JsonApiError> {
    Ok(Json(history::list(&state.db, page).await?))
}
