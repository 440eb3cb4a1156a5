use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use models::service_item;
use service::db::{catalog_service, schedule_service};
use service::errors::ServiceError;
use service::timefmt::parse_date;

use crate::errors::JsonApiError;
use crate::state::AppState;

#[utoipa::path(get, path = "/api/services", tag = "catalog", responses((status = 200, description = "Active services")))]
pub async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<service_item::Model>>, JsonApiError> {
    Ok(Json(catalog_service::list_active(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/services/{id}",
    tag = "catalog",
    params(("id" = i32, Path, description = "Service id")),
    responses((status = 200, description = "Service"), (status = 404, description = "Unknown or inactive"))
)]
pub async fn get_service(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<service_item::Model>, JsonApiError> {
    Ok(Json(catalog_service::get_active(&state.db, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
    pub service_id: Option<i32>,
}

#[utoipa::path(
    get,
    path = "/api/availability",
    tag = "catalog",
    params(
        ("date" = String, Query, description = "YYYY-MM-DD"),
        ("service_id" = i32, Query, description = "Service id")
    ),
    responses((status = 200, description = "Free start times"), (status = 400, description = "Bad query"), (status = 404, description = "Unknown service"))
)]
pub async fn availability(
    State(state): State<AppState>,
    Query(q): Query<AvailabilityQuery>,
) -> Result<Json<schedule_service::Availability>, JsonApiError> {
    let raw = q.date.as_deref().map(str::trim).filter(|d| !d.is_empty()).ok_or_else(|| ServiceError::missing_field("date"))?;
    let date = parse_date("date", raw)?;
    let service_id = q.service_id.ok_or_else(|| ServiceError::missing_field("service_id"))?;
    Ok(Json(schedule_service::availability(&state.db, state.clock(), date, service_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub date: Option<String>,
    pub service_id: Option<i32>,
}

impl DaysQuery {
    pub fn date(&self) -> Result<Option<chrono::NaiveDate>, ServiceError> {
        match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => parse_date("date", raw).map(Some),
            None => Ok(None),
        }
    }
}

/// Working days with free slots; the next week unless a date is given.
#[utoipa::path(get, path = "/api/schedule/days", tag = "catalog", responses((status = 200, description = "Working days")))]
pub async fn schedule_days(
    State(state): State<AppState>,
    Query(q): Query<DaysQuery>,
) -> Result<Json<Vec<schedule_service::DayOverview>>, JsonApiError> {
    let days = schedule_service::days_overview(&state.db, state.clock(), q.date()?, q.service_id, false).await?;
    Ok(Json(days))
}
