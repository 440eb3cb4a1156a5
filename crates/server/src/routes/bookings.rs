use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use service::db::booking_service::{self, BookingRequest};
use service::timefmt::hhmm;

use crate::errors::JsonApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BookingCreated {
    pub success: bool,
    pub booking_id: i32,
    pub end_time: String,
}

#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "bookings",
    request_body = crate::openapi::BookingRequestDoc,
    responses(
        (status = 201, description = "Booked"),
        (status = 400, description = "Missing or invalid field"),
        (status = 404, description = "Unknown service"),
        (status = 409, description = "Slot taken")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingCreated>), JsonApiError> {
    let booking = booking_service::create_booking(&state.db, req, state.policy).await?;
    info!(booking_id = booking.id, date = %booking.booking_date, "booking accepted");
    let out = BookingCreated { success: true, booking_id: booking.id, end_time: hhmm(booking.end_time) };
    state.notifier.spawn_booking_created(booking);
    Ok((StatusCode::CREATED, Json(out)))
}
