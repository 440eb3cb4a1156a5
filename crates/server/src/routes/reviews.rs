use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use models::review;
use service::db::review_service::{self, ReviewInput};

use crate::errors::JsonApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PublicReviewsQuery {
    pub service: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/reviews",
    tag = "reviews",
    params(("service" = Option<String>, Query, description = "Substring filter; \"all\" disables it")),
    responses((status = 200, description = "Approved reviews, newest first"))
)]
pub async fn list_public(
    State(state): State<AppState>,
    Query(q): Query<PublicReviewsQuery>,
) -> Result<Json<Vec<review::Model>>, JsonApiError> {
    let rows = review_service::list_public(&state.db, &state.reviews, q.service.as_deref()).await?;
    Ok(Json(rows.as_ref().clone()))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    tag = "reviews",
    request_body = crate::openapi::ReviewInputDoc,
    responses((status = 201, description = "Stored for moderation"), (status = 400, description = "Invalid review"))
)]
pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<review::Model>), JsonApiError> {
    let created = review_service::submit(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
