use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use common::types::SuccessMessage;
use service::db::analytics_service::{self, VisitInput};

use crate::errors::JsonApiError;
use crate::extract::ClientIp;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VisitBody {
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

/// Page view beacon; the user agent comes from the request headers.
#[utoipa::path(post, path = "/api/analytics/visits", tag = "analytics", responses((status = 201, description = "Recorded")))]
pub async fn record_visit(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Option<Json<VisitBody>>,
) -> Result<(StatusCode, Json<SuccessMessage>), JsonApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let user_agent = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()).map(str::to_string);
    let referrer = body
        .referrer
        .or_else(|| headers.get(header::REFERER).and_then(|v| v.to_str().ok()).map(str::to_string));
    analytics_service::record_visit(&state.db, VisitInput { page_url: body.page_url, user_agent, referrer, ip }).await?;
    Ok((StatusCode::CREATED, Json(SuccessMessage::new("Visit tracked"))))
}
