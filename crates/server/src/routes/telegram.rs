use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};

use service::bot::Update;

use crate::errors::JsonApiError;
use crate::state::AppState;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Bot API webhook. Any accepted update is answered with 200 so Telegram does not redeliver it.
#[utoipa::path(post, path = "/api/telegram/webhook", tag = "telegram",
    responses((status = 200, description = "Update handled"), (status = 401, description = "Bad secret"), (status = 404, description = "Bot disabled")))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<Json<Value>, JsonApiError> {
    let bot = state
        .bot
        .as_ref()
        .ok_or_else(|| JsonApiError::new(StatusCode::NOT_FOUND, "Telegram bot is not configured"))?;
    let secret = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !bot.accepts_secret(secret) {
        return Err(JsonApiError::unauthorized("Invalid webhook secret"));
    }
    bot.process(update).await;
    Ok(Json(json!({ "ok": true })))
}
