use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use common::types::SuccessMessage;
use models::chakra_entry::{self, EntryKind};
use models::{chakra, chakra_user};
use service::chakra::service::{self as chakras, ChakraDetail, ChakraPatch, ChakraView, EntryFilter, EntryInput, EntryPatch, HistoryView, NewChakra};
use service::chakra::Caller;

use crate::errors::JsonApiError;
use crate::extract::ChakraCaller;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TelegramLogin {
    #[serde(default)]
    pub telegram_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginOutput {
    pub success: bool,
    pub token: String,
    pub user: chakra_user::Model,
}

#[utoipa::path(
    post,
    path = "/api/chakra/login",
    tag = "chakra",
    request_body = crate::openapi::TelegramLoginDoc,
    responses((status = 200, description = "Token issued"), (status = 401, description = "Unknown telegram id"))
)]
pub async fn login(State(state): State<AppState>, Json(input): Json<TelegramLogin>) -> Result<Json<LoginOutput>, JsonApiError> {
    if input.telegram_id.trim().is_empty() {
        return Err(JsonApiError::bad_request("Missing required field: telegram_id"));
    }
    let res = chakras::login(&state.db, &state.chakra_auth, &input.telegram_id).await?;
    Ok(Json(LoginOutput { success: true, token: res.token, user: res.user }))
}

pub async fn me(ChakraCaller(caller): ChakraCaller) -> Json<Caller> {
    Json(caller)
}

#[utoipa::path(get, path = "/api/chakras", tag = "chakra", responses((status = 200, description = "Chakras by position")))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ChakraView>>, JsonApiError> {
    Ok(Json(chakras::list_chakras(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/chakras/{id}",
    tag = "chakra",
    params(("id" = i32, Path, description = "Chakra id")),
    responses((status = 200, description = "Chakra with entries"), (status = 404, description = "Unknown chakra"))
)]
pub async fn detail(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<ChakraDetail>, JsonApiError> {
    Ok(Json(chakras::chakra_detail(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/chakras/{id}",
    tag = "chakra",
    params(("id" = i32, Path, description = "Chakra id")),
    responses((status = 200, description = "Updated"), (status = 401, description = "No token"), (status = 403, description = "Not allowed"))
)]
pub async fn update(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
    Path(id): Path<i32>,
    Json(patch): Json<ChakraPatch>,
) -> Result<Json<chakra::Model>, JsonApiError> {
    Ok(Json(chakras::update_chakra(&state.db, &caller, id, patch).await?))
}

pub async fn create_chakra(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
    Json(input): Json<NewChakra>,
) -> Result<(StatusCode, Json<chakra::Model>), JsonApiError> {
    Ok((StatusCode::CREATED, Json(chakras::create_chakra(&state.db, &caller, input).await?)))
}

pub async fn delete_chakra(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
    Path(id): Path<i32>,
) -> Result<Json<SuccessMessage>, JsonApiError> {
    chakras::delete_chakra(&state.db, &caller, id).await?;
    Ok(Json(SuccessMessage::new("Chakra deleted")))
}

fn kind(segment: &str) -> Result<EntryKind, JsonApiError> {
    EntryKind::from_segment(segment).ok_or_else(|| JsonApiError::new(StatusCode::NOT_FOUND, format!("unknown entry kind: {segment}")))
}

pub async fn list_entries(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
    Path(segment): Path<String>,
    Query(filter): Query<EntryFilter>,
) -> Result<Json<Vec<chakra_entry::Model>>, JsonApiError> {
    Ok(Json(chakras::list_entries(&state.db, &caller, kind(&segment)?, filter).await?))
}

pub async fn create_entry(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
    Path(segment): Path<String>,
    Json(input): Json<EntryInput>,
) -> Result<(StatusCode, Json<chakra_entry::Model>), JsonApiError> {
    let created = chakras::create_entry(&state.db, &caller, kind(&segment)?, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
    Path((segment, id)): Path<(String, i32)>,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<chakra_entry::Model>, JsonApiError> {
    Ok(Json(chakras::update_entry(&state.db, &caller, kind(&segment)?, id, patch).await?))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
    Path((segment, id)): Path<(String, i32)>,
) -> Result<Json<SuccessMessage>, JsonApiError> {
    chakras::delete_entry(&state.db, &caller, kind(&segment)?, id).await?;
    Ok(Json(SuccessMessage::new("Entry deleted")))
}

pub async fn list_users(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
) -> Result<Json<Vec<chakra_user::Model>>, JsonApiError> {
    Ok(Json(chakras::list_users(&state.db, &caller).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
    Json(input): Json<chakra_user::NewUser>,
) -> Result<(StatusCode, Json<chakra_user::Model>), JsonApiError> {
    Ok((StatusCode::CREATED, Json(chakras::create_user(&state.db, &caller, input).await?)))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub chakra_id: Option<i32>,
}

pub async fn history(
    State(state): State<AppState>,
    ChakraCaller(caller): ChakraCaller,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryView>>, JsonApiError> {
    Ok(Json(chakras::history(&state.db, &caller, q.chakra_id).await?))
}
