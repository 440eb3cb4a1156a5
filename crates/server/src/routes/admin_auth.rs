use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use common::types::SuccessMessage;
use service::admin::domain::LoginInput;

use crate::errors::JsonApiError;
use crate::extract::{admin_token, ClientIp, ADMIN_TOKEN_COOKIE};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LoginOutput {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "admin",
    request_body = crate::openapi::AdminLoginDoc,
    responses(
        (status = 200, description = "Session opened"),
        (status = 401, description = "Invalid password"),
        (status = 429, description = "Too many failed attempts"),
        (status = 500, description = "Password not configured")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<LoginOutput>), JsonApiError> {
    let session = state.admin.login(&ip, input).await?;
    let mut cookie = Cookie::new(ADMIN_TOKEN_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    let out = LoginOutput {
        success: true,
        token: session.token,
        expires_at: session.expires_at,
        message: "Authentication successful".into(),
    };
    Ok((jar.add(cookie), Json(out)))
}

#[utoipa::path(post, path = "/api/admin/logout", tag = "admin", responses((status = 200, description = "Session closed")))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap, jar: CookieJar) -> (CookieJar, Json<SuccessMessage>) {
    if let Some(token) = admin_token(&headers) {
        if state.admin.logout(&token) {
            info!("admin session closed");
        }
    }
    let jar = jar.remove(Cookie::build(ADMIN_TOKEN_COOKIE).path("/"));
    (jar, Json(SuccessMessage::new("Logged out")))
}

/// Reached only through the admin guard.
pub async fn session() -> (StatusCode, Json<SuccessMessage>) {
    (StatusCode::OK, Json(SuccessMessage::new("Authenticated")))
}
