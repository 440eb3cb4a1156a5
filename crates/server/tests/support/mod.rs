#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use chrono::{Duration, NaiveDate};
use serde_json::Value;
use tower::Service;

use configs::AppConfig;
use server::startup::{build_state, prepare_database};
use server::state::AppState;
use service::scheduling::{iso_weekday, BusinessClock};

pub const ADMIN_PASSWORD: &str = "s3cret-pass";

pub fn config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.admin.password = Some(ADMIN_PASSWORD.into());
    cfg.chakra.jwt_secret = "integration-test-secret-0123456789abcdef".into();
    cfg.chakra.bootstrap_admin_telegram_id = Some("1001".into());
    cfg
}

pub async fn build_app() -> anyhow::Result<(Router, AppState)> {
    build_app_with(config()).await
}

pub async fn build_app_with(cfg: AppConfig) -> anyhow::Result<(Router, AppState)> {
    let db = models::db::connect_memory().await?;
    prepare_database(&db, &cfg).await?;
    let state = build_state(db, &cfg).await?;
    Ok((server::routes::build_router(state.clone(), "frontend"), state))
}

/// First Monday strictly after tomorrow, so no slot is in the past.
pub fn next_monday(clock: &BusinessClock) -> NaiveDate {
    let mut d = clock.today() + Duration::days(2);
    while iso_weekday(d) != 1 {
        d += Duration::days(1);
    }
    d
}

pub fn json_request(method: &str, uri: &str, body: Value) -> anyhow::Result<Request<Body>> {
    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body)?))?)
}

pub fn get(uri: &str) -> anyhow::Result<Request<Body>> {
    Ok(Request::builder().uri(uri).body(Body::empty())?)
}

pub async fn send(app: &Router, req: Request<Body>) -> anyhow::Result<Response<Body>> {
    Ok(app.clone().call(req).await?)
}

pub async fn body_json(resp: Response<Body>) -> anyhow::Result<Value> {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Log in to the admin panel and return the session token.
pub async fn admin_token(app: &Router) -> anyhow::Result<String> {
    let resp = send(app, json_request("POST", "/api/admin/login", serde_json::json!({"password": ADMIN_PASSWORD}))?).await?;
    anyhow::ensure!(resp.status().is_success(), "admin login failed: {}", resp.status());
    let body = body_json(resp).await?;
    Ok(body["token"].as_str().unwrap_or_default().to_string())
}
