pub mod admin;
pub mod admin_auth;
pub mod analytics;
pub mod bookings;
pub mod catalog;
pub mod chakra;
pub mod reviews;
pub mod telegram;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::types::Health;

use crate::extract::require_admin;
use crate::openapi::ApiDoc;
use crate::state::AppState;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/openapi.json", get(openapi_json))
        .route("/api/services", get(catalog::list_services))
        .route("/api/services/:id", get(catalog::get_service))
        .route("/api/availability", get(catalog::availability))
        .route("/api/schedule/days", get(catalog::schedule_days))
        .route("/api/bookings", post(bookings::create))
        .route("/api/reviews", get(reviews::list_public).post(reviews::submit))
        .route("/api/analytics/visits", post(analytics::record_visit))
        .route("/api/telegram/webhook", post(telegram::webhook))
        .route("/api/admin/login", post(admin_auth::login))
        .route("/api/admin/logout", post(admin_auth::logout))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/session", get(admin_auth::session))
        .route("/api/admin/services", get(admin::list_services).post(admin::create_service))
        .route("/api/admin/services/:id", put(admin::update_service).delete(admin::deactivate_service))
        .route("/api/admin/schedule/settings", get(admin::get_settings).put(admin::save_settings))
        .route("/api/admin/schedule/weekly", get(admin::weekly).put(admin::upsert_weekly))
        .route("/api/admin/schedule/master", get(admin::master_days).put(admin::upsert_master))
        .route("/api/admin/schedule/master/:date", delete(admin::delete_master))
        .route("/api/admin/schedule/generate", post(admin::generate))
        .route("/api/admin/schedule/days", get(admin::schedule_days))
        .route("/api/admin/bookings", get(admin::list_bookings))
        .route("/api/admin/clients", get(admin::clients))
        .route("/api/admin/bookings/date/:date", get(admin::bookings_for_date))
        .route("/api/admin/bookings/:id", delete(admin::delete_booking))
        .route("/api/admin/bookings/:id/status", put(admin::update_booking_status))
        .route("/api/admin/reviews", get(admin::list_reviews))
        .route("/api/admin/reviews/:id", put(admin::edit_review).delete(admin::delete_review))
        .route("/api/admin/reviews/:id/status", put(admin::set_review_status))
        .route("/api/admin/analytics", get(admin::analytics_stats))
        .route(
            "/api/admin/notifications/settings",
            get(admin::notification_settings).put(admin::save_notification_settings),
        )
        .route("/api/admin/notifications/log", get(admin::notification_log))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

fn chakra_routes() -> Router<AppState> {
    Router::new()
        .route("/api/chakra/login", post(chakra::login))
        .route("/api/chakra/me", get(chakra::me))
        .route("/api/chakras", get(chakra::list))
        .route("/api/chakras/:id", get(chakra::detail).put(chakra::update))
        .route("/api/chakra-admin/chakras", post(chakra::create_chakra))
        .route("/api/chakra-admin/chakras/:id", delete(chakra::delete_chakra))
        .route("/api/chakra-admin/entries/:kind", get(chakra::list_entries).post(chakra::create_entry))
        .route("/api/chakra-admin/entries/:kind/:id", put(chakra::update_entry).delete(chakra::delete_entry))
        .route("/api/chakra-admin/users", get(chakra::list_users).post(chakra::create_user))
        .route("/api/chakra-admin/history", get(chakra::history))
}

/// Build the full application router: API, admin panel API and the static site.
pub fn build_router(state: AppState, frontend_dir: &str) -> Router {
    let index = format!("{}/index.html", frontend_dir.trim_end_matches('/'));
    let static_dir = ServeDir::new(frontend_dir).fallback(ServeFile::new(index));

    Router::new()
        .merge(public_routes())
        .merge(admin_routes(state.clone()))
        .merge(chakra_routes())
        .fallback_service(static_dir)
        .with_state(state)
        .layer(CorsLayer::very_permissive())
        .layer(
            TraceLayer::new_for_http()
                // one span per request, method and path only
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // status and latency
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
