use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static BOOKINGS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("harmony_bookings_created_total", "Bookings accepted from the booking wizard")
        .expect("register bookings_created_total")
});

pub static BOOKING_CONFLICTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("harmony_booking_conflicts_total", "Booking submissions rejected because the slot was taken")
        .expect("register booking_conflicts_total")
});

pub static ADMIN_LOGIN_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("harmony_admin_login_failures_total", "Failed admin password attempts")
        .expect("register admin_login_failures_total")
});

pub static ADMIN_LOGIN_RATE_LIMITED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("harmony_admin_login_rate_limited_total", "Admin logins rejected by the attempt limiter")
        .expect("register admin_login_rate_limited_total")
});

pub static REVIEWS_SUBMITTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("harmony_reviews_submitted_total", "Reviews submitted for moderation")
        .expect("register reviews_submitted_total")
});

/// Notification outcomes labelled by channel and status (`sent`, `failed`, `skipped`).
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("harmony_notifications_total", "Notification outcomes", &["channel", "status"])
        .expect("register notifications_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
