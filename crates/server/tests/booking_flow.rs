mod support;

use axum::http::StatusCode;
use serde_json::json;

use support::{body_json, build_app, get, json_request, next_monday, send};

#[tokio::test]
async fn health_and_catalogue() -> anyhow::Result<()> {
    let (app, _) = build_app().await?;

    let resp = send(&app, get("/health")?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await?["status"], "ok");

    let services = body_json(send(&app, get("/api/services")?).await?).await?;
    assert_eq!(services.as_array().map(Vec::len), Some(5));

    let resp = send(&app, get("/api/services/999")?).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_json(resp).await?["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn book_a_slot_then_it_disappears() -> anyhow::Result<()> {
    let (app, state) = build_app().await?;
    let monday = next_monday(state.clock());
    let avail_uri = format!("/api/availability?date={monday}&service_id=1");

    let before = body_json(send(&app, get(&avail_uri)?).await?).await?;
    let slots: Vec<String> = serde_json::from_value(before["available_slots"].clone())?;
    assert_eq!(slots.first().map(String::as_str), Some("12:00"));
    assert_eq!(before["service_duration"], 90);

    let booking = json!({
        "service_id": 1,
        "booking_date": monday.to_string(),
        "start_time": "12:00",
        "client_name": "Анна",
        "client_phone": "8 (912) 345-67-89",
    });
    let resp = send(&app, json_request("POST", "/api/bookings", booking.clone())?).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await?;
    assert_eq!(created["success"], true);
    assert_eq!(created["end_time"], "13:30");
    assert!(created["booking_id"].as_i64().is_some());

    let after = body_json(send(&app, get(&avail_uri)?).await?).await?;
    let slots: Vec<String> = serde_json::from_value(after["available_slots"].clone())?;
    assert!(!slots.contains(&"12:00".to_string()));
    assert!(!slots.contains(&"13:00".to_string()));

    let resp = send(&app, json_request("POST", "/api/bookings", booking)?).await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn missing_field_is_named() -> anyhow::Result<()> {
    let (app, state) = build_app().await?;
    let monday = next_monday(state.clock());
    let body = json!({"service_id": 1, "booking_date": monday.to_string(), "start_time": "12:00", "client_name": "Анна"});
    let resp = send(&app, json_request("POST", "/api/bookings", body)?).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await?["error"], "Missing required field: client_phone");
    Ok(())
}

#[tokio::test]
async fn sunday_is_not_a_working_day() -> anyhow::Result<()> {
    let (app, state) = build_app().await?;
    let sunday = next_monday(state.clock()) + chrono::Duration::days(6);
    let body = body_json(send(&app, get(&format!("/api/availability?date={sunday}&service_id=2"))?).await?).await?;
    assert_eq!(body["message"], "Нерабочий день");
    assert_eq!(body["available_slots"].as_array().map(Vec::len), Some(0));

    let resp = send(&app, get("/api/availability?service_id=2")?).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn reviews_and_visits() -> anyhow::Result<()> {
    let (app, _) = build_app().await?;

    let review = json!({"name": "Ольга", "service": "Access Bars", "text": "Спасибо!"});
    let resp = send(&app, json_request("POST", "/api/reviews", review)?).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await?["rating"], 5);

    // pending reviews are not public
    let public = body_json(send(&app, get("/api/reviews")?).await?).await?;
    assert_eq!(public.as_array().map(Vec::len), Some(0));

    let resp = send(&app, json_request("POST", "/api/reviews", json!({"name": "X", "service": "Y", "text": "Z", "rating": 9}))?).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&app, json_request("POST", "/api/analytics/visits", json!({"page_url": "/services"}))?).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let long_page = format!("/{}", "p".repeat(600));
    let resp = send(&app, json_request("POST", "/api/analytics/visits", json!({"page_url": long_page}))?).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn oversized_contact_fields_are_bad_requests() -> anyhow::Result<()> {
    let (app, state) = build_app().await?;
    let monday = next_monday(state.clock());
    let email = format!("{}@example.ru", "a".repeat(250));
    let body = json!({
        "service_id": 1,
        "booking_date": monday.to_string(),
        "start_time": "12:00",
        "client_name": "Анна",
        "client_phone": "+7 999 123 45 67",
        "client_email": email,
    });
    let resp = send(&app, json_request("POST", "/api/bookings", body)?).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let msg = body_json(resp).await?["error"].as_str().unwrap_or_default().to_string();
    assert!(msg.contains("email too long"), "{msg}");
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> anyhow::Result<()> {
    let (app, _) = build_app().await?;
    let doc = body_json(send(&app, get("/api/openapi.json")?).await?).await?;
    assert!(doc["paths"]["/api/bookings"].is_object());
    Ok(())
}
