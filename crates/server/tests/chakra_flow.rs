mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};

use support::{body_json, build_app, get, json_request, send};

fn authed(mut req: Request<Body>, token: &str) -> anyhow::Result<Request<Body>> {
    req.headers_mut().insert("x-auth-token", token.parse()?);
    Ok(req)
}

async fn login(app: &Router, telegram_id: &str) -> anyhow::Result<(StatusCode, Value)> {
    let resp = send(app, json_request("POST", "/api/chakra/login", json!({"telegram_id": telegram_id}))?).await?;
    let status = resp.status();
    Ok((status, body_json(resp).await?))
}

#[tokio::test]
async fn login_requires_a_known_telegram_id() -> anyhow::Result<()> {
    let (app, _) = build_app().await?;
    let (status, _) = login(&app, "999").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = login(&app, "1001").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "owner");
    let token = body["token"].as_str().unwrap_or_default().to_string();

    let me = body_json(send(&app, authed(get("/api/chakra/me")?, &token)?).await?).await?;
    assert_eq!(me["is_admin"], true);

    let resp = send(&app, get("/api/chakra/me")?).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = send(&app, authed(get("/api/chakra/me")?, "garbage")?).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn owners_and_viewers_edit_their_own_rows() -> anyhow::Result<()> {
    let (app, _) = build_app().await?;
    let (_, owner) = login(&app, "1001").await?;
    let owner_token = owner["token"].as_str().unwrap_or_default().to_string();

    let resp = send(
        &app,
        authed(json_request("POST", "/api/chakra-admin/chakras", json!({"name": "Муладхара", "color": "red", "position": 1}))?, &owner_token)?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let chakra_id = body_json(resp).await?["id"].as_i64().unwrap_or_default();

    let resp = send(
        &app,
        authed(json_request("POST", "/api/chakra-admin/users", json!({"name": "Вера", "telegram_id": "2002"}))?, &owner_token)?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let (_, viewer) = login(&app, "2002").await?;
    let viewer_token = viewer["token"].as_str().unwrap_or_default().to_string();

    let resp = send(
        &app,
        authed(json_request("POST", "/api/chakra-admin/entries/concepts", json!({"chakra_id": chakra_id, "title": "Опора", "details": "тело"}))?, &owner_token)?,
    )
    .await?;
    let owner_entry = body_json(resp).await?["id"].as_i64().unwrap_or_default();

    let resp = send(
        &app,
        authed(json_request("POST", "/api/chakra-admin/entries/concepts", json!({"chakra_id": chakra_id, "title": "Корни"}))?, &viewer_token)?,
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let mine = body_json(send(&app, authed(get("/api/chakra-admin/entries/concepts")?, &viewer_token)?).await?).await?;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));

    let uri = format!("/api/chakra-admin/entries/concepts/{owner_entry}");
    let resp = send(&app, authed(json_request("PUT", &uri, json!({"title": "Чужое"}))?, &viewer_token)?).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(&app, authed(json_request("PUT", &format!("/api/chakras/{chakra_id}"), json!({"color": "crimson"}))?, &viewer_token)?).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = send(&app, authed(json_request("PUT", &format!("/api/chakras/{chakra_id}"), json!({"color": "crimson"}))?, &owner_token)?).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, get("/api/chakra-admin/entries/unknowns")?).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = send(&app, authed(get("/api/chakra-admin/entries/unknowns")?, &owner_token)?).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let detail = body_json(send(&app, get(&format!("/api/chakras/{chakra_id}"))?).await?).await?;
    assert_eq!(detail["color"], "crimson");
    assert_eq!(detail["concepts"].as_array().map(Vec::len), Some(2));

    let resp = send(&app, authed(get("/api/chakra-admin/history")?, &viewer_token)?).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let history = body_json(send(&app, authed(get(&format!("/api/chakra-admin/history?chakra_id={chakra_id}"))?, &owner_token)?).await?).await?;
    assert!(history.as_array().is_some_and(|h| h.iter().any(|row| row["field_name"] == "chakras.color")));
    Ok(())
}
