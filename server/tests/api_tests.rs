use std::sync::Arc;

use chartnotes_data::{LocalStore, MemorySlot};
use chartnotes_server::{service_handler, AppState};
use hyper::{body::Body, Method, Request, StatusCode};
use serde_json::{json, Value};

fn state() -> Arc<AppState> {
    AppState::new(Arc::new(LocalStore::new(MemorySlot::new())))
}

async fn call(
    state: &Arc<AppState>,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, hyper::HeaderMap, String) {
    let body = body.map_or_else(Body::empty, |v| Body::from(v.to_string()));
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = service_handler(state.clone(), req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn call_json(
    state: &Arc<AppState>,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, text) = call(state, method, uri, body).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_create_then_list_round_trip() {
    let state = state();
    let (status, created) = call_json(
        &state,
        Method::POST,
        "/api/points",
        Some(json!({"month": "Jan", "value": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["note"], Value::Null);
    assert_eq!(created["month"], "Jan");
    assert!(created["created_at"].is_string());

    let (status, points) = call_json(&state, Method::GET, "/api/points", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(points, json!([created]));
}

#[tokio::test]
async fn test_create_requires_month_and_value() {
    let state = state();
    let (status, body) = call_json(
        &state,
        Method::POST,
        "/api/points",
        Some(json!({"month": "Jan"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("month and value are required"));

    let (status, _) = call_json(&state, Method::GET, "/api/points", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_and_delete() {
    let state = state();
    let (_, created) = call_json(
        &state,
        Method::POST,
        "/api/points",
        Some(json!({"month": "Feb", "value": 5, "note": "launch"})),
    )
    .await;
    let uri = format!("/api/points/{}", created["id"]);

    let (status, updated) =
        call_json(&state, Method::PUT, &uri, Some(json!({"value": 7.5}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["value"], 7.5);
    assert_eq!(updated["note"], "launch");
    assert_eq!(updated["created_at"], created["created_at"]);

    let (status, _) = call_json(&state, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call_json(&state, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_bad_ids_and_unknown_routes() {
    let state = state();
    let (status, _) = call_json(
        &state,
        Method::PUT,
        "/api/points/abc",
        Some(json!({"value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call_json(
        &state,
        Method::PUT,
        "/api/points/99",
        Some(json!({"value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call_json(&state, Method::GET, "/api/nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_all_keeps_ids_increasing() {
    let state = state();
    let (_, first) = call_json(
        &state,
        Method::POST,
        "/api/points",
        Some(json!({"month": "Jan", "value": 1})),
    )
    .await;

    let (status, _) = call_json(&state, Method::DELETE, "/api/points", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, points) = call_json(&state, Method::GET, "/api/points", None).await;
    assert_eq!(points, json!([]));

    let (_, next) = call_json(
        &state,
        Method::POST,
        "/api/points",
        Some(json!({"month": "Feb", "value": 2})),
    )
    .await;
    assert!(next["id"].as_i64().unwrap() > first["id"].as_i64().unwrap());
}

#[tokio::test]
async fn test_settings_merge_over_defaults() {
    let state = state();
    let (status, defaults) = call_json(&state, Method::GET, "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["lineStyle"], "curved");
    assert_eq!(defaults["showGrid"], true);

    let (status, saved) = call_json(
        &state,
        Method::PUT,
        "/api/settings",
        Some(json!({"title": "Sales", "theme": "dark"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["title"], "Sales");
    assert_eq!(saved["bubbleColor"], "#333333");

    let (_, fetched) = call_json(&state, Method::GET, "/api/settings", None).await;
    assert_eq!(fetched, saved);
}

#[tokio::test]
async fn test_chart_svg() {
    let state = state();
    let (status, _) = call_json(&state, Method::GET, "/api/chart.svg", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    for (month, value, note) in [("Jan", 100, "good start"), ("Feb", 80, ""), ("Mar", 150, "")] {
        call_json(
            &state,
            Method::POST,
            "/api/points",
            Some(json!({"month": month, "value": value, "note": note})),
        )
        .await;
    }

    let (status, headers, svg) =
        call(&state, Method::GET, "/api/chart.svg?width=640&notes=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "image/svg+xml");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("good start"));
    assert_eq!(svg.matches("class=\"note-bubble\"").count(), 1);
}

#[tokio::test]
async fn test_cors_preflight_and_health() {
    let state = state();
    let (status, headers, _) = call(&state, Method::OPTIONS, "/api/points", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert!(headers["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .contains("PUT"));

    let (status, body) = call_json(&state, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}
