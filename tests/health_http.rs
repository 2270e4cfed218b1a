mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::app::{spawn_test_server, spawn_with_config, test_config};
use common::http::{assert_json_error, call, request, response_json};

#[tokio::test]
async fn it_health_live_and_ready() {
    let app = spawn_test_server().await;

    let live = request(&app.app, Method::GET, "/health/live", None, &[]).await;
    let (live_status, _, _) = response_json(live).await;
    assert_eq!(live_status, StatusCode::OK);

    let ready = request(&app.app, Method::GET, "/health/ready", None, &[]).await;
    let (ready_status, _, _) = response_json(ready).await;
    assert_eq!(ready_status, StatusCode::OK);
}

#[tokio::test]
async fn it_health_reports_sessions() {
    let app = spawn_test_server().await;
    call(&app.app, Method::POST, "/api/sessions", Some(json!({}))).await;

    let (status, body) = call(&app.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"]["active"], 1);
    assert_eq!(body["sessions"]["max"], 16);
    assert!(body["uptimeSecs"].is_u64());
}

#[tokio::test]
async fn it_not_ready_when_session_limit_reached() {
    let app = spawn_with_config(test_config(1, 30));
    call(&app.app, Method::POST, "/api/sessions", Some(json!({}))).await;

    let (status, body) = call(&app.app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_json_error(&body, "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn it_unknown_route_is_json_404_with_request_id() {
    let app = spawn_test_server().await;

    let resp = request(
        &app.app,
        Method::GET,
        "/api/nope",
        None,
        &[("x-request-id", "trace-abc_123".to_string())],
    )
    .await;
    let (status, headers, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        headers.get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-abc_123")
    );
    assert_json_error(&body, "NOT_FOUND");
    assert_eq!(body["traceId"], "trace-abc_123");
}

#[tokio::test]
async fn it_invalid_request_id_is_replaced() {
    let app = spawn_test_server().await;

    let resp = request(
        &app.app,
        Method::GET,
        "/health/live",
        None,
        &[("x-request-id", "bad id!".to_string())],
    )
    .await;
    let id = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("request id header")
        .to_string();
    assert_ne!(id, "bad id!");
    assert!(uuid::Uuid::parse_str(&id).is_ok());
}
