use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let active = state.sessions().len().await;
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.uptime_secs(),
        "sessions": {
            "active": active,
            "max": state.config().sessions.max_sessions,
        }
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// 会话数达到上限时不再接收新会话，报告未就绪
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.sessions().len().await < state.config().sessions.max_sessions {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
