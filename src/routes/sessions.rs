use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use wellness_engine::settings::{SettingsFallback, SettingsForm, SettingsView};
use wellness_engine::{FeatureToggles, TimestampMs, ToggleUpdate};

use crate::extractors::{JsonBody, SessionId};
use crate::response::{created, ok, AppError};
use crate::routes::{frames, realtime};
use crate::sessions::SessionInfo;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_session))
        .route("/:id", get(get_session).delete(end_session))
        .route("/:id/settings", get(get_settings).put(replace_settings))
        .route("/:id/toggles", put(update_toggles))
        .route("/:id/frames", axum::routing::post(frames::submit_frame))
        .route("/:id/events", get(realtime::session_events))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub settings: Option<SettingsForm>,
    #[serde(default)]
    pub toggles: Option<ToggleUpdate>,
    /// 客户端时钟的会话起点；缺省使用服务端时间
    #[serde(default)]
    pub timestamp_ms: Option<TimestampMs>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSession {
    #[serde(flatten)]
    session: SessionInfo,
    settings: SettingsView,
    fallbacks: Vec<SettingsFallback>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsResponse {
    settings: SettingsView,
    fallbacks: Vec<SettingsFallback>,
}

async fn create_session(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let base = state.config().engine.wellness_config();
    let (config, fallbacks) = match &req.settings {
        Some(form) => {
            let applied = form.apply_to(&base);
            (applied.config, applied.fallbacks)
        }
        None => (base, Vec::new()),
    };

    let mut toggles = FeatureToggles::default();
    if let Some(update) = &req.toggles {
        toggles.apply(update);
    }

    let info = state
        .sessions()
        .create(config, toggles, req.timestamp_ms)
        .await?;

    Ok(created(CreatedSession {
        settings: SettingsView::from(&info.config),
        session: info,
        fallbacks,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions().get(id).await?;
    let session = handle.lock().await;
    Ok(ok(session.engine().snapshot(session.now())))
}

async fn end_session(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<impl IntoResponse, AppError> {
    state.sessions().remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_settings(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions().get(id).await?;
    let session = handle.lock().await;
    Ok(ok(SettingsView::from(session.engine().effective_config())))
}

/// 整体替换设置；新设置从下一帧开始生效
async fn replace_settings(
    State(state): State<AppState>,
    SessionId(id): SessionId,
    JsonBody(form): JsonBody<SettingsForm>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions().get(id).await?;
    let mut session = handle.lock().await;
    let engine = session.engine_mut();

    let applied = form.apply_to(engine.effective_config());
    let settings = SettingsView::from(&applied.config);
    engine.reconfigure(applied.config);
    tracing::info!(
        session_id = %id,
        fallbacks = applied.fallbacks.len(),
        "Session settings replaced"
    );

    Ok(ok(SettingsResponse {
        settings,
        fallbacks: applied.fallbacks,
    }))
}

async fn update_toggles(
    State(state): State<AppState>,
    SessionId(id): SessionId,
    JsonBody(update): JsonBody<ToggleUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions().get(id).await?;
    let mut session = handle.lock().await;
    let toggles = session.engine_mut().update_toggles(&update).clone();
    tracing::debug!(session_id = %id, ?toggles, "Feature toggles updated");
    Ok(ok(toggles))
}
