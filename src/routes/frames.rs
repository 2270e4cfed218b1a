use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;
use wellness_engine::{LandmarkFrame, Point, TimestampMs};

use crate::extractors::{JsonBody, SessionId};
use crate::response::{ok, AppError};
use crate::sessions::SessionError;
use crate::state::AppState;

/// 一帧检测结果。`landmarks` 为 `null` 表示本帧没有人脸。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    #[serde(default)]
    pub landmarks: Option<Vec<Point>>,
    #[serde(default)]
    pub frame_width: Option<f64>,
    #[serde(default)]
    pub timestamp_ms: Option<TimestampMs>,
}

impl FrameRequest {
    /// 校验并抽取引擎需要的关键点
    fn into_parts(self) -> Result<(Option<LandmarkFrame>, f64), SessionError> {
        let Some(points) = self.landmarks else {
            return Ok((None, self.frame_width.unwrap_or(0.0)));
        };

        let width = match self.frame_width {
            Some(w) if w.is_finite() && w > 0.0 => w,
            Some(w) => {
                return Err(SessionError::InvalidFrame(format!(
                    "frameWidth must be a positive number, got {w}"
                )))
            }
            None => {
                return Err(SessionError::InvalidFrame(
                    "frameWidth is required when landmarks are present".to_string(),
                ))
            }
        };

        let frame = LandmarkFrame::from_face_mesh(&points)?;
        Ok((Some(frame), width))
    }
}

pub async fn submit_frame(
    State(state): State<AppState>,
    SessionId(id): SessionId,
    JsonBody(req): JsonBody<FrameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions().get(id).await?;
    let timestamp = req.timestamp_ms;
    let (landmarks, width) = req.into_parts()?;

    let mut session = handle.lock().await;
    let outcome = session.process_frame(landmarks.as_ref(), width, timestamp);
    if !outcome.events.is_empty() {
        tracing::debug!(session_id = %id, events = outcome.events.len(), "Frame produced events");
    }
    Ok(ok(outcome))
}
