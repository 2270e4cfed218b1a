use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::sessions::SessionError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub is_operational: bool,
}

impl AppError {
    pub fn bad_request(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn not_found(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn too_many_requests(message: &str) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            code: "RATE_LIMITED".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.to_string(),
            is_operational: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let exposed_message = if self.is_operational {
            self.message.clone()
        } else {
            "服务器内部错误".to_string()
        };

        if self.is_operational {
            tracing::warn!(status = %self.status, code = %self.code, error = %self.message, "API error");
        } else {
            tracing::error!(status = %self.status, code = %self.code, error = %self.message, "Internal API error");
        }

        (
            self.status,
            Json(ErrorBody {
                success: false,
                code: self.code,
                message: exposed_message,
                trace_id: None,
            }),
        )
            .into_response()
    }
}

// SessionError 映射：
// - NotFound -> 404 SESSION_NOT_FOUND
// - LimitReached -> 429
// - 关键点 / 帧格式错误 -> 400（调用方输入问题，可安全暴露消息）
impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        let message = value.to_string();
        match value {
            SessionError::NotFound(_) => AppError::not_found("SESSION_NOT_FOUND", &message),
            SessionError::LimitReached(_) => AppError {
                code: "SESSION_LIMIT_REACHED".to_string(),
                ..AppError::too_many_requests(&message)
            },
            SessionError::InvalidLandmarks(_) => {
                AppError::bad_request("INVALID_LANDMARKS", &message)
            }
            SessionError::InvalidFrame(_) => AppError::bad_request("INVALID_FRAME", &message),
        }
    }
}

/// `CatchPanicLayer` 的兜底响应：记录 panic 信息，对外只返回通用内部错误
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Handler panicked");
    AppError::internal(detail).into_response()
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data,
        }),
    )
}

pub fn created<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data,
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::response::IntoResponse;
    use uuid::Uuid;
    use wellness_engine::LandmarkError;

    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn internal_error_is_redacted() {
        let resp = AppError::internal("engine lock poisoned").into_response();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("poisoned"));
        assert!(text.contains("服务器内部错误"));
    }

    #[tokio::test]
    async fn panic_becomes_redacted_500() {
        let resp = panic_response(Box::new(String::from("engine state corrupted")));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["message"], "服务器内部错误");

        let resp = panic_response(Box::new("static message"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn bad_request_keeps_message() {
        let resp = AppError::bad_request("BAD_INPUT", "frameWidth must be positive").into_response();
        let json = body_json(resp).await;
        assert_eq!(json["code"], "BAD_INPUT");
        assert_eq!(json["message"], "frameWidth must be positive");
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn session_errors_map_to_status() {
        let not_found: AppError = SessionError::NotFound(Uuid::nil()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.code, "SESSION_NOT_FOUND");

        let limit: AppError = SessionError::LimitReached(2).into();
        assert_eq!(limit.status, StatusCode::TOO_MANY_REQUESTS);

        let landmarks: AppError =
            SessionError::from(LandmarkError::OddCoordinateCount(3)).into();
        assert_eq!(landmarks.status, StatusCode::BAD_REQUEST);
        let json = body_json(landmarks.into_response()).await;
        assert_eq!(json["code"], "INVALID_LANDMARKS");
    }
}
