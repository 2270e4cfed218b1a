use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::response::AppError;

/// `axum::Json<T>` 的包装，反序列化失败时返回统一的 `AppError`
/// 而不是 axum 默认的纯文本拒绝。
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection_to_app_error(rejection)),
        }
    }
}

fn json_rejection_to_app_error(rejection: JsonRejection) -> AppError {
    let message = match &rejection {
        JsonRejection::JsonDataError(e) => e.body_text(),
        JsonRejection::JsonSyntaxError(_) => "请求体不是合法的 JSON".to_string(),
        JsonRejection::MissingJsonContentType(_) => "需要 application/json 请求体".to_string(),
        _ => "请求体格式无效".to_string(),
    };
    tracing::warn!(error = %rejection, "JSON body rejected");
    AppError::bad_request("INVALID_REQUEST_BODY", &message)
}

/// 路径中的会话 ID；格式非法时直接 404，与不存在的会话一致
pub struct SessionId(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::not_found("SESSION_NOT_FOUND", "session not found"))?;
        Uuid::parse_str(&raw)
            .map(SessionId)
            .map_err(|_| AppError::not_found("SESSION_NOT_FOUND", "session not found"))
    }
}
