use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use wellness_engine::EngineEvent;

use crate::extractors::SessionId;
use crate::response::AppError;
use crate::state::AppState;

static SSE_CONNECTION_COUNT: AtomicUsize = AtomicUsize::new(0);

struct SseGuard;
impl Drop for SseGuard {
    fn drop(&mut self) {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 事件名取自 `type` 标签，数据为完整 JSON
fn event_parts(event: &EngineEvent) -> Option<(String, String)> {
    let json = serde_json::to_value(event).ok()?;
    let name = json
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("engine")
        .to_string();
    Some((name, json.to_string()))
}

fn to_sse_event(event: &EngineEvent) -> Option<Event> {
    let (name, data) = event_parts(event)?;
    Some(Event::default().event(name).data(data))
}

/// `GET /api/sessions/:id/events`
///
/// 推送该会话此后产生的所有引擎事件。会话结束时发送 `sessionEnded` 并关闭流；
/// 订阅者跟不上时发送 `lagged`，携带丢弃的事件数。
pub async fn session_events(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    // 只持有接收端，不持有会话本身，会话删除后流能感知到通道关闭
    let rx = {
        let handle = state.sessions().get(id).await?;
        let session = handle.lock().await;
        session.subscribe()
    };

    let max_sse = state.config().limits.max_sse_connections;
    let current = SSE_CONNECTION_COUNT.fetch_add(1, Ordering::SeqCst);
    if current >= max_sse {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::too_many_requests("Too many SSE connections"));
    }

    let mut shutdown_rx = state.shutdown_rx();
    let mut events = BroadcastStream::new(rx);
    tracing::debug!(session_id = %id, "SSE subscriber attached");

    let stream = async_stream::stream! {
        let _guard = SseGuard;

        loop {
            tokio::select! {
                item = events.next() => {
                    match item {
                        Some(Ok(event)) => {
                            if let Some(sse) = to_sse_event(&event) {
                                yield Ok(sse);
                            }
                        }
                        Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                            tracing::warn!(session_id = %id, skipped, "SSE subscriber lagged");
                            yield Ok(Event::default()
                                .event("lagged")
                                .data(serde_json::json!({ "skipped": skipped }).to_string()));
                        }
                        None => {
                            yield Ok(Event::default()
                                .event("sessionEnded")
                                .data(serde_json::json!({ "sessionId": id }).to_string()));
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_name_follows_type_tag() {
        let (name, data) = event_parts(&EngineEvent::BlinkDetected { blink_count: 3 })
            .expect("serializable event");
        assert_eq!(name, "blinkDetected");
        let json: serde_json::Value = serde_json::from_str(&data).expect("json data");
        assert_eq!(json["type"], "blinkDetected");
        assert_eq!(json["blinkCount"], 3);

        let (name, _) =
            event_parts(&EngineEvent::ZoomChanged { scale: 0.95 }).expect("serializable event");
        assert_eq!(name, "zoomChanged");
    }
}
