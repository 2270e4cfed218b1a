//! 监测会话注册表
//!
//! 每个会话持有一个独立的引擎实例与一个事件广播通道。同一会话的帧在会话锁内
//! 串行处理，不同会话互不阻塞。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use uuid::Uuid;
use wellness_engine::{
    EngineEvent, FeatureToggles, FrameOutcome, LandmarkError, LandmarkFrame, TimestampMs,
    WellnessConfig, WellnessEngine,
};

/// 每个会话事件通道的缓冲长度；慢订阅者会丢失最旧的事件
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(Uuid),
    #[error("session limit of {0} reached")]
    LimitReached(usize),
    #[error("invalid landmarks: {0}")]
    InvalidLandmarks(#[from] LandmarkError),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// 服务端当前时间（Unix 毫秒）
pub fn server_now_ms() -> TimestampMs {
    Utc::now().timestamp_millis()
}

/// 会话的时间来源
///
/// 客户端一旦在帧里携带 `timestampMs`，会话就改用客户端时钟，
/// 快照以最近一帧的时间为准，避免两种时间基混用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionClock {
    Server,
    Client { last: TimestampMs },
}

pub struct EngineSession {
    id: Uuid,
    engine: WellnessEngine,
    events_tx: broadcast::Sender<EngineEvent>,
    clock: SessionClock,
    created_at: DateTime<Utc>,
    last_seen: Instant,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub config: WellnessConfig,
    pub toggles: FeatureToggles,
}

impl EngineSession {
    fn new(
        id: Uuid,
        config: WellnessConfig,
        toggles: FeatureToggles,
        started_at: Option<TimestampMs>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (clock, now) = match started_at {
            Some(ts) => (SessionClock::Client { last: ts }, ts),
            None => (SessionClock::Server, server_now_ms()),
        };
        Self {
            id,
            engine: WellnessEngine::new(config, toggles, now),
            events_tx,
            clock,
            created_at: Utc::now(),
            last_seen: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn engine(&self) -> &WellnessEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut WellnessEngine {
        self.touch();
        &mut self.engine
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            created_at: self.created_at,
            config: self.engine.effective_config().clone(),
            toggles: self.engine.toggles().clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    /// 会话时钟下的“现在”
    pub fn now(&self) -> TimestampMs {
        match self.clock {
            SessionClock::Server => server_now_ms(),
            SessionClock::Client { last } => last,
        }
    }

    fn advance_clock(&mut self, supplied: Option<TimestampMs>) -> TimestampMs {
        match supplied {
            Some(ts) => {
                self.clock = SessionClock::Client { last: ts };
                ts
            }
            None => self.now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// 处理一帧并把产生的事件广播给订阅者
    ///
    /// `timestamp` 为空时使用会话时钟。
    pub fn process_frame(
        &mut self,
        landmarks: Option<&LandmarkFrame>,
        frame_width_px: f64,
        timestamp: Option<TimestampMs>,
    ) -> FrameOutcome {
        self.touch();
        let now = self.advance_clock(timestamp);
        let outcome = self.engine.process_frame(landmarks, frame_width_px, now);
        for event in &outcome.events {
            // 没有订阅者时发送失败，忽略即可
            let _ = self.events_tx.send(event.clone());
        }
        outcome
    }
}

pub type SessionHandle = Arc<Mutex<EngineSession>>;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    pub async fn create(
        &self,
        config: WellnessConfig,
        toggles: FeatureToggles,
        started_at: Option<TimestampMs>,
    ) -> Result<SessionInfo, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::LimitReached(self.max_sessions));
        }

        let id = Uuid::new_v4();
        let session = EngineSession::new(id, config, toggles, started_at);
        let info = session.info();
        sessions.insert(id, Arc::new(Mutex::new(session)));
        tracing::info!(session_id = %id, active = sessions.len(), "Session created");
        Ok(info)
    }

    pub async fn get(&self, id: Uuid) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(_) => {
                tracing::info!(session_id = %id, "Session ended");
                Ok(())
            }
            None => Err(SessionError::NotFound(id)),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// 移除空闲超过 `idle_timeout` 的会话，返回移除数量
    ///
    /// 正在处理帧的会话（锁被占用）视为活跃，跳过。
    pub async fn sweep_idle(&self, idle_timeout: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.idle_for() <= idle_timeout,
            Err(_) => true,
        });
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use wellness_engine::Point;

    use super::*;

    fn frame(baseline: f64) -> LandmarkFrame {
        LandmarkFrame {
            distance_left: Point::new(0.5 - baseline / 2.0, 0.5),
            distance_right: Point::new(0.5 + baseline / 2.0, 0.5),
            left_upper_lid: Point::new(0.4, 0.4),
            left_lower_lid: Point::new(0.4, 0.43),
            right_upper_lid: Point::new(0.6, 0.4),
            right_lower_lid: Point::new(0.6, 0.43),
        }
    }

    #[tokio::test]
    async fn create_get_remove() {
        let registry = SessionRegistry::new(4);
        let info = registry
            .create(WellnessConfig::default(), FeatureToggles::default(), Some(0))
            .await
            .unwrap();
        assert_eq!(registry.len().await, 1);

        let handle = registry.get(info.id).await.unwrap();
        assert_eq!(handle.lock().await.id(), info.id);

        registry.remove(info.id).await.unwrap();
        assert!(registry.is_empty().await);
        assert!(matches!(
            registry.get(info.id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            registry.remove(info.id).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn enforces_session_limit() {
        let registry = SessionRegistry::new(1);
        registry
            .create(WellnessConfig::default(), FeatureToggles::default(), Some(0))
            .await
            .unwrap();
        let err = registry
            .create(WellnessConfig::default(), FeatureToggles::default(), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::LimitReached(1)));
    }

    #[tokio::test]
    async fn frame_events_reach_subscribers() {
        let registry = SessionRegistry::new(1);
        let cfg = WellnessConfig {
            reminder_stride: 1,
            ..WellnessConfig::default()
        };
        let info = registry
            .create(cfg, FeatureToggles::default(), Some(0))
            .await
            .unwrap();
        let handle = registry.get(info.id).await.unwrap();
        let mut session = handle.lock().await;
        let mut rx = session.subscribe();

        // 约 20 cm，平滑距离降到下限以下后触发“太近”提醒
        let baseline = 6.3 * 600.0 / 20.0 / 640.0;
        let mut first_events = None;
        for i in 0..20 {
            let outcome = session.process_frame(Some(&frame(baseline)), 640.0, Some(1_000 + i * 33));
            if !outcome.events.is_empty() {
                first_events = Some(outcome.events);
                break;
            }
        }
        let events = first_events.expect("reminder within 20 frames");
        let received = rx.try_recv().unwrap();
        assert_eq!(received, events[0]);
    }

    #[tokio::test]
    async fn client_timestamps_switch_the_clock() {
        let registry = SessionRegistry::new(1);
        let info = registry
            .create(WellnessConfig::default(), FeatureToggles::default(), None)
            .await
            .unwrap();
        let handle = registry.get(info.id).await.unwrap();
        let mut session = handle.lock().await;
        assert!(session.now() > 1_600_000_000_000);

        session.process_frame(None, 640.0, Some(42_000));
        assert_eq!(session.now(), 42_000);
        session.process_frame(None, 640.0, None);
        assert_eq!(session.now(), 42_000);
    }

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let registry = SessionRegistry::new(4);
        let info = registry
            .create(WellnessConfig::default(), FeatureToggles::default(), Some(0))
            .await
            .unwrap();
        assert_eq!(registry.sweep_idle(Duration::from_secs(60)).await, 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.sweep_idle(Duration::from_millis(5)).await, 1);
        assert!(registry.get(info.id).await.is_err());
    }
}
