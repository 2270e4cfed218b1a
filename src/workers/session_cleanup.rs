use std::time::Duration;

use crate::sessions::SessionRegistry;

/// 清理空闲会话
pub async fn run(sessions: &SessionRegistry, idle_timeout: Duration) {
    tracing::debug!("session_cleanup: start");
    let removed = sessions.sweep_idle(idle_timeout).await;
    if removed > 0 {
        let remaining = sessions.len().await;
        tracing::info!(
            removed,
            remaining,
            "session_cleanup: done"
        );
    } else {
        tracing::debug!("session_cleanup: nothing to remove");
    }
}

#[cfg(test)]
mod tests {
    use wellness_engine::{FeatureToggles, WellnessConfig};

    use super::*;

    #[tokio::test]
    async fn removes_sessions_past_timeout() {
        let sessions = SessionRegistry::new(4);
        sessions
            .create(WellnessConfig::default(), FeatureToggles::default(), None)
            .await
            .unwrap();

        run(&sessions, Duration::from_secs(3600)).await;
        assert_eq!(sessions.len().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        run(&sessions, Duration::from_millis(1)).await;
        assert!(sessions.is_empty().await);
    }
}
