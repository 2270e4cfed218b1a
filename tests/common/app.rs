use axum::Router;
use tokio::sync::broadcast;

use screen_wellness::config::{Config, EngineEnvConfig, LimitsConfig, SessionConfig};
use screen_wellness::routes::build_router;
use screen_wellness::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
}

/// 直接构造 Config，避免 set_var 造成多线程测试环境变量竞态
pub fn test_config(max_sessions: usize, reminder_stride: u32) -> Config {
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        sessions: SessionConfig {
            max_sessions,
            idle_timeout_secs: 1800,
            sweep_cron: "0 */5 * * * *".to_string(),
        },
        engine: EngineEnvConfig { reminder_stride },
        limits: LimitsConfig {
            max_sse_connections: 16,
        },
    }
}

pub fn spawn_with_config(config: Config) -> TestApp {
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(&config, shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
    }
}

pub async fn spawn_test_server() -> TestApp {
    spawn_with_config(test_config(16, 30))
}

/// 每帧都检查提醒，便于断言
pub async fn spawn_eager_reminder_server() -> TestApp {
    spawn_with_config(test_config(16, 1))
}
