use std::net::SocketAddr;

use axum::http::{header, HeaderValue};
use screen_wellness::config::Config;
use screen_wellness::logging::{init_tracing, LogConfig};
use screen_wellness::response::panic_response;
use screen_wellness::routes::build_router;
use screen_wellness::state::AppState;
use screen_wellness::workers::WorkerManager;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&LogConfig {
        log_level: config.log_level.clone(),
        enable_file_logs: config.enable_file_logs,
        log_dir: config.log_dir.clone(),
    });
    tracing::info!(?config, "Starting screen-wellness");

    let cors_layer = match build_cors_layer(&config) {
        Ok(layer) => layer,
        Err(e) => {
            tracing::error!(cors_origin = %config.cors_origin, error = %e, "Invalid CORS_ORIGIN");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(&config, shutdown_tx.clone());

    let worker_manager = WorkerManager::new(
        state.sessions().clone(),
        shutdown_tx.subscribe(),
        &config.sessions,
    );
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker_manager.start().await {
            tracing::error!(error = %e, "Worker manager failed");
        }
    });

    let app = build_router(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "Listening");

    // Worker 作为独立后台任务运行，panic 仅记录错误，不终止 HTTP 服务器
    tokio::spawn(async move {
        match worker_handle.await {
            Err(e) => tracing::error!(error = %e, "Worker task panicked, HTTP server continues"),
            Ok(()) => tracing::info!("Worker manager exited normally"),
        }
    });

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()))
        .await
    {
        tracing::error!(error = %e, "HTTP server crashed");
    }

    tracing::info!("Shutdown complete");
}

fn build_cors_layer(config: &Config) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let layer = CorsLayer::new()
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_methods(Any);

    if config.cors_origin.trim() == "*" {
        // 通配符仅用于开发环境
        return Ok(layer.allow_origin(Any));
    }

    let origin = config.cors_origin.parse::<HeaderValue>()?;
    Ok(layer.allow_origin(origin))
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
