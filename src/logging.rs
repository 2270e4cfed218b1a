use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

fn build_file_appender(log_dir: &str) -> Result<RollingFileAppender, String> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("screen-wellness")
        .filename_suffix("log")
        .max_log_files(30)
        .build(log_dir)
        .map_err(|e| e.to_string())
}

fn report_init_error(e: impl std::fmt::Display) {
    // 全局 subscriber 已设置（如测试环境）属于正常情况
    let msg = e.to_string();
    if !msg.contains("already been set") {
        eprintln!("Failed to initialize tracing: {msg}");
    }
}

pub fn init_tracing(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stdout_layer = fmt::layer().with_target(true).with_thread_ids(false);

    let registry = Registry::default().with(env_filter).with(stdout_layer);

    if !config.enable_file_logs {
        if let Err(e) = registry.try_init() {
            report_init_error(e);
        }
        return;
    }

    match build_file_appender(&config.log_dir) {
        Ok(file_appender) => {
            let file_layer = fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .json();
            if let Err(e) = registry.with(file_layer).try_init() {
                report_init_error(e);
            }
        }
        Err(err) => {
            if let Err(e) = registry.try_init() {
                report_init_error(e);
            }
            tracing::warn!(error = %err, log_dir = %config.log_dir, "File logs disabled: cannot create appender");
        }
    }
}
