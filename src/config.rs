use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use wellness_engine::WellnessConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    pub sessions: SessionConfig,
    pub engine: EngineEnvConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_sessions: usize,
    pub idle_timeout_secs: u64,
    /// 六段式 cron（含秒）
    pub sweep_cron: String,
}

#[derive(Debug, Clone)]
pub struct EngineEnvConfig {
    pub reminder_stride: u32,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_sse_connections: usize,
}

impl EngineEnvConfig {
    /// 新会话的默认引擎配置
    pub fn wellness_config(&self) -> WellnessConfig {
        WellnessConfig {
            reminder_stride: self.reminder_stride,
            ..WellnessConfig::default()
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            sessions: SessionConfig {
                max_sessions: env_or_parse("MAX_SESSIONS", 256_usize),
                idle_timeout_secs: env_or_parse("SESSION_IDLE_TIMEOUT_SECS", 1800_u64),
                sweep_cron: env_or("SESSION_SWEEP_CRON", "0 */5 * * * *"),
            },
            engine: EngineEnvConfig {
                reminder_stride: positive_or_default(
                    "REMINDER_STRIDE",
                    env_or_parse("REMINDER_STRIDE", 30_u32),
                    30,
                ),
            },
            limits: LimitsConfig {
                max_sse_connections: env_or_parse("MAX_SSE_CONNECTIONS", 64_usize),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn positive_or_default(key: &str, value: u32, default: u32) -> u32 {
    if value == 0 {
        tracing::warn!(key, "Value must be positive, using default");
        default
    } else {
        value
    }
}
