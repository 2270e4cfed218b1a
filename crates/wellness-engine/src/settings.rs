//! 用户设置表单解析
//!
//! 设置面板以用户习惯的单位提交数值（厘米、秒、分钟），值可能是数字、
//! 字符串，也可能缺失或非法。每个字段独立解析，非法时回退到文档默认值，
//! 不会因为单个字段错误而放弃整体配置。

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::WellnessConfig;

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("value is missing")]
    Missing,
    #[error("value {0:?} is not numeric")]
    NotNumeric(String),
    #[error("value {0} must be a positive finite number")]
    OutOfRange(f64),
}

fn parse_value(value: Option<&SettingValue>) -> Result<f64, SettingsError> {
    let parsed = match value {
        None => return Err(SettingsError::Missing),
        Some(SettingValue::Number(n)) => *n,
        Some(SettingValue::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| SettingsError::NotNumeric(s.clone()))?,
        Some(SettingValue::Other(_)) => {
            return Err(SettingsError::NotNumeric("<non-scalar>".to_string()))
        }
    };
    if parsed.is_finite() && parsed > 0.0 {
        Ok(parsed)
    } else {
        Err(SettingsError::OutOfRange(parsed))
    }
}

/// Raw settings as submitted by the host's settings panel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsForm {
    pub min_distance: Option<SettingValue>,
    pub optimal_distance: Option<SettingValue>,
    pub max_distance: Option<SettingValue>,
    /// seconds
    pub notification_cooldown: Option<SettingValue>,
    pub blink_threshold: Option<SettingValue>,
    /// seconds
    pub blink_timeout: Option<SettingValue>,
    /// minutes
    pub screen_time_limit: Option<SettingValue>,
    /// minutes
    pub break_reminder: Option<SettingValue>,
    /// minutes
    pub breathing_reminder: Option<SettingValue>,
}

/// Settings rendered back in form units.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub min_distance: f64,
    pub optimal_distance: f64,
    pub max_distance: f64,
    pub notification_cooldown: f64,
    pub blink_threshold: f64,
    pub blink_timeout: f64,
    pub screen_time_limit: f64,
    pub break_reminder: f64,
    pub breathing_reminder: f64,
}

/// A field that was replaced by its default during parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFallback {
    pub field: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AppliedSettings {
    pub config: WellnessConfig,
    pub fallbacks: Vec<SettingsFallback>,
}

struct FieldParser {
    fallbacks: Vec<SettingsFallback>,
}

impl FieldParser {
    fn field(&mut self, name: &'static str, value: Option<&SettingValue>, default: f64) -> f64 {
        match parse_value(value) {
            Ok(v) => v,
            Err(SettingsError::Missing) => {
                self.fallbacks.push(SettingsFallback {
                    field: name,
                    reason: SettingsError::Missing.to_string(),
                });
                default
            }
            Err(e) => {
                tracing::warn!(field = name, error = %e, default, "Invalid setting, using default");
                self.fallbacks.push(SettingsFallback {
                    field: name,
                    reason: e.to_string(),
                });
                default
            }
        }
    }
}

impl SettingsForm {
    /// Builds a config from this form. Parameters the form does not carry
    /// (focal length, pupil distance, smoothing, stride, zoom) come from `base`.
    pub fn apply_to(&self, base: &WellnessConfig) -> AppliedSettings {
        let d = WellnessConfig::default();
        let mut p = FieldParser {
            fallbacks: Vec::new(),
        };

        let min_distance_cm = p.field("minDistance", self.min_distance.as_ref(), d.min_distance_cm);
        let optimal_distance_cm = p.field(
            "optimalDistance",
            self.optimal_distance.as_ref(),
            d.optimal_distance_cm,
        );
        let max_distance_cm = p.field("maxDistance", self.max_distance.as_ref(), d.max_distance_cm);
        let cooldown_s = p.field(
            "notificationCooldown",
            self.notification_cooldown.as_ref(),
            d.notification_cooldown_ms as f64 / MS_PER_SECOND,
        );
        let blink_threshold = p.field("blinkThreshold", self.blink_threshold.as_ref(), d.blink_threshold);
        let blink_timeout_s = p.field(
            "blinkTimeout",
            self.blink_timeout.as_ref(),
            d.blink_timeout_ms as f64 / MS_PER_SECOND,
        );
        let screen_time_min = p.field(
            "screenTimeLimit",
            self.screen_time_limit.as_ref(),
            d.screen_time_limit_ms as f64 / MS_PER_MINUTE,
        );
        let break_min = p.field(
            "breakReminder",
            self.break_reminder.as_ref(),
            d.break_reminder_ms as f64 / MS_PER_MINUTE,
        );
        let breathing_min = p.field(
            "breathingReminder",
            self.breathing_reminder.as_ref(),
            d.breathing_reminder_ms as f64 / MS_PER_MINUTE,
        );

        let config = WellnessConfig {
            min_distance_cm,
            optimal_distance_cm,
            max_distance_cm,
            notification_cooldown_ms: (cooldown_s * MS_PER_SECOND).round() as i64,
            blink_threshold,
            blink_timeout_ms: (blink_timeout_s * MS_PER_SECOND).round() as i64,
            screen_time_limit_ms: (screen_time_min * MS_PER_MINUTE).round() as i64,
            break_reminder_ms: (break_min * MS_PER_MINUTE).round() as i64,
            breathing_reminder_ms: (breathing_min * MS_PER_MINUTE).round() as i64,
            ..base.clone()
        };

        if config.min_distance_cm >= config.max_distance_cm {
            tracing::warn!(
                min = config.min_distance_cm,
                max = config.max_distance_cm,
                "Distance range is empty; every distance will be flagged"
            );
        }

        AppliedSettings {
            config,
            fallbacks: p.fallbacks,
        }
    }
}

impl From<&WellnessConfig> for SettingsView {
    fn from(cfg: &WellnessConfig) -> Self {
        Self {
            min_distance: cfg.min_distance_cm,
            optimal_distance: cfg.optimal_distance_cm,
            max_distance: cfg.max_distance_cm,
            notification_cooldown: cfg.notification_cooldown_ms as f64 / MS_PER_SECOND,
            blink_threshold: cfg.blink_threshold,
            blink_timeout: cfg.blink_timeout_ms as f64 / MS_PER_SECOND,
            screen_time_limit: cfg.screen_time_limit_ms as f64 / MS_PER_MINUTE,
            break_reminder: cfg.break_reminder_ms as f64 / MS_PER_MINUTE,
            breathing_reminder: cfg.breathing_reminder_ms as f64 / MS_PER_MINUTE,
        }
    }
}
