use serde::{Deserialize, Serialize};

/// Distance history capacity for the median prefilter.
pub const DISTANCE_HISTORY_LEN: usize = 10;

/// Lower bound on the smoothed distance (cm).
pub const MIN_STABLE_DISTANCE_CM: f64 = 1e-3;

/// Pixel baselines shorter than this are treated as degenerate.
pub const MIN_PIXEL_DISTANCE: f64 = 1e-6;

pub const ZOOM_MIN: f64 = 0.85;
pub const ZOOM_MAX: f64 = 1.15;

/// Host-side auto-dismiss for notifications.
pub const NOTIFICATION_DISPLAY_MS: u64 = 5_000;

/// Host-side duration of the breathing guide.
pub const BREATHING_GUIDE_DISPLAY_MS: u64 = 8_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessConfig {
    /// 相机焦距（像素）
    pub focal_length_px: f64,
    /// 平均瞳距（cm）
    pub avg_pupil_distance_cm: f64,
    pub min_distance_cm: f64,
    pub optimal_distance_cm: f64,
    pub max_distance_cm: f64,
    /// 指数平滑系数，越大越依赖历史值
    pub distance_smoothing: f64,
    pub notification_cooldown_ms: i64,
    pub blink_threshold: f64,
    pub blink_timeout_ms: i64,
    pub screen_time_limit_ms: i64,
    pub break_reminder_ms: i64,
    pub breathing_reminder_ms: i64,
    /// Reminder checks run once every `reminder_stride` processed frames.
    #[serde(default = "default_reminder_stride")]
    pub reminder_stride: u32,
    #[serde(default)]
    pub zoom: ZoomConfig,
}

fn default_reminder_stride() -> u32 {
    30
}

impl Default for WellnessConfig {
    fn default() -> Self {
        Self {
            focal_length_px: 600.0,
            avg_pupil_distance_cm: 6.3,
            min_distance_cm: 35.0,
            optimal_distance_cm: 55.0,
            max_distance_cm: 80.0,
            distance_smoothing: 0.8,
            notification_cooldown_ms: 30_000,
            blink_threshold: 0.015,
            blink_timeout_ms: 20_000,
            screen_time_limit_ms: 30 * 60_000,
            break_reminder_ms: 20 * 60_000,
            breathing_reminder_ms: 5 * 60_000,
            reminder_stride: default_reminder_stride(),
            zoom: ZoomConfig::default(),
        }
    }
}

impl WellnessConfig {
    /// Band around the optimal distance that counts as "excellent".
    pub const OPTIMAL_BAND_CM: f64 = 10.0;

    pub fn is_optimal(&self, distance_cm: f64) -> bool {
        distance_cm >= self.optimal_distance_cm - Self::OPTIMAL_BAND_CM
            && distance_cm <= self.optimal_distance_cm + Self::OPTIMAL_BAND_CM
    }

    pub fn is_in_range(&self, distance_cm: f64) -> bool {
        distance_cm >= self.min_distance_cm && distance_cm <= self.max_distance_cm
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomConfig {
    pub deadzone_cm: f64,
    /// 靠近时每厘米缩小量
    pub zoom_out_per_cm: f64,
    /// 远离时每厘米放大量
    pub zoom_in_per_cm: f64,
    pub smoothing: f64,
    /// Changes smaller than this are not applied.
    pub dead_band: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            deadzone_cm: 3.0,
            zoom_out_per_cm: 0.01,
            zoom_in_per_cm: 0.005,
            smoothing: 0.92,
            dead_band: 0.005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggles {
    pub notifications: bool,
    pub zoom: bool,
    pub ambient: bool,
    pub breathing: bool,
    pub wellness: bool,
    /// Display only.
    pub distance: bool,
    pub blink: bool,
    /// Display only.
    pub session: bool,
    /// Display only.
    pub posture: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            notifications: true,
            zoom: true,
            ambient: true,
            breathing: true,
            wellness: true,
            distance: true,
            blink: true,
            session: true,
            posture: true,
        }
    }
}

impl FeatureToggles {
    /// 眨眼检测同时服务于计数显示和健康评分
    pub fn needs_blink_detection(&self) -> bool {
        self.blink || self.wellness
    }

    pub fn needs_reminder_check(&self) -> bool {
        self.notifications || self.breathing
    }
}

/// Partial toggle update; missing fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleUpdate {
    pub notifications: Option<bool>,
    pub zoom: Option<bool>,
    pub ambient: Option<bool>,
    pub breathing: Option<bool>,
    pub wellness: Option<bool>,
    pub distance: Option<bool>,
    pub blink: Option<bool>,
    pub session: Option<bool>,
    pub posture: Option<bool>,
}

impl FeatureToggles {
    pub fn apply(&mut self, update: &ToggleUpdate) {
        let pairs = [
            (&mut self.notifications, update.notifications),
            (&mut self.zoom, update.zoom),
            (&mut self.ambient, update.ambient),
            (&mut self.breathing, update.breathing),
            (&mut self.wellness, update.wellness),
            (&mut self.distance, update.distance),
            (&mut self.blink, update.blink),
            (&mut self.session, update.session),
            (&mut self.posture, update.posture),
        ];
        for (slot, value) in pairs {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = WellnessConfig::default();
        assert_eq!(cfg.min_distance_cm, 35.0);
        assert_eq!(cfg.optimal_distance_cm, 55.0);
        assert_eq!(cfg.max_distance_cm, 80.0);
        assert_eq!(cfg.notification_cooldown_ms, 30_000);
        assert_eq!(cfg.screen_time_limit_ms, 1_800_000);
        assert_eq!(cfg.break_reminder_ms, 1_200_000);
        assert_eq!(cfg.breathing_reminder_ms, 300_000);
        assert_eq!(cfg.reminder_stride, 30);
    }

    #[test]
    fn optimal_band_is_inclusive() {
        let cfg = WellnessConfig::default();
        assert!(cfg.is_optimal(45.0));
        assert!(cfg.is_optimal(65.0));
        assert!(!cfg.is_optimal(65.1));
        assert!(cfg.is_in_range(35.0));
        assert!(!cfg.is_in_range(80.5));
    }

    #[test]
    fn missing_stride_uses_default() {
        let mut json = serde_json::to_value(WellnessConfig::default()).unwrap();
        json.as_object_mut().unwrap().remove("reminderStride");
        json.as_object_mut().unwrap().remove("zoom");
        let cfg: WellnessConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.reminder_stride, 30);
        assert_eq!(cfg.zoom, ZoomConfig::default());
    }

    #[test]
    fn toggle_update_is_partial() {
        let mut toggles = FeatureToggles::default();
        toggles.apply(&ToggleUpdate {
            zoom: Some(false),
            blink: Some(false),
            ..ToggleUpdate::default()
        });
        assert!(!toggles.zoom);
        assert!(!toggles.blink);
        assert!(toggles.notifications);
        assert!(toggles.needs_blink_detection());
    }
}
