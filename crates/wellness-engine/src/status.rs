use serde::Serialize;

use crate::config::WellnessConfig;

/// Seconds without a blink before the ambient overlay dims.
pub const AMBIENT_BLINK_GAP_MS: i64 = 15_000;

/// Overlay opacity while any ambient condition holds.
pub const AMBIENT_DIM_OPACITY: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostureStatus {
    Excellent,
    Good,
    Adjust,
    #[serde(rename = "No Face")]
    NoFace,
}

impl PostureStatus {
    /// Classifies the displayed (rounded) distance.
    pub fn classify(smoothed_distance_cm: f64, config: &WellnessConfig) -> Self {
        let shown = smoothed_distance_cm.round();
        if config.is_optimal(shown) {
            Self::Excellent
        } else if config.is_in_range(shown) {
            Self::Good
        } else {
            Self::Adjust
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Adjust => "Adjust",
            Self::NoFace => "No Face",
        }
    }
}

/// 环境调暗：距离越界或长时间未眨眼时轻微压暗屏幕
pub fn ambient_opacity(smoothed_distance_cm: f64, ms_since_last_blink: i64, config: &WellnessConfig) -> f64 {
    let out_of_range = !config.is_in_range(smoothed_distance_cm);
    if out_of_range || ms_since_last_blink > AMBIENT_BLINK_GAP_MS {
        AMBIENT_DIM_OPACITY
    } else {
        0.0
    }
}
