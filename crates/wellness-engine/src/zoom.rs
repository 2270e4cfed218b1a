//! 自适应缩放模块
//!
//! 根据平滑距离计算目标缩放倍率：过近缩小、过远放大，阈值两侧各留
//! 死区避免在边界来回振荡。实际倍率缓慢逼近目标，变化小于死带时不更新。

use serde::Serialize;

use crate::config::{WellnessConfig, ZOOM_MAX, ZOOM_MIN};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomController {
    current: f64,
    target: f64,
}

impl Default for ZoomController {
    fn default() -> Self {
        Self {
            current: 1.0,
            target: 1.0,
        }
    }
}

/// Target scale for a distance; 1.0 inside the deadzone band.
pub fn target_zoom(distance_cm: f64, config: &WellnessConfig) -> f64 {
    let z = &config.zoom;
    let near_edge = config.min_distance_cm - z.deadzone_cm;
    let far_edge = config.max_distance_cm + z.deadzone_cm;

    if distance_cm < near_edge {
        (1.0 - (near_edge - distance_cm) * z.zoom_out_per_cm).max(ZOOM_MIN)
    } else if distance_cm > far_edge {
        (1.0 + (distance_cm - far_edge) * z.zoom_in_per_cm).min(ZOOM_MAX)
    } else {
        1.0
    }
}

impl ZoomController {
    /// Moves toward the target for this distance. Returns the new scale when
    /// it changed by more than the dead band.
    pub fn update(&mut self, distance_cm: f64, config: &WellnessConfig) -> Option<f64> {
        self.target = target_zoom(distance_cm, config).clamp(ZOOM_MIN, ZOOM_MAX);
        if (self.current - self.target).abs() <= config.zoom.dead_band {
            return None;
        }
        let next = self.current * config.zoom.smoothing + self.target * (1.0 - config.zoom.smoothing);
        self.current = next.clamp(ZOOM_MIN, ZOOM_MAX);
        tracing::trace!(current = self.current, target = self.target, "Zoom updated");
        Some(self.current)
    }

    /// Snaps back to 1.0. Returns `Some(1.0)` if the scale was not already 1.0.
    pub fn reset(&mut self) -> Option<f64> {
        self.target = 1.0;
        if self.current == 1.0 {
            return None;
        }
        self.current = 1.0;
        Some(1.0)
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }
}
