//! 距离估计模块
//!
//! 针孔相机模型：distance = (平均瞳距 × 焦距) / 像素距离。
//! 原始估计先经过长度为 10 的中值滤波去除离群点，再做指数平滑。

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::{WellnessConfig, DISTANCE_HISTORY_LEN, MIN_PIXEL_DISTANCE, MIN_STABLE_DISTANCE_CM};
use crate::types::Point;

/// Starting estimate before the first face is seen.
pub const INITIAL_DISTANCE_CM: f64 = 60.0;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceEstimator {
    raw_cm: f64,
    smoothed_cm: f64,
    history: VecDeque<f64>,
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self {
            raw_cm: INITIAL_DISTANCE_CM,
            smoothed_cm: INITIAL_DISTANCE_CM,
            history: VecDeque::with_capacity(DISTANCE_HISTORY_LEN),
        }
    }
}

/// Physical distance for a pixel baseline, or `None` when the baseline is degenerate.
pub fn pinhole_distance(pixel_distance: f64, config: &WellnessConfig) -> Option<f64> {
    if !pixel_distance.is_finite() || pixel_distance < MIN_PIXEL_DISTANCE {
        return None;
    }
    let cm = config.avg_pupil_distance_cm * config.focal_length_px / pixel_distance;
    cm.is_finite().then_some(cm)
}

/// Median of the values; mean of the two middle values for even lengths.
pub fn median(values: &VecDeque<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn smooth(new_value: f64, old_value: f64, factor: f64) -> f64 {
    old_value * factor + new_value * (1.0 - factor)
}

impl DistanceEstimator {
    /// Seeds the estimator at a known distance with an empty history.
    pub fn starting_at(distance_cm: f64) -> Self {
        Self {
            raw_cm: distance_cm,
            smoothed_cm: distance_cm.max(MIN_STABLE_DISTANCE_CM),
            history: VecDeque::with_capacity(DISTANCE_HISTORY_LEN),
        }
    }

    /// Updates from the two baseline points (normalized coordinates).
    ///
    /// Returns the new smoothed distance, or `None` when the frame was skipped
    /// because the baseline collapsed.
    pub fn update(
        &mut self,
        left: &Point,
        right: &Point,
        frame_width_px: f64,
        config: &WellnessConfig,
    ) -> Option<f64> {
        if !left.is_finite() || !right.is_finite() || !frame_width_px.is_finite() {
            tracing::debug!("Non-finite landmark input, skipping distance update");
            return None;
        }
        let pixel_distance = left.distance_to(right) * frame_width_px;
        let Some(raw) = pinhole_distance(pixel_distance, config) else {
            tracing::debug!(pixel_distance, "Degenerate distance baseline, skipping");
            return None;
        };
        Some(self.push_estimate(raw, config.distance_smoothing))
    }

    /// Feeds one raw estimate through the median filter and the smoother.
    pub fn push_estimate(&mut self, raw_cm: f64, smoothing: f64) -> f64 {
        self.raw_cm = raw_cm;
        self.history.push_back(raw_cm);
        while self.history.len() > DISTANCE_HISTORY_LEN {
            self.history.pop_front();
        }

        let filtered = median(&self.history).unwrap_or(raw_cm);
        let next = smooth(filtered, self.smoothed_cm, smoothing);
        if next.is_finite() {
            self.smoothed_cm = next.max(MIN_STABLE_DISTANCE_CM);
        }
        self.smoothed_cm
    }

    pub fn raw_cm(&self) -> f64 {
        self.raw_cm
    }

    pub fn smoothed_cm(&self) -> f64 {
        self.smoothed_cm
    }

    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    pub fn filtered_cm(&self) -> Option<f64> {
        median(&self.history)
    }
}
