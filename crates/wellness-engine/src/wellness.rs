//! 健康评分模块
//!
//! 距离达标与眨眼规律两个维度各自维护指数衰减分数，再取平均得到综合分。
//! 衰减系数按真实经过时间计算（α = Δt / 30s），与帧率无关。

use serde::Serialize;

use crate::config::WellnessConfig;
use crate::types::TimestampMs;

/// Time constant of the rolling scores.
pub const SCORE_TIME_CONSTANT_MS: f64 = 30_000.0;

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WellnessTier {
    High,
    Fair,
    Low,
}

impl WellnessTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 80 => Self::High,
            s if s >= 60 => Self::Fair,
            _ => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Fair => "fair",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessScorer {
    distance_score: f64,
    blink_score: f64,
    wellness_score: u8,
    last_update_at: TimestampMs,
}

fn blend(score: f64, indicator: f64, alpha: f64) -> f64 {
    (score * (1.0 - alpha) + indicator * alpha).clamp(SCORE_MIN, SCORE_MAX)
}

fn indicator(good: bool) -> f64 {
    if good {
        SCORE_MAX
    } else {
        SCORE_MIN
    }
}

impl WellnessScorer {
    pub fn new(started_at: TimestampMs) -> Self {
        Self {
            distance_score: 100.0,
            blink_score: 100.0,
            wellness_score: 85,
            last_update_at: started_at,
        }
    }

    /// Blends the current frame's indicators into the rolling scores.
    pub fn update(
        &mut self,
        smoothed_distance_cm: f64,
        ms_since_last_blink: i64,
        config: &WellnessConfig,
        now: TimestampMs,
    ) -> u8 {
        let elapsed_ms = now.saturating_sub(self.last_update_at).max(0) as f64;
        self.last_update_at = now;
        // Δt 超过时间常数时直接收敛到指示值，不允许越界
        let alpha = (elapsed_ms / SCORE_TIME_CONSTANT_MS).clamp(0.0, 1.0);

        let distance_ok = config.is_optimal(smoothed_distance_cm);
        let blinking_ok = ms_since_last_blink < config.blink_timeout_ms;

        self.distance_score = blend(self.distance_score, indicator(distance_ok), alpha);
        self.blink_score = blend(self.blink_score, indicator(blinking_ok), alpha);
        self.wellness_score = ((self.distance_score + self.blink_score) / 2.0)
            .round()
            .clamp(SCORE_MIN, SCORE_MAX) as u8;
        self.wellness_score
    }

    pub fn distance_score(&self) -> f64 {
        self.distance_score
    }

    pub fn blink_score(&self) -> f64 {
        self.blink_score
    }

    pub fn wellness_score(&self) -> u8 {
        self.wellness_score
    }

    pub fn tier(&self) -> WellnessTier {
        WellnessTier::from_score(self.wellness_score)
    }
}
