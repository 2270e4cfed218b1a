//! 眨眼检测模块
//!
//! 用二值眼睛状态做去抖：开合高度低于阈值视为闭眼，
//! 只有在"闭眼 → 睁眼"转换时才计数一次，持续闭眼不会重复计数。

use serde::Serialize;

use crate::types::TimestampMs;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkDetector {
    blink_count: u64,
    last_blink_at: TimestampMs,
    eye_open: bool,
}

impl BlinkDetector {
    /// `started_at` seeds the last-blink time so the timeout counts from session start.
    pub fn new(started_at: TimestampMs) -> Self {
        Self {
            blink_count: 0,
            last_blink_at: started_at,
            eye_open: true,
        }
    }

    /// Feeds one eye-opening sample. Returns `true` when a blink completed on this sample.
    pub fn update(&mut self, eye_opening: f64, threshold: f64, now: TimestampMs) -> bool {
        // NaN 视为睁眼，避免凭空产生闭眼状态
        let closed = eye_opening < threshold;
        let completed = !closed && !self.eye_open;
        if completed {
            self.blink_count += 1;
            self.last_blink_at = now;
            tracing::trace!(count = self.blink_count, "Blink detected");
        }
        self.eye_open = !closed;
        completed
    }

    pub fn blink_count(&self) -> u64 {
        self.blink_count
    }

    pub fn last_blink_at(&self) -> TimestampMs {
        self.last_blink_at
    }

    pub fn is_eye_open(&self) -> bool {
        self.eye_open
    }

    pub fn ms_since_last_blink(&self, now: TimestampMs) -> i64 {
        now.saturating_sub(self.last_blink_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.015;

    #[test]
    fn counts_once_on_reopen() {
        let mut det = BlinkDetector::new(0);
        let heights = [0.02, 0.01, 0.01, 0.02];
        let completed: Vec<bool> = heights
            .iter()
            .enumerate()
            .map(|(i, h)| det.update(*h, THRESHOLD, i as i64 * 33))
            .collect();

        assert_eq!(completed, vec![false, false, false, true]);
        assert_eq!(det.blink_count(), 1);
        assert_eq!(det.last_blink_at(), 99);
    }

    #[test]
    fn long_closure_counts_once() {
        let mut det = BlinkDetector::new(0);
        for t in 0..100 {
            det.update(0.001, THRESHOLD, t);
        }
        assert_eq!(det.blink_count(), 0);
        assert!(!det.is_eye_open());
        det.update(0.03, THRESHOLD, 100);
        assert_eq!(det.blink_count(), 1);
    }

    #[test]
    fn closing_does_not_count() {
        let mut det = BlinkDetector::new(0);
        assert!(!det.update(0.001, THRESHOLD, 10));
        assert_eq!(det.blink_count(), 0);
        assert_eq!(det.last_blink_at(), 0);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut det = BlinkDetector::new(0);
        det.update(THRESHOLD, THRESHOLD, 1);
        assert!(det.is_eye_open());
    }

    #[test]
    fn since_last_blink_tracks_start() {
        let det = BlinkDetector::new(1_000);
        assert_eq!(det.ms_since_last_blink(21_500), 20_500);
    }
}
