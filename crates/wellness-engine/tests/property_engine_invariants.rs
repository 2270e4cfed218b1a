use proptest::prelude::*;

use wellness_engine::config::{WellnessConfig, ZOOM_MAX, ZOOM_MIN};
use wellness_engine::distance::DistanceEstimator;
use wellness_engine::reminders::{ReminderInputs, ReminderScheduler};
use wellness_engine::types::{LandmarkFrame, Point};
use wellness_engine::wellness::WellnessScorer;
use wellness_engine::zoom::{target_zoom, ZoomController};
use wellness_engine::{FeatureToggles, WellnessEngine};

fn frame_from(baseline: f64, eye: f64) -> LandmarkFrame {
    LandmarkFrame {
        distance_left: Point::new(0.5 - baseline / 2.0, 0.5),
        distance_right: Point::new(0.5 + baseline / 2.0, 0.5),
        left_upper_lid: Point::new(0.4, 0.4),
        left_lower_lid: Point::new(0.4, 0.4 + eye),
        right_upper_lid: Point::new(0.6, 0.4),
        right_lower_lid: Point::new(0.6, 0.4 + eye),
    }
}

proptest! {
    #[test]
    fn pt_single_outlier_does_not_move_median(
        steady in 20.0_f64..120.0,
        outlier in 0.1_f64..1000.0,
        position in 0_usize..10,
    ) {
        let mut est = DistanceEstimator::starting_at(steady);
        for _ in 0..10 {
            est.push_estimate(steady, 0.8);
        }
        // 离群点在一次完整的缓冲轮转内进出
        for i in 0..10 {
            let v = if i == position { outlier } else { steady };
            est.push_estimate(v, 0.8);
        }
        prop_assert!((est.filtered_cm().unwrap() - steady).abs() < 1e-9);
        prop_assert!((est.smoothed_cm() - steady).abs() < 1e-9);
    }

    #[test]
    fn pt_smoothing_converges_without_overshoot(
        start in 20.0_f64..120.0,
        target in 20.0_f64..120.0,
    ) {
        let mut est = DistanceEstimator::starting_at(start);
        let mut prev_gap = (start - target).abs();
        for _ in 0..200 {
            let s = est.push_estimate(target, 0.8);
            let gap = (s - target).abs();
            prop_assert!(gap <= prev_gap + 1e-9);
            if start <= target {
                prop_assert!(s <= target + 1e-9);
            } else {
                prop_assert!(s >= target - 1e-9);
            }
            prev_gap = gap;
        }
        prop_assert!(prev_gap < 1e-6);
    }

    #[test]
    fn pt_history_never_exceeds_capacity(values in proptest::collection::vec(0.1_f64..500.0, 0..100)) {
        let mut est = DistanceEstimator::default();
        for v in values {
            est.push_estimate(v, 0.8);
            prop_assert!(est.history().len() <= 10);
            prop_assert!(est.smoothed_cm() > 0.0);
        }
    }

    #[test]
    fn pt_scores_stay_in_range(
        samples in proptest::collection::vec((0.0_f64..200.0, 0_i64..120_000, 0_i64..120_000), 1..200),
    ) {
        let cfg = WellnessConfig::default();
        let mut scorer = WellnessScorer::new(0);
        let mut now = 0;
        for (distance, since_blink, step) in samples {
            now += step;
            let score = scorer.update(distance, since_blink, &cfg, now);
            prop_assert!(score <= 100);
            prop_assert!((0.0..=100.0).contains(&scorer.distance_score()));
            prop_assert!((0.0..=100.0).contains(&scorer.blink_score()));
        }
    }

    #[test]
    fn pt_zoom_stays_in_bounds(distances in proptest::collection::vec(0.0_f64..400.0, 1..300)) {
        let cfg = WellnessConfig::default();
        let mut zoom = ZoomController::default();
        for d in distances {
            prop_assert!((ZOOM_MIN..=ZOOM_MAX).contains(&target_zoom(d, &cfg)));
            if let Some(scale) = zoom.update(d, &cfg) {
                prop_assert!((ZOOM_MIN..=ZOOM_MAX).contains(&scale));
            }
            prop_assert!((ZOOM_MIN..=ZOOM_MAX).contains(&zoom.current()));
        }
    }

    #[test]
    fn pt_cooldown_allows_one_notification(
        first in 0_i64..1_000_000,
        gap in 0_i64..=30_000,
    ) {
        let cfg = WellnessConfig::default();
        let toggles = FeatureToggles { breathing: false, ..FeatureToggles::default() };
        let mut s = ReminderScheduler::new(first, 1);
        let inputs = ReminderInputs { smoothed_distance_cm: 20.0, ms_since_last_blink: 0 };
        let a = s.check(inputs, &cfg, &toggles, first);
        let b = s.check(inputs, &cfg, &toggles, first + gap);
        prop_assert_eq!(a.len(), 1);
        prop_assert!(b.is_empty());
    }

    #[test]
    fn pt_blink_count_matches_closed_runs(runs in proptest::collection::vec(1_usize..20, 1..20)) {
        let mut engine = WellnessEngine::new(WellnessConfig::default(), FeatureToggles::default(), 0);
        let baseline = 6.3 * 600.0 / 55.0 / 640.0;
        let mut now = 0;
        for closed_len in &runs {
            for _ in 0..*closed_len {
                now += 33;
                engine.process_frame(Some(&frame_from(baseline, 0.005)), 640.0, now);
            }
            now += 33;
            engine.process_frame(Some(&frame_from(baseline, 0.03)), 640.0, now);
        }
        prop_assert_eq!(engine.state().blink.blink_count(), runs.len() as u64);
    }
}
