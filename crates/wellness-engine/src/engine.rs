//! 逐帧处理管线
//!
//! 每一帧依次经过：距离估计 → 眨眼检测 → 健康评分 → （节流的）提醒调度
//! → 缩放 / 环境调暗 / 姿态状态。整个过程同步完成，时间由调用方传入。
//! 没有检测到人脸的帧不会改动任何信号状态。

use serde::Serialize;

use crate::blink::BlinkDetector;
use crate::config::{FeatureToggles, ToggleUpdate, WellnessConfig};
use crate::distance::DistanceEstimator;
use crate::reminders::{ReminderCategory, ReminderEvent, ReminderInputs, ReminderScheduler};
use crate::status::{ambient_opacity, PostureStatus};
use crate::types::{LandmarkFrame, TimestampMs};
use crate::wellness::{WellnessScorer, WellnessTier};
use crate::zoom::ZoomController;

/// Session-scoped mutable state, advanced once per frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub distance: DistanceEstimator,
    pub blink: BlinkDetector,
    pub wellness: WellnessScorer,
    pub reminders: ReminderScheduler,
    pub zoom: ZoomController,
    pub ambient_opacity: f64,
    pub posture: PostureStatus,
    pub face_present: bool,
    /// Frames that carried a face.
    pub frame_count: u64,
    /// Frames without a face.
    pub missed_frames: u64,
}

impl EngineState {
    pub fn new(started_at: TimestampMs, config: &WellnessConfig) -> Self {
        Self {
            distance: DistanceEstimator::default(),
            blink: BlinkDetector::new(started_at),
            wellness: WellnessScorer::new(started_at),
            reminders: ReminderScheduler::new(started_at, config.reminder_stride),
            zoom: ZoomController::default(),
            ambient_opacity: 0.0,
            posture: PostureStatus::NoFace,
            face_present: false,
            frame_count: 0,
            missed_frames: 0,
        }
    }
}

/// One frame handed to the engine.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// `None` when the detector found no face.
    pub landmarks: Option<&'a LandmarkFrame>,
    pub frame_width_px: f64,
    pub now: TimestampMs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    Reminder(ReminderEvent),
    #[serde(rename_all = "camelCase")]
    ZoomChanged { scale: f64 },
    #[serde(rename_all = "camelCase")]
    BlinkDetected { blink_count: u64 },
}

/// Runs one synchronous pass over `state`.
pub fn process_frame(
    state: &mut EngineState,
    input: FrameInput<'_>,
    config: &WellnessConfig,
    toggles: &FeatureToggles,
) -> Vec<EngineEvent> {
    let Some(frame) = input.landmarks else {
        state.face_present = false;
        state.posture = PostureStatus::NoFace;
        state.missed_frames += 1;
        return Vec::new();
    };

    let now = input.now;
    let mut events = Vec::new();
    state.face_present = true;
    state.frame_count += 1;

    state.distance.update(
        &frame.distance_left,
        &frame.distance_right,
        input.frame_width_px,
        config,
    );
    let distance = state.distance.smoothed_cm();

    if toggles.needs_blink_detection()
        && state.blink.update(frame.eye_opening(), config.blink_threshold, now)
    {
        events.push(EngineEvent::BlinkDetected {
            blink_count: state.blink.blink_count(),
        });
    }

    if toggles.wellness {
        state.wellness.update(
            distance,
            state.blink.ms_since_last_blink(now),
            config,
            now,
        );
    }

    let inputs = ReminderInputs {
        smoothed_distance_cm: distance,
        ms_since_last_blink: state.blink.ms_since_last_blink(now),
    };
    events.extend(
        state
            .reminders
            .on_frame(inputs, config, toggles, now)
            .into_iter()
            .map(EngineEvent::Reminder),
    );

    state.posture = PostureStatus::classify(distance, config);

    let zoom_change = if toggles.zoom {
        state.zoom.update(distance, config)
    } else {
        state.zoom.reset()
    };
    if let Some(scale) = zoom_change {
        events.push(EngineEvent::ZoomChanged { scale });
    }

    state.ambient_opacity = if toggles.ambient {
        ambient_opacity(distance, state.blink.ms_since_last_blink(now), config)
    } else {
        0.0
    };

    tracing::trace!(
        frame = state.frame_count,
        distance,
        events = events.len(),
        "Frame processed"
    );
    events
}

/// Point-in-time view for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub face_present: bool,
    /// Rounded for display; `None` while no face is visible.
    pub distance_cm: Option<i64>,
    pub smoothed_distance_cm: f64,
    pub raw_distance_cm: f64,
    pub blink_count: u64,
    pub posture: PostureStatus,
    pub wellness_score: u8,
    pub wellness_tier: WellnessTier,
    pub distance_score: f64,
    pub blink_score: f64,
    pub session_minutes: i64,
    pub zoom: f64,
    pub ambient_opacity: f64,
    pub frame_count: u64,
    pub last_reminders: Vec<LastReminder>,
    pub toggles: FeatureToggles,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastReminder {
    pub category: ReminderCategory,
    pub fired_at: TimestampMs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOutcome {
    pub events: Vec<EngineEvent>,
    pub status: StatusSnapshot,
}

/// Engine for one monitoring session: config, toggles and state together.
#[derive(Debug, Clone)]
pub struct WellnessEngine {
    config: WellnessConfig,
    pending_config: Option<WellnessConfig>,
    toggles: FeatureToggles,
    state: EngineState,
}

impl WellnessEngine {
    pub fn new(config: WellnessConfig, toggles: FeatureToggles, started_at: TimestampMs) -> Self {
        let state = EngineState::new(started_at, &config);
        Self {
            config,
            pending_config: None,
            toggles,
            state,
        }
    }

    /// Queues a new config; it takes effect at the start of the next frame.
    pub fn reconfigure(&mut self, config: WellnessConfig) {
        self.pending_config = Some(config);
    }

    /// The config that the next frame will run with.
    pub fn effective_config(&self) -> &WellnessConfig {
        self.pending_config.as_ref().unwrap_or(&self.config)
    }

    pub fn config(&self) -> &WellnessConfig {
        &self.config
    }

    pub fn toggles(&self) -> &FeatureToggles {
        &self.toggles
    }

    pub fn update_toggles(&mut self, update: &ToggleUpdate) -> &FeatureToggles {
        self.toggles.apply(update);
        &self.toggles
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn process_frame(
        &mut self,
        landmarks: Option<&LandmarkFrame>,
        frame_width_px: f64,
        now: TimestampMs,
    ) -> FrameOutcome {
        if let Some(config) = self.pending_config.take() {
            self.state
                .reminders
                .stride_mut()
                .set_stride(config.reminder_stride);
            tracing::debug!("Applied pending wellness config");
            self.config = config;
        }

        let events = process_frame(
            &mut self.state,
            FrameInput {
                landmarks,
                frame_width_px,
                now,
            },
            &self.config,
            &self.toggles,
        );

        FrameOutcome {
            events,
            status: self.snapshot(now),
        }
    }

    pub fn snapshot(&self, now: TimestampMs) -> StatusSnapshot {
        let s = &self.state;
        let smoothed = s.distance.smoothed_cm();
        let session_ms = now.saturating_sub(s.reminders.session_started_at()).max(0);
        let last_reminders = ReminderCategory::ALL
            .iter()
            .filter_map(|c| {
                s.reminders.last_fired(*c).map(|fired_at| LastReminder {
                    category: *c,
                    fired_at,
                })
            })
            .collect();

        StatusSnapshot {
            face_present: s.face_present,
            distance_cm: s.face_present.then(|| smoothed.round() as i64),
            smoothed_distance_cm: smoothed,
            raw_distance_cm: s.distance.raw_cm(),
            blink_count: s.blink.blink_count(),
            posture: s.posture,
            wellness_score: s.wellness.wellness_score(),
            wellness_tier: s.wellness.tier(),
            distance_score: s.wellness.distance_score(),
            blink_score: s.wellness.blink_score(),
            session_minutes: session_ms / 60_000,
            zoom: s.zoom.current(),
            ambient_opacity: s.ambient_opacity,
            frame_count: s.frame_count,
            last_reminders,
            toggles: self.toggles.clone(),
        }
    }
}
