//! 提醒调度模块
//!
//! 五类提醒（距离、眨眼、休息、会话、呼吸）各自按时间策略判断是否触发，
//! 通知类提醒再经过按类别的冷却闸门。"过近"与"过远"共享同一个距离冷却槽。
//! 调度器不是每帧运行，而是按显式的步长计数器节流。

use serde::Serialize;

use crate::config::{
    FeatureToggles, WellnessConfig, BREATHING_GUIDE_DISPLAY_MS, NOTIFICATION_DISPLAY_MS,
};
use crate::types::TimestampMs;

/// Inhale phase of the breathing guide.
pub const BREATHING_INHALE_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderCategory {
    Distance,
    Blink,
    Break,
    Session,
    Breathing,
}

impl ReminderCategory {
    pub const COUNT: usize = 5;

    pub const ALL: [ReminderCategory; Self::COUNT] = [
        Self::Distance,
        Self::Blink,
        Self::Break,
        Self::Session,
        Self::Breathing,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Distance => 0,
            Self::Blink => 1,
            Self::Break => 2,
            Self::Session => 3,
            Self::Breathing => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Blink => "blink",
            Self::Break => "break",
            Self::Session => "session",
            Self::Breathing => "breathing",
        }
    }
}

/// What triggered a reminder; distance has two directions sharing one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderKind {
    TooClose,
    TooFar,
    Blink,
    Break,
    Session,
    Breathing,
}

impl ReminderKind {
    pub fn category(&self) -> ReminderCategory {
        match self {
            Self::TooClose | Self::TooFar => ReminderCategory::Distance,
            Self::Blink => ReminderCategory::Blink,
            Self::Break => ReminderCategory::Break,
            Self::Session => ReminderCategory::Session,
            Self::Breathing => ReminderCategory::Breathing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderEvent {
    pub category: ReminderCategory,
    pub kind: ReminderKind,
    /// Icon identifier; the host maps it to artwork.
    pub icon: &'static str,
    pub title: &'static str,
    pub body: String,
    /// How long the host should keep the reminder on screen.
    pub display_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inhale_ms: Option<u64>,
    pub fired_at: TimestampMs,
}

impl ReminderEvent {
    fn new(kind: ReminderKind, smoothed_distance_cm: f64, now: TimestampMs) -> Self {
        let category = kind.category();
        let (title, body) = match kind {
            ReminderKind::TooClose => (
                "Distance Alert",
                format!(
                    "You're at {}cm. Move back slightly.",
                    smoothed_distance_cm.round() as i64
                ),
            ),
            ReminderKind::TooFar => (
                "Distance Alert",
                "Move closer to reduce eye strain.".to_string(),
            ),
            ReminderKind::Blink => (
                "Blink Reminder",
                "Blink regularly to keep eyes comfortable.".to_string(),
            ),
            ReminderKind::Break => (
                "Break Reminder",
                "Follow the 20-20-20 rule: Look 20 feet away for 20 seconds.".to_string(),
            ),
            ReminderKind::Session => (
                "Session Alert",
                "Take a longer break after extended screen time.".to_string(),
            ),
            ReminderKind::Breathing => (
                "Breathing Exercise",
                "Breathe in as the circle grows, then slowly breathe out.".to_string(),
            ),
        };
        let (display_ms, inhale_ms) = if kind == ReminderKind::Breathing {
            (BREATHING_GUIDE_DISPLAY_MS, Some(BREATHING_INHALE_MS))
        } else {
            (NOTIFICATION_DISPLAY_MS, None)
        };

        Self {
            category,
            kind,
            icon: category.as_str(),
            title,
            body,
            display_ms,
            inhale_ms,
            fired_at: now,
        }
    }
}

/// Fires once every `stride` ticks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrideCounter {
    stride: u32,
    count: u32,
}

impl StrideCounter {
    pub fn new(stride: u32) -> Self {
        Self {
            stride: stride.max(1),
            count: 0,
        }
    }

    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.stride {
            self.count = 0;
            true
        } else {
            false
        }
    }

    /// Changes the stride, keeping progress toward the next check.
    pub fn set_stride(&mut self, stride: u32) {
        self.stride = stride.max(1);
        if self.count >= self.stride {
            self.count = self.stride - 1;
        }
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }
}

/// Inputs the scheduler reads from the rest of the engine.
#[derive(Debug, Clone, Copy)]
pub struct ReminderInputs {
    pub smoothed_distance_cm: f64,
    pub ms_since_last_blink: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderScheduler {
    last_fired: [Option<TimestampMs>; ReminderCategory::COUNT],
    session_started_at: TimestampMs,
    break_anchor: TimestampMs,
    breathing_anchor: TimestampMs,
    stride: StrideCounter,
}

impl ReminderScheduler {
    pub fn new(started_at: TimestampMs, stride: u32) -> Self {
        Self {
            last_fired: [None; ReminderCategory::COUNT],
            session_started_at: started_at,
            break_anchor: started_at,
            breathing_anchor: started_at,
            stride: StrideCounter::new(stride),
        }
    }

    pub fn last_fired(&self, category: ReminderCategory) -> Option<TimestampMs> {
        self.last_fired[category.index()]
    }

    pub fn session_started_at(&self) -> TimestampMs {
        self.session_started_at
    }

    pub fn stride_mut(&mut self) -> &mut StrideCounter {
        &mut self.stride
    }

    /// Advances the stride counter and runs the checks when it comes due.
    pub fn on_frame(
        &mut self,
        inputs: ReminderInputs,
        config: &WellnessConfig,
        toggles: &FeatureToggles,
        now: TimestampMs,
    ) -> Vec<ReminderEvent> {
        if !self.stride.tick() {
            return Vec::new();
        }
        self.check(inputs, config, toggles, now)
    }

    /// Evaluates every category once, regardless of the stride.
    pub fn check(
        &mut self,
        inputs: ReminderInputs,
        config: &WellnessConfig,
        toggles: &FeatureToggles,
        now: TimestampMs,
    ) -> Vec<ReminderEvent> {
        let mut fired = Vec::new();
        if !toggles.needs_reminder_check() {
            return fired;
        }
        let distance = inputs.smoothed_distance_cm;

        if toggles.notifications {
            if distance < config.min_distance_cm {
                self.notify(ReminderKind::TooClose, distance, config, now, &mut fired);
            } else if distance > config.max_distance_cm {
                self.notify(ReminderKind::TooFar, distance, config, now, &mut fired);
            }

            if inputs.ms_since_last_blink > config.blink_timeout_ms {
                self.notify(ReminderKind::Blink, distance, config, now, &mut fired);
            }

            // 锚点在触发时总是重置，即使通知被冷却闸门拦下
            if now.saturating_sub(self.break_anchor) > config.break_reminder_ms {
                self.notify(ReminderKind::Break, distance, config, now, &mut fired);
                self.break_anchor = now;
            }

            if now.saturating_sub(self.session_started_at) > config.screen_time_limit_ms {
                self.notify(ReminderKind::Session, distance, config, now, &mut fired);
                self.session_started_at = now;
            }
        }

        if toggles.breathing
            && now.saturating_sub(self.breathing_anchor) > config.breathing_reminder_ms
        {
            self.breathing_anchor = now;
            self.last_fired[ReminderCategory::Breathing.index()] = Some(now);
            tracing::info!(category = "breathing", "Reminder fired");
            fired.push(ReminderEvent::new(ReminderKind::Breathing, distance, now));
        }

        fired
    }

    fn can_notify(&self, category: ReminderCategory, cooldown_ms: i64, now: TimestampMs) -> bool {
        match self.last_fired[category.index()] {
            None => true,
            Some(at) => now.saturating_sub(at) > cooldown_ms,
        }
    }

    fn notify(
        &mut self,
        kind: ReminderKind,
        distance_cm: f64,
        config: &WellnessConfig,
        now: TimestampMs,
        out: &mut Vec<ReminderEvent>,
    ) {
        let category = kind.category();
        if !self.can_notify(category, config.notification_cooldown_ms, now) {
            tracing::debug!(category = category.as_str(), "Reminder suppressed by cooldown");
            return;
        }
        self.last_fired[category.index()] = Some(now);
        tracing::info!(category = category.as_str(), kind = ?kind, "Reminder fired");
        out.push(ReminderEvent::new(kind, distance_cm, now));
    }
}
