//! 屏幕距离与用眼健康引擎
//!
//! 从人脸关键点估计用户与屏幕的距离，并据此派生健康信号与界面反馈。
//! 关键点检测、摄像头采集与界面渲染都在引擎之外。
//!
//! ## 模块
//! - `distance`: 针孔模型测距 + 中值滤波 + 指数平滑
//! - `blink`: 眨眼计数
//! - `wellness`: 随时间衰减的健康评分
//! - `reminders`: 带冷却的提醒调度
//! - `zoom`: 自适应缩放
//! - `status`: 姿态状态与环境调暗
//! - `settings`: 设置表单的宽松解析
//! - `engine`: 逐帧处理管线

pub mod blink;
pub mod config;
pub mod distance;
pub mod engine;
pub mod reminders;
pub mod settings;
pub mod status;
pub mod types;
pub mod wellness;
pub mod zoom;

pub use config::{FeatureToggles, ToggleUpdate, WellnessConfig};
pub use engine::{process_frame, EngineEvent, EngineState, FrameInput, FrameOutcome, StatusSnapshot, WellnessEngine};
pub use reminders::{ReminderCategory, ReminderEvent, ReminderKind};
pub use settings::{SettingsForm, SettingsView};
pub use status::PostureStatus;
pub use types::{LandmarkError, LandmarkFrame, Point, TimestampMs};
