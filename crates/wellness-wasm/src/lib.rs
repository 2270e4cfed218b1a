//! 用眼健康引擎的 WebAssembly 绑定
//!
//! 让浏览器页面直接在本地运行引擎：页面把人脸关键点（扁平的 x,y 数组）
//! 逐帧交给 `WellnessMonitor`，拿回提醒事件、缩放变化与状态快照。

pub mod monitor;

pub use monitor::WellnessMonitor;
