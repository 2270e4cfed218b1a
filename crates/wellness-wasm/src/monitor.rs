use wasm_bindgen::prelude::*;

use wellness_engine::config::{FeatureToggles, ToggleUpdate, WellnessConfig};
use wellness_engine::settings::{SettingsForm, SettingsView};
use wellness_engine::types::{LandmarkFrame, TimestampMs};
use wellness_engine::WellnessEngine;

/// JS 时间戳（毫秒，浮点）转为引擎时间戳；非法值按 0 处理
fn to_timestamp(now_ms: f64) -> TimestampMs {
    if now_ms.is_finite() {
        now_ms.round() as TimestampMs
    } else {
        0
    }
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

/// 浏览器端监测器，包装单个会话的引擎
#[wasm_bindgen]
pub struct WellnessMonitor {
    engine: WellnessEngine,
}

#[wasm_bindgen]
impl WellnessMonitor {
    #[wasm_bindgen(constructor)]
    pub fn new(now_ms: f64) -> Self {
        Self {
            engine: WellnessEngine::new(
                WellnessConfig::default(),
                FeatureToggles::default(),
                to_timestamp(now_ms),
            ),
        }
    }

    /// 用设置面板的原始值创建监测器，非法字段回退到默认值
    #[wasm_bindgen(js_name = "withSettings")]
    pub fn with_settings(settings: JsValue, now_ms: f64) -> Result<WellnessMonitor, JsError> {
        let form: SettingsForm = serde_wasm_bindgen::from_value(settings)?;
        let applied = form.apply_to(&WellnessConfig::default());
        Ok(Self {
            engine: WellnessEngine::new(
                applied.config,
                FeatureToggles::default(),
                to_timestamp(now_ms),
            ),
        })
    }

    /// 处理一帧完整的人脸网格
    ///
    /// # 参数
    /// - `landmarks`: 归一化坐标，按 x0, y0, x1, y1, ... 排列
    /// - `frame_width`: 画面宽度（像素）
    /// - `now_ms`: 当前时间戳（毫秒）
    ///
    /// # 返回
    /// 序列化为 JsValue 的 FrameOutcome
    #[wasm_bindgen(js_name = "processFrame")]
    pub fn process_frame(
        &mut self,
        landmarks: &[f64],
        frame_width: f64,
        now_ms: f64,
    ) -> Result<JsValue, JsError> {
        let frame = LandmarkFrame::from_flat_mesh(landmarks)?;
        let outcome = self
            .engine
            .process_frame(Some(&frame), frame_width, to_timestamp(now_ms));
        Ok(to_js(&outcome))
    }

    /// 本帧未检测到人脸
    #[wasm_bindgen(js_name = "processNoFace")]
    pub fn process_no_face(&mut self, now_ms: f64) -> JsValue {
        let outcome = self.engine.process_frame(None, 0.0, to_timestamp(now_ms));
        to_js(&outcome)
    }

    /// 应用新的设置，下一帧生效；返回被回退的字段列表
    #[wasm_bindgen(js_name = "applySettings")]
    pub fn apply_settings(&mut self, settings: JsValue) -> Result<JsValue, JsError> {
        let form: SettingsForm = serde_wasm_bindgen::from_value(settings)?;
        let applied = form.apply_to(self.engine.effective_config());
        self.engine.reconfigure(applied.config);
        Ok(to_js(&applied.fallbacks))
    }

    #[wasm_bindgen(js_name = "getSettings")]
    pub fn get_settings(&self) -> JsValue {
        to_js(&SettingsView::from(self.engine.effective_config()))
    }

    #[wasm_bindgen(js_name = "setToggles")]
    pub fn set_toggles(&mut self, toggles: JsValue) -> Result<JsValue, JsError> {
        let update: ToggleUpdate = serde_wasm_bindgen::from_value(toggles)?;
        Ok(to_js(self.engine.update_toggles(&update)))
    }

    pub fn snapshot(&self, now_ms: f64) -> JsValue {
        to_js(&self.engine.snapshot(to_timestamp(now_ms)))
    }

    #[wasm_bindgen(js_name = "getBlinkCount")]
    pub fn get_blink_count(&self) -> f64 {
        self.engine.state().blink.blink_count() as f64
    }

    #[wasm_bindgen(js_name = "getZoom")]
    pub fn get_zoom(&self) -> f64 {
        self.engine.state().zoom.current()
    }

    /// 重新开始会话，保留当前设置与开关
    pub fn reset(&mut self, now_ms: f64) {
        self.engine = WellnessEngine::new(
            self.engine.effective_config().clone(),
            self.engine.toggles().clone(),
            to_timestamp(now_ms),
        );
    }
}
