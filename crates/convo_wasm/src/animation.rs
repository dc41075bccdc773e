//! Stepped convolution animation runner for the browser renderer.

use crate::js_error;
use anyhow::{Context, Result};
use convo_core::animation::ConvolutionAnimation;
use convo_core::equation_engine::{compile_signal, ExpressionSignal};
use convo_core::settings::AnimationSettings;
use js_sys::Float64Array;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

type ExpressionAnimation = ConvolutionAnimation<ExpressionSignal, ExpressionSignal>;

/// Compiles both signal expressions in `t` and builds the animation.
pub(crate) fn build_animation(
    f1_expr: &str,
    f2_expr: &str,
    param_names: &[String],
    params: &[f64],
    settings: &AnimationSettings,
) -> Result<ExpressionAnimation> {
    let f1 = compile_signal(f1_expr, "t", param_names, params)
        .with_context(|| format!("Failed to compile f1 = {f1_expr}"))?;
    let f2 = compile_signal(f2_expr, "t", param_names, params)
        .with_context(|| format!("Failed to compile f2 = {f2_expr}"))?;
    let animation =
        ConvolutionAnimation::new(f1, f2, settings).context("Invalid animation settings")?;
    Ok(animation)
}

/// Sets parameter `index` on both signals; they share one parameter list.
pub(crate) fn set_shared_param(
    animation: &mut ExpressionAnimation,
    index: usize,
    value: f64,
) -> Result<()> {
    let (f1, f2) = animation.signals_mut();
    f1.set_param(index, value).context("f1")?;
    f2.set_param(index, value).context("f2")?;
    Ok(())
}

pub(crate) fn settings_from_js(settings: JsValue) -> Result<AnimationSettings, JsValue> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(AnimationSettings::default());
    }
    from_value(settings).map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))
}

/// Progress payload for `next_frame`.
#[derive(Serialize)]
struct FrameProgress<T: Serialize> {
    done: bool,
    index: usize,
    frame_count: usize,
    frame: T,
}

#[wasm_bindgen]
pub struct WasmConvolutionAnimation {
    animation: ExpressionAnimation,
    cursor: usize,
}

#[wasm_bindgen]
impl WasmConvolutionAnimation {
    #[wasm_bindgen(constructor)]
    pub fn new(
        f1_expr: &str,
        f2_expr: &str,
        param_names: Vec<String>,
        params: Vec<f64>,
        settings: JsValue,
    ) -> Result<WasmConvolutionAnimation, JsValue> {
        console_error_panic_hook::set_once();

        let settings = settings_from_js(settings)?;
        let animation =
            build_animation(f1_expr, f2_expr, &param_names, &params, &settings).map_err(js_error)?;

        Ok(WasmConvolutionAnimation {
            animation,
            cursor: 0,
        })
    }

    pub fn frame_count(&self) -> u32 {
        self.animation.len() as u32
    }

    pub fn frame_interval_ms(&self) -> u32 {
        self.animation.frame_interval().as_millis() as u32
    }

    pub fn times(&self) -> Float64Array {
        Float64Array::from(self.animation.grid().as_slice())
    }

    pub fn shifts(&self) -> Float64Array {
        let shifts: Vec<f64> = self.animation.schedule().iter().collect();
        Float64Array::from(shifts.as_slice())
    }

    pub fn view_limits(&self) -> Result<JsValue, JsValue> {
        to_value(self.animation.view())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn frame(&self, index: u32) -> Result<JsValue, JsValue> {
        let frame = self
            .animation
            .frame(index as usize)
            .map_err(|e| JsValue::from_str(&format!("Frame {} failed: {}", index, e)))?;
        to_value(&frame).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn frame_at(&self, t0: f64) -> Result<JsValue, JsValue> {
        let frame = self
            .animation
            .frame_at(t0)
            .map_err(|e| JsValue::from_str(&format!("Frame at t0 = {} failed: {}", t0, e)))?;
        to_value(&frame).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Retunes a named-parameter slot; frames computed afterwards use the new value.
    pub fn set_param(&mut self, index: u32, value: f64) -> Result<(), JsValue> {
        set_shared_param(&mut self.animation, index as usize, value).map_err(js_error)
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.animation.len()
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Computes the frame under the cursor and advances it, even when the frame fails.
    pub fn next_frame(&mut self) -> Result<JsValue, JsValue> {
        if self.is_done() {
            return Err(JsValue::from_str("Animation finished; call reset() to replay"));
        }
        let index = self.cursor;
        self.cursor += 1;

        let frame = self
            .animation
            .frame(index)
            .map_err(|e| JsValue::from_str(&format!("Frame {} failed: {}", index, e)))?;
        let progress = FrameProgress {
            done: self.is_done(),
            index,
            frame_count: self.animation.len(),
            frame,
        };
        to_value(&progress).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::{build_animation, set_shared_param};
    use convo_core::settings::AnimationSettings;

    #[test]
    fn build_animation_compiles_demo_signals() {
        let settings = AnimationSettings {
            sampling_frequency: 10.0,
            ..AnimationSettings::default()
        };
        let animation = build_animation(
            "max(0, 1 - abs(t))",
            "(t > 0) * exp(-k*t)",
            &["k".to_string()],
            &[3.0],
            &settings,
        )
        .expect("animation");
        assert_eq!(animation.len(), 80);
        let frame = animation.frame(0).expect("frame");
        assert_eq!(frame.t0, -2.0);
        assert!(frame.value0.abs() < 1e-12);
    }

    #[test]
    fn build_animation_names_the_failing_signal() {
        let err = build_animation("t", "nope(t)", &[], &[], &AnimationSettings::default())
            .err()
            .expect("should fail");
        let message = format!("{err:#}");
        assert!(message.contains("f2"), "unexpected error: {message}");
        assert!(message.contains("Unknown function"), "unexpected error: {message}");
    }

    #[test]
    fn build_animation_rejects_degenerate_view() {
        let mut settings = AnimationSettings::default();
        settings.view.convolution_y.min = -3.0;
        settings.view.convolution_y.max = -3.0;
        let err = build_animation("t", "t", &[], &[], &settings)
            .err()
            .expect("should fail");
        assert!(format!("{err:#}").contains("convolution y"));
    }

    #[test]
    fn shared_param_reaches_both_signals() {
        let settings = AnimationSettings {
            sampling_frequency: 10.0,
            ..AnimationSettings::default()
        };
        let mut animation = build_animation(
            "a * max(0, 1 - abs(t))",
            "(t > 0) * exp(-a*t)",
            &["a".to_string()],
            &[1.0],
            &settings,
        )
        .expect("animation");
        set_shared_param(&mut animation, 0, 3.0).expect("param");
        let (f1, f2) = animation.signals_mut();
        assert_eq!(f1.params(), &[3.0]);
        assert_eq!(f2.params(), &[3.0]);
        assert!(set_shared_param(&mut animation, 1, 3.0).is_err());
    }
}
