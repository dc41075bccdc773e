//! Transfer-function modulus surfaces and the complex exponential helix.

use crate::js_error;
use anyhow::{anyhow, bail, Context, Result};
use convo_core::exponential::{sample_helix, sweep_time};
use convo_core::settings::{ExponentialSettings, SurfaceSettings};
use convo_core::surface::{sample_modulus, ModulusPreset, TransferFunction};
use num_complex::Complex64;
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Plain-object surface payload; `heights` is row-major over `re_axis` × `im_axis`.
#[derive(Serialize)]
struct SurfacePayload {
    title: Option<&'static str>,
    re_axis: Vec<f64>,
    im_axis: Vec<f64>,
    heights: Vec<f64>,
}

/// Resolves a preset by its serialized (snake_case) name.
pub(crate) fn parse_preset(name: &str) -> Result<ModulusPreset> {
    let deserializer: StrDeserializer<'_, ValueError> = name.into_deserializer();
    ModulusPreset::deserialize(deserializer)
        .map_err(|_| anyhow!("Unknown modulus preset: {name}"))
}

fn roots(kind: &str, re: &[f64], im: &[f64]) -> Result<Vec<Complex64>> {
    if re.len() != im.len() {
        bail!(
            "{kind}: {} real parts for {} imaginary parts",
            re.len(),
            im.len()
        );
    }
    Ok(re
        .iter()
        .zip(im)
        .map(|(&r, &i)| Complex64::new(r, i))
        .collect())
}

pub(crate) fn build_transfer_function(
    gain: f64,
    zeros_re: &[f64],
    zeros_im: &[f64],
    poles_re: &[f64],
    poles_im: &[f64],
) -> Result<TransferFunction> {
    if !gain.is_finite() {
        bail!("Gain must be finite.");
    }
    let zeros = roots("zeros", zeros_re, zeros_im)?;
    let poles = roots("poles", poles_re, poles_im)?;
    Ok(TransferFunction::new(gain, zeros, poles))
}

fn surface_to_js(
    tf: &TransferFunction,
    settings: &SurfaceSettings,
    title: Option<&'static str>,
) -> Result<JsValue, JsValue> {
    let surface = sample_modulus(tf, settings)
        .context("Failed to sample |H(s)|")
        .map_err(js_error)?;
    let mesh = surface.to_mesh();
    let payload = SurfacePayload {
        title,
        re_axis: mesh.re_axis,
        im_axis: mesh.im_axis,
        heights: mesh.heights,
    };
    to_value(&payload).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// `|H(s)|` for one of the named scenes, over that scene's window.
#[wasm_bindgen]
pub fn modulus_surface_preset(
    preset: &str,
    resolution: u32,
    height_limit: Option<f64>,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let preset = parse_preset(preset).map_err(js_error)?;
    let mut settings = preset.settings();
    if resolution > 0 {
        settings.resolution = resolution as usize;
    }
    settings.height_limit = height_limit;
    surface_to_js(&preset.transfer_function(), &settings, Some(preset.title()))
}

/// `|H(s)|` for an arbitrary gain/zeros/poles model.
#[wasm_bindgen]
pub fn modulus_surface(
    gain: f64,
    zeros_re: Vec<f64>,
    zeros_im: Vec<f64>,
    poles_re: Vec<f64>,
    poles_im: Vec<f64>,
    settings: JsValue,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let tf = build_transfer_function(gain, &zeros_re, &zeros_im, &poles_re, &poles_im)
        .map_err(js_error)?;
    let settings: SurfaceSettings = if settings.is_undefined() || settings.is_null() {
        SurfaceSettings::default()
    } else {
        from_value(settings).map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))?
    };
    surface_to_js(&tf, &settings, None)
}

fn exponential_settings(settings: JsValue) -> Result<ExponentialSettings, JsValue> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(ExponentialSettings::default());
    }
    from_value(settings).map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))
}

/// Points `(t, Re, Im)` of `exp((alpha + i theta) t)`.
#[wasm_bindgen]
pub fn complex_exponential_helix(settings: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let settings = exponential_settings(settings)?;
    let points = sample_helix(&settings)
        .context("Failed to sample the complex exponential")
        .map_err(js_error)?;
    to_value(&points).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Tracer time for a linear sweep at `progress` in `[0, 1]`.
#[wasm_bindgen]
pub fn complex_exponential_sweep(settings: JsValue, progress: f64) -> Result<f64, JsValue> {
    let settings = exponential_settings(settings)?;
    sweep_time(&settings, progress)
        .context("Failed to place the sweep tracer")
        .map_err(js_error)
}

#[cfg(test)]
mod tests {
    use super::{build_transfer_function, parse_preset};
    use convo_core::surface::ModulusPreset;
    use num_complex::Complex64;

    #[test]
    fn presets_parse_by_snake_case_name() {
        for preset in ModulusPreset::ALL {
            let name = serde_json::to_value(preset).expect("json");
            let name = name.as_str().expect("string tag");
            assert_eq!(parse_preset(name).expect("preset"), preset);
        }
        assert_eq!(
            parse_preset("complex_conjugate_poles").expect("preset"),
            ModulusPreset::ComplexConjugatePoles
        );
        assert!(parse_preset("mystery").is_err());
        assert!(parse_preset("RealZero").is_err());
    }

    #[test]
    fn transfer_function_from_split_parts() {
        let tf = build_transfer_function(2.0, &[1.0], &[0.5], &[], &[]).expect("tf");
        assert_eq!(tf.zeros, vec![Complex64::new(1.0, 0.5)]);
        assert!(tf.poles.is_empty());
        assert!(build_transfer_function(1.0, &[1.0], &[], &[], &[]).is_err());
        assert!(build_transfer_function(f64::NAN, &[], &[], &[], &[]).is_err());
    }
}
