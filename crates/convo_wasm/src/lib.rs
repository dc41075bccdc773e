//! WASM bindings exposing the convo numerical core to a browser renderer.
//!
//! The renderer draws; this crate compiles signal expressions, computes
//! frames and geometry, and hands them over as plain JS objects.

use wasm_bindgen::prelude::*;

mod animation;
mod geometry;

pub use animation::WasmConvolutionAnimation;
pub use geometry::{
    complex_exponential_helix, complex_exponential_sweep, modulus_surface,
    modulus_surface_preset,
};

pub(crate) fn js_error(err: anyhow::Error) -> JsValue {
    log::debug!("returning error to JS: {err:#}");
    JsValue::from_str(&format!("{err:#}"))
}
