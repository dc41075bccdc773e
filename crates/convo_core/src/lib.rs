//! The `convo_core` crate provides the numerical engine behind the convolution
//! and transfer-function visualizations. Drawing is left to the caller.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), `Signal` (total real functions of time).
//! - **Equation Engine**: a small bytecode VM compiling text expressions into signals.
//! - **Quadrature / Convolution**: Simpson and trapezoid rules, and the convolution
//!   curve plus marker value for a time shift.
//! - **Animation**: per-frame data for the sliding-shift convolution demo.
//! - **Surface / Exponential**: sampled `|H(s)|` height fields and the complex exponential helix.

pub mod animation;
pub mod convolution;
pub mod equation_engine;
pub mod error;
pub mod exponential;
pub mod grid;
pub mod quadrature;
pub mod settings;
pub mod surface;
pub mod traits;

pub use error::{Error, Result};
