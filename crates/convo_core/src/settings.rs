//! Serializable settings for the animations and sampled geometries.

use crate::error::{Error, Result};
use crate::quadrature::QuadratureRule;
use serde::{Deserialize, Serialize};

/// A closed display range `[min, max]` on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(Error::settings(format!("{name} range must be finite")));
        }
        if self.max <= self.min {
            return Err(Error::settings(format!(
                "{name} range must have max > min, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Axis limits handed to the renderer alongside each frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewLimits {
    pub x: AxisRange,
    /// Limits of the panel showing f1, the shifted f2 and their product.
    pub signal_y: AxisRange,
    /// Limits of the panel showing the convolution curve.
    pub convolution_y: AxisRange,
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-5.0, 5.0),
            signal_y: AxisRange::new(-2.0, 2.0),
            convolution_y: AxisRange::new(-3.0, 3.0),
        }
    }
}

impl ViewLimits {
    pub fn validate(&self) -> Result<()> {
        self.x.validate("x")?;
        self.signal_y.validate("signal y")?;
        self.convolution_y.validate("convolution y")
    }
}

/// Parameters of the sliding-shift convolution animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Samples per unit time on the integration grid.
    pub sampling_frequency: f64,
    /// The grid spans `[-half_window, half_window)`.
    pub half_window: f64,
    pub shift_start: f64,
    /// Exclusive.
    pub shift_stop: f64,
    pub shift_step: f64,
    pub frame_interval_ms: u32,
    pub rule: QuadratureRule,
    pub view: ViewLimits,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            sampling_frequency: 50.0,
            half_window: 5.0,
            shift_start: -2.0,
            shift_stop: 2.0,
            shift_step: 0.05,
            frame_interval_ms: 80,
            rule: QuadratureRule::Simpson,
            view: ViewLimits::default(),
        }
    }
}

impl AnimationSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.sampling_frequency.is_finite() || self.sampling_frequency <= 0.0 {
            return Err(Error::settings("sampling_frequency must be positive"));
        }
        if !self.half_window.is_finite() || self.half_window <= 0.0 {
            return Err(Error::settings("half_window must be positive"));
        }
        if !self.shift_step.is_finite() || self.shift_step <= 0.0 {
            return Err(Error::settings("shift_step must be positive"));
        }
        if !self.shift_start.is_finite()
            || !self.shift_stop.is_finite()
            || self.shift_stop <= self.shift_start
        {
            return Err(Error::settings(
                "shift range must be finite with shift_stop > shift_start",
            ));
        }
        if self.frame_interval_ms == 0 {
            return Err(Error::settings("frame_interval_ms must be greater than zero"));
        }
        self.view.validate()
    }
}

/// Sampling of `|H(s)|` over a rectangle of the complex plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    pub re_range: AxisRange,
    pub im_range: AxisRange,
    /// Number of faces per axis; each axis gets `resolution + 1` samples.
    pub resolution: usize,
    /// Heights above this (including poles hit exactly) are clamped to it.
    pub height_limit: Option<f64>,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            re_range: AxisRange::new(-5.0, 5.0),
            im_range: AxisRange::new(-5.0, 5.0),
            resolution: 32,
            height_limit: None,
        }
    }
}

impl SurfaceSettings {
    pub fn validate(&self) -> Result<()> {
        self.re_range.validate("Re(s)")?;
        self.im_range.validate("Im(s)")?;
        if self.resolution == 0 {
            return Err(Error::settings("resolution must be greater than zero"));
        }
        if let Some(limit) = self.height_limit {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(Error::settings("height_limit must be positive and finite"));
            }
        }
        Ok(())
    }
}

/// Sampling of `exp((alpha + i theta) t)` along the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExponentialSettings {
    pub alpha: f64,
    pub theta: f64,
    pub t_min: f64,
    pub t_max: f64,
    pub step: f64,
}

impl Default for ExponentialSettings {
    fn default() -> Self {
        Self {
            alpha: -0.4,
            theta: 10.0,
            t_min: -5.0,
            t_max: 5.0,
            step: 0.01,
        }
    }
}

impl ExponentialSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || !self.theta.is_finite() {
            return Err(Error::settings("alpha and theta must be finite"));
        }
        AxisRange::new(self.t_min, self.t_max).validate("t")?;
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(Error::settings("step must be positive"));
        }
        Ok(())
    }
}
