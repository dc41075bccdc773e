//! The complex exponential `exp((α + iθ) t)` traced as a helix around the time axis.

use crate::error::{Error, Result};
use crate::settings::ExponentialSettings;
use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexExponential {
    /// Growth rate σ.
    pub alpha: f64,
    /// Angular frequency ω.
    pub theta: f64,
}

/// One point on the helix: `(t, Re f(t), Im f(t))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HelixPoint {
    pub t: f64,
    pub re: f64,
    pub im: f64,
}

impl ComplexExponential {
    pub fn new(alpha: f64, theta: f64) -> Self {
        Self { alpha, theta }
    }

    pub fn exponent(&self) -> Complex64 {
        Complex64::new(self.alpha, self.theta)
    }

    pub fn value(&self, t: f64) -> Complex64 {
        (self.exponent() * t).exp()
    }

    pub fn point(&self, t: f64) -> HelixPoint {
        let value = self.value(t);
        HelixPoint {
            t,
            re: value.re,
            im: value.im,
        }
    }
}

/// Samples the helix from `t_min` to `t_max` (inclusive) every `step`.
pub fn sample_helix(settings: &ExponentialSettings) -> Result<Vec<HelixPoint>> {
    settings.validate()?;
    let f = ComplexExponential::new(settings.alpha, settings.theta);
    let span = settings.t_max - settings.t_min;
    let interior = (span / settings.step).ceil() as usize;

    let mut points: Vec<HelixPoint> = (0..interior)
        .map(|i| settings.t_min + i as f64 * settings.step)
        .take_while(|&t| t < settings.t_max)
        .map(|t| f.point(t))
        .collect();
    points.push(f.point(settings.t_max));

    debug!("sampled {} helix points", points.len());
    Ok(points)
}

/// Tracer position on the time axis after a linear sweep has covered `progress` of the range.
///
/// `progress` is clamped to `[0, 1]`; NaN or infinite progress is rejected.
pub fn sweep_time(settings: &ExponentialSettings, progress: f64) -> Result<f64> {
    settings.validate()?;
    if !progress.is_finite() {
        return Err(Error::settings(format!(
            "sweep progress must be finite, got {progress}"
        )));
    }
    let progress = progress.clamp(0.0, 1.0);
    Ok(settings.t_min + progress * (settings.t_max - settings.t_min))
}

#[cfg(test)]
mod tests {
    use super::{sample_helix, sweep_time, ComplexExponential};
    use crate::error::Error;
    use crate::settings::ExponentialSettings;

    #[test]
    fn value_is_damped_rotation() {
        let f = ComplexExponential::new(-0.4, 10.0);
        let t = 0.37;
        let v = f.value(t);
        let envelope = (-0.4 * t).exp();
        assert!((v.re - envelope * (10.0 * t).cos()).abs() < 1e-12);
        assert!((v.im - envelope * (10.0 * t).sin()).abs() < 1e-12);
        assert!((v.norm() - envelope).abs() < 1e-12);
    }

    #[test]
    fn helix_covers_range_inclusive() {
        let settings = ExponentialSettings::default();
        let points = sample_helix(&settings).expect("helix");
        assert_eq!(points.len(), 1001);
        assert_eq!(points[0].t, -5.0);
        assert_eq!(points[points.len() - 1].t, 5.0);
        assert!(points.windows(2).all(|w| w[1].t > w[0].t));
        let start = ComplexExponential::new(-0.4, 10.0).point(-5.0);
        assert_eq!(points[0], start);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = ExponentialSettings {
            step: 0.0,
            ..ExponentialSettings::default()
        };
        assert!(sample_helix(&settings).is_err());
    }

    #[test]
    fn sweep_is_linear_and_clamped() {
        let settings = ExponentialSettings::default();
        assert_eq!(sweep_time(&settings, 0.0).expect("t"), -5.0);
        assert_eq!(sweep_time(&settings, 0.5).expect("t"), 0.0);
        assert_eq!(sweep_time(&settings, 2.0).expect("t"), 5.0);
    }

    #[test]
    fn sweep_rejects_bad_progress_and_settings() {
        let settings = ExponentialSettings::default();
        assert!(matches!(
            sweep_time(&settings, f64::NAN),
            Err(Error::InvalidSettings(_))
        ));
        assert!(sweep_time(&settings, f64::INFINITY).is_err());
        let reversed = ExponentialSettings {
            t_min: 5.0,
            t_max: -5.0,
            ..settings
        };
        assert!(matches!(
            sweep_time(&reversed, 0.5),
            Err(Error::InvalidSettings(_))
        ));
    }
}
