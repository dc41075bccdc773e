//! Sample grids over the time axis.

use crate::error::{Error, Result};
use serde::Serialize;

/// An ordered, strictly increasing sequence of sample times.
///
/// Built once per animation and shared read-only by every frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeGrid {
    samples: Vec<f64>,
    spacing: Option<f64>,
}

impl TimeGrid {
    /// Wraps arbitrary sample times, checking that they can carry a quadrature.
    pub fn from_samples(samples: Vec<f64>) -> Result<Self> {
        validate_samples(&samples)?;
        Ok(Self {
            samples,
            spacing: None,
        })
    }

    /// `numpy.arange` semantics: `ceil((stop - start) / step)` samples at `start + i * step`.
    pub fn arange(start: f64, stop: f64, step: f64) -> Result<Self> {
        let count = arange_len(start, stop, step)?;
        let samples: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
        validate_samples(&samples)?;
        Ok(Self {
            samples,
            spacing: Some(step),
        })
    }

    /// The window `[-half_window, half_window)` sampled at `sampling_frequency`.
    pub fn symmetric(sampling_frequency: f64, half_window: f64) -> Result<Self> {
        if !sampling_frequency.is_finite() || sampling_frequency <= 0.0 {
            return Err(Error::grid(format!(
                "sampling frequency must be positive and finite, got {sampling_frequency}"
            )));
        }
        if !half_window.is_finite() || half_window <= 0.0 {
            return Err(Error::grid(format!(
                "half window must be positive and finite, got {half_window}"
            )));
        }
        Self::arange(-half_window, half_window, 1.0 / sampling_frequency)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    pub fn first(&self) -> f64 {
        self.samples[0]
    }

    pub fn last(&self) -> f64 {
        self.samples[self.samples.len() - 1]
    }

    /// Uniform step, when the grid was generated by `arange`.
    pub fn spacing(&self) -> Option<f64> {
        self.spacing
    }

    /// Index of the sample equal to `t`, up to a tenth of the local spacing.
    pub fn index_of(&self, t: f64) -> Option<usize> {
        if !t.is_finite() {
            return None;
        }
        let pos = self.samples.partition_point(|&s| s < t);
        let candidates = [pos.checked_sub(1), Some(pos)];
        candidates
            .into_iter()
            .flatten()
            .filter(|&i| i < self.samples.len())
            .find(|&i| (self.samples[i] - t).abs() <= 0.1 * self.local_spacing(i))
    }

    fn local_spacing(&self, index: usize) -> f64 {
        let n = self.samples.len();
        if index + 1 < n {
            self.samples[index + 1] - self.samples[index]
        } else {
            self.samples[n - 1] - self.samples[n - 2]
        }
    }
}

/// Number of samples `numpy.arange(start, stop, step)` produces.
pub fn arange_len(start: f64, stop: f64, step: f64) -> Result<usize> {
    if !start.is_finite() || !stop.is_finite() {
        return Err(Error::grid("range bounds must be finite"));
    }
    if !step.is_finite() || step <= 0.0 {
        return Err(Error::grid(format!(
            "step must be positive and finite, got {step}"
        )));
    }
    let span = ((stop - start) / step).ceil();
    if span <= 0.0 {
        return Ok(0);
    }
    Ok(span as usize)
}

fn validate_samples(samples: &[f64]) -> Result<()> {
    if samples.len() < 2 {
        return Err(Error::grid(format!(
            "at least 2 samples are required, got {}",
            samples.len()
        )));
    }
    if let Some(bad) = samples.iter().find(|s| !s.is_finite()) {
        return Err(Error::grid(format!("sample {bad} is not finite")));
    }
    if let Some(i) = samples.windows(2).position(|w| w[1] <= w[0]) {
        return Err(Error::grid(format!(
            "samples must be strictly increasing (t[{}] = {} >= t[{}] = {})",
            i,
            samples[i],
            i + 1,
            samples[i + 1]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{arange_len, TimeGrid};
    use crate::error::Error;

    #[test]
    fn symmetric_grid_matches_arange_length() {
        let grid = TimeGrid::symmetric(50.0, 5.0).expect("grid");
        assert_eq!(grid.len(), 500);
        assert!((grid.first() + 5.0).abs() < 1e-12);
        assert!((grid.last() - 4.98).abs() < 1e-9);
        assert_eq!(grid.spacing(), Some(0.02));
    }

    #[test]
    fn arange_excludes_stop() {
        assert_eq!(arange_len(-2.0, 2.0, 0.05).expect("len"), 80);
        assert_eq!(arange_len(0.0, 1.0, 0.5).expect("len"), 2);
        assert_eq!(arange_len(1.0, 0.0, 0.5).expect("len"), 0);
    }

    #[test]
    fn single_sample_grid_is_rejected() {
        let err = TimeGrid::from_samples(vec![0.0]).expect_err("one sample");
        assert!(matches!(err, Error::InvalidGrid(_)));
        let err = TimeGrid::arange(0.0, 0.5, 1.0).expect_err("one sample");
        assert!(matches!(err, Error::InvalidGrid(_)));
    }

    #[test]
    fn unordered_or_non_finite_grid_is_rejected() {
        assert!(TimeGrid::from_samples(vec![0.0, 1.0, 1.0]).is_err());
        assert!(TimeGrid::from_samples(vec![0.0, 2.0, 1.0]).is_err());
        assert!(TimeGrid::from_samples(vec![0.0, f64::NAN]).is_err());
        assert!(TimeGrid::arange(0.0, 1.0, 0.0).is_err());
        assert!(TimeGrid::symmetric(-1.0, 5.0).is_err());
    }

    #[test]
    fn index_of_finds_grid_points() {
        let grid = TimeGrid::symmetric(50.0, 5.0).expect("grid");
        assert_eq!(grid.index_of(-5.0), Some(0));
        assert_eq!(grid.index_of(0.0), Some(250));
        assert_eq!(grid.index_of(1.0), Some(300));
        assert_eq!(grid.index_of(0.01), None);
        assert_eq!(grid.index_of(7.0), None);
    }
}
