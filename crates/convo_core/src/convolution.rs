//! Numerical convolution over a fixed time grid.
//!
//! `(f1 * f2)(t) = ∫ f1(τ) f2(t − τ) dτ` is approximated by integrating the
//! sampled product over the grid with a composite quadrature rule. The full
//! curve and the single value at a shift `t0` go through the same routine, so
//! the value at a grid point is bit-identical to the curve entry there.

use crate::error::{Error, Result};
use crate::grid::TimeGrid;
use crate::quadrature::QuadratureRule;
use crate::traits::Signal;
use serde::{Deserialize, Serialize};

/// Convolution curve over the grid plus the value at one shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Convolution {
    pub curve: Vec<f64>,
    pub t0: f64,
    pub value0: f64,
}

/// The integrand for one shift, sampled on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    pub f1: Vec<f64>,
    pub f2_shifted: Vec<f64>,
    pub product: Vec<f64>,
}

/// Evaluates `f1 * f2` on a borrowed grid.
pub struct ConvolutionEvaluator<'a, F1: ?Sized, F2: ?Sized> {
    f1: &'a F1,
    f2: &'a F2,
    grid: &'a TimeGrid,
    rule: QuadratureRule,
}

impl<'a, F1, F2> ConvolutionEvaluator<'a, F1, F2>
where
    F1: Signal + ?Sized,
    F2: Signal + ?Sized,
{
    pub fn new(f1: &'a F1, f2: &'a F2, grid: &'a TimeGrid) -> Self {
        Self {
            f1,
            f2,
            grid,
            rule: QuadratureRule::default(),
        }
    }

    pub fn with_rule(mut self, rule: QuadratureRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn rule(&self) -> QuadratureRule {
        self.rule
    }

    pub fn grid(&self) -> &TimeGrid {
        self.grid
    }

    /// `f1(τ)` on the grid.
    pub fn f1_samples(&self) -> Result<Vec<f64>> {
        sample_checked(self.f1, "f1", self.grid.as_slice())
    }

    /// `f2(t0 − τ)` on the grid: f2 reversed and shifted by `t0`.
    pub fn f2_shifted(&self, t0: f64) -> Result<Vec<f64>> {
        check_shift(t0)?;
        let arguments: Vec<f64> = self.grid.as_slice().iter().map(|&tau| t0 - tau).collect();
        sample_checked(self.f2, "f2", &arguments)
    }

    /// Pointwise `f1(τ) · f2(t0 − τ)` on the grid.
    pub fn product(&self, t0: f64) -> Result<Vec<f64>> {
        Ok(self.overlap(t0)?.product)
    }

    /// `f1(τ)`, `f2(t0 − τ)` and their product, each checked for finite values.
    pub fn overlap(&self, t0: f64) -> Result<Overlap> {
        let f1 = self.f1_samples()?;
        let f2_shifted = self.f2_shifted(t0)?;
        let product = product_checked(&f1, &f2_shifted, self.grid.as_slice(), t0)?;
        Ok(Overlap {
            f1,
            f2_shifted,
            product,
        })
    }

    /// `(f1 * f2)(t0)`.
    pub fn value_at(&self, t0: f64) -> Result<f64> {
        let f1 = self.f1_samples()?;
        self.value_with(&f1, t0)
    }

    /// `(f1 * f2)(t[n])` for every grid point, each computed independently.
    pub fn curve(&self) -> Result<Vec<f64>> {
        let f1 = self.f1_samples()?;
        self.grid
            .as_slice()
            .iter()
            .map(|&t| self.value_with(&f1, t))
            .collect()
    }

    /// Full curve and the value at `t0`.
    pub fn evaluate(&self, t0: f64) -> Result<Convolution> {
        let f1 = self.f1_samples()?;
        let value0 = self.value_with(&f1, t0)?;
        let curve = self
            .grid
            .as_slice()
            .iter()
            .map(|&t| self.value_with(&f1, t))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Convolution { curve, t0, value0 })
    }

    fn value_with(&self, f1: &[f64], t0: f64) -> Result<f64> {
        let shifted = self.f2_shifted(t0)?;
        let product = product_checked(f1, &shifted, self.grid.as_slice(), t0)?;
        let value = self.rule.integrate(&product, self.grid.as_slice())?;
        if !value.is_finite() {
            return Err(Error::Evaluation {
                signal: "f1 * f2".to_string(),
                time: t0,
                value,
            });
        }
        Ok(value)
    }
}

/// Convenience wrapper: the convolution curve on `grid` and its value at `t0`.
pub fn convolve<F1, F2>(
    f1: &F1,
    f2: &F2,
    grid: &TimeGrid,
    t0: f64,
    rule: QuadratureRule,
) -> Result<Convolution>
where
    F1: Signal + ?Sized,
    F2: Signal + ?Sized,
{
    ConvolutionEvaluator::new(f1, f2, grid)
        .with_rule(rule)
        .evaluate(t0)
}

fn check_shift(t0: f64) -> Result<()> {
    if !t0.is_finite() {
        return Err(Error::Evaluation {
            signal: "shift".to_string(),
            time: t0,
            value: t0,
        });
    }
    Ok(())
}

fn sample_checked<S: Signal + ?Sized>(signal: &S, name: &str, times: &[f64]) -> Result<Vec<f64>> {
    let values = signal.sample(times);
    if let Some((&time, &value)) = times.iter().zip(&values).find(|(_, v)| !v.is_finite()) {
        return Err(Error::Evaluation {
            signal: name.to_string(),
            time,
            value,
        });
    }
    Ok(values)
}

fn product_checked(f1: &[f64], shifted: &[f64], taus: &[f64], t0: f64) -> Result<Vec<f64>> {
    let product: Vec<f64> = f1.iter().zip(shifted).map(|(a, b)| a * b).collect();
    if let Some(i) = product.iter().position(|v| !v.is_finite()) {
        return Err(Error::Evaluation {
            signal: format!("f1(τ) · f2({t0} − τ)"),
            time: taus[i],
            value: product[i],
        });
    }
    Ok(product)
}
