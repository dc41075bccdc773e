use crate::error::{Error, Result};
use crate::traits::Scalar;
use serde::{Deserialize, Serialize};

/// Composite rule used to integrate sampled data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuadratureRule {
    /// Composite Simpson with a quadratic end correction for an odd number of intervals.
    #[default]
    Simpson,
    /// Composite trapezoid.
    Trapezoid,
}

impl QuadratureRule {
    pub fn integrate<T: Scalar>(self, y: &[T], x: &[T]) -> Result<T> {
        match self {
            QuadratureRule::Simpson => simpson(y, x),
            QuadratureRule::Trapezoid => trapezoid(y, x),
        }
    }
}

/// Composite trapezoid rule over (possibly non-uniform) samples.
pub fn trapezoid<T: Scalar>(y: &[T], x: &[T]) -> Result<T> {
    check_lengths(y.len(), x.len())?;
    let half = T::from_f64(0.5).unwrap();
    let total = x
        .windows(2)
        .zip(y.windows(2))
        .fold(T::zero(), |acc, (xs, ys)| {
            acc + (xs[1] - xs[0]) * (ys[0] + ys[1]) * half
        });
    Ok(total)
}

/// Composite Simpson rule over (possibly non-uniform) samples.
///
/// With an odd sample count every pair of intervals gets the three-point
/// rule. With an even count the first `n - 1` samples are integrated that
/// way and the last interval is integrated exactly under the parabola through
/// the final three samples. Two samples reduce to the trapezoid.
pub fn simpson<T: Scalar>(y: &[T], x: &[T]) -> Result<T> {
    check_lengths(y.len(), x.len())?;
    let n = x.len();
    if n == 2 {
        return trapezoid(y, x);
    }
    if n % 2 == 1 {
        return Ok(basic_simpson(y, x));
    }

    let mut total = basic_simpson(&y[..n - 1], &x[..n - 1]);

    // Last interval, under the parabola through the final three samples.
    let two = T::from_f64(2.0).unwrap();
    let three = T::from_f64(3.0).unwrap();
    let six = T::from_f64(6.0).unwrap();
    let h0 = x[n - 2] - x[n - 3];
    let h1 = x[n - 1] - x[n - 2];
    let alpha = (two * h1 * h1 + three * h0 * h1) / (six * (h0 + h1));
    let beta = (h1 * h1 + three * h0 * h1) / (six * h0);
    let eta = (h1 * h1 * h1) / (six * h0 * (h0 + h1));
    total = total + alpha * y[n - 1] + beta * y[n - 2] - eta * y[n - 3];

    Ok(total)
}

/// Three-point rule over consecutive interval pairs; `x.len()` must be odd.
fn basic_simpson<T: Scalar>(y: &[T], x: &[T]) -> T {
    let two = T::from_f64(2.0).unwrap();
    let six = T::from_f64(6.0).unwrap();
    let mut total = T::zero();
    let mut i = 0;
    while i + 2 < x.len() {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let hsum = h0 + h1;
        let hprod = h0 * h1;
        let ratio = h0 / h1;
        total = total
            + hsum / six
                * (y[i] * (two - T::one() / ratio)
                    + y[i + 1] * (hsum * hsum / hprod)
                    + y[i + 2] * (two - ratio));
        i += 2;
    }
    total
}

fn check_lengths(y_len: usize, x_len: usize) -> Result<()> {
    if y_len != x_len {
        return Err(Error::grid(format!(
            "sample length mismatch: {y_len} values for {x_len} abscissae"
        )));
    }
    if x_len < 2 {
        return Err(Error::grid(format!(
            "at least 2 samples are required, got {x_len}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{simpson, trapezoid, QuadratureRule};
    use crate::error::Error;

    fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| a + (b - a) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn simpson_is_exact_for_cubics_on_odd_grids() {
        let x = linspace(-1.0, 2.0, 11);
        let y: Vec<f64> = x.iter().map(|t| t * t * t - 2.0 * t + 1.0).collect();
        let exact = (16.0 / 4.0 - 4.0 + 2.0) - (1.0 / 4.0 - 1.0 - 1.0);
        assert!((simpson(&y, &x).unwrap() - exact).abs() < 1e-12);
    }

    #[test]
    fn simpson_is_exact_for_quadratics_on_even_grids() {
        let x = linspace(0.0, 3.0, 10);
        let y: Vec<f64> = x.iter().map(|t| 3.0 * t * t + 1.0).collect();
        let exact = 27.0 + 3.0;
        assert!((simpson(&y, &x).unwrap() - exact).abs() < 1e-12);
    }

    #[test]
    fn simpson_handles_non_uniform_spacing() {
        let x = vec![0.0, 0.1, 0.4, 0.5, 1.0];
        let y: Vec<f64> = x.iter().map(|t| t * t).collect();
        assert!((simpson(&y, &x).unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn simpson_converges_on_smooth_functions() {
        let x = linspace(0.0, std::f64::consts::PI, 200);
        let y: Vec<f64> = x.iter().map(|t| t.sin()).collect();
        assert!((simpson(&y, &x).unwrap() - 2.0).abs() < 1e-7);
    }

    #[test]
    fn two_samples_fall_back_to_trapezoid() {
        let x = [0.0, 2.0];
        let y = [1.0, 3.0];
        assert_eq!(simpson(&y, &x).unwrap(), 4.0);
        assert_eq!(trapezoid(&y, &x).unwrap(), 4.0);
    }

    #[test]
    fn rules_reject_short_or_mismatched_input() {
        assert!(matches!(
            simpson(&[1.0], &[0.0]),
            Err(Error::InvalidGrid(_))
        ));
        assert!(matches!(
            QuadratureRule::Trapezoid.integrate(&[1.0, 2.0], &[0.0, 1.0, 2.0]),
            Err(Error::InvalidGrid(_))
        ));
    }

    #[test]
    fn generic_over_f32() {
        let x: Vec<f32> = (0..5).map(|i| i as f32 * 0.25).collect();
        let y: Vec<f32> = x.iter().map(|t| 2.0 * t).collect();
        assert!((simpson(&y, &x).unwrap() - 1.0).abs() < 1e-6);
    }
}
