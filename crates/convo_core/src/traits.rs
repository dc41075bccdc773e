use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the quadrature and the expression VM.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A real signal: a total function of time.
///
/// Causal or windowed signals are expressed with indicator factors
/// (e.g. `(t > 0) * exp(-3t)`), never by refusing an input. Non-finite
/// outputs are reported by the convolution evaluator, not by the signal.
pub trait Signal {
    /// Evaluates the signal at a single time instant.
    fn value(&self, t: f64) -> f64;

    /// Evaluates the signal at every time in `times`.
    fn sample(&self, times: &[f64]) -> Vec<f64> {
        times.iter().map(|&t| self.value(t)).collect()
    }
}

impl<F> Signal for F
where
    F: Fn(f64) -> f64,
{
    fn value(&self, t: f64) -> f64 {
        self(t)
    }
}

/// The all-zero signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroSignal;

impl Signal for ZeroSignal {
    fn value(&self, _t: f64) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Signal, ZeroSignal};

    #[test]
    fn closures_are_signals() {
        let ramp = |t: f64| 2.0 * t;
        assert_eq!(ramp.value(1.5), 3.0);
        assert_eq!(ramp.sample(&[0.0, 1.0, -2.0]), vec![0.0, 2.0, -4.0]);
    }

    #[test]
    fn zero_signal_is_zero_everywhere() {
        assert_eq!(ZeroSignal.value(f64::MAX), 0.0);
        assert_eq!(ZeroSignal.sample(&[1.0, 2.0]), vec![0.0, 0.0]);
    }
}
