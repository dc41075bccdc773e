//! Height fields of `|H(s)|` for zero/pole transfer functions.

use crate::error::{Error, Result};
use crate::settings::{AxisRange, SurfaceSettings};
use log::{debug, warn};
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// `H(s) = gain · Π(s − z) / Π(s − p)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFunction {
    pub gain: f64,
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
}

impl TransferFunction {
    pub fn new(gain: f64, zeros: Vec<Complex64>, poles: Vec<Complex64>) -> Self {
        Self { gain, zeros, poles }
    }

    pub fn evaluate(&self, s: Complex64) -> Complex64 {
        let numerator = self
            .zeros
            .iter()
            .fold(Complex64::new(self.gain, 0.0), |acc, z| acc * (s - z));
        let denominator = self
            .poles
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, p| acc * (s - p));
        numerator / denominator
    }

    /// `|H(s)|`, as a product of distances so that a pole hit exactly gives `+∞`.
    pub fn modulus(&self, s: Complex64) -> f64 {
        let numerator = self.zeros.iter().map(|z| (s - z).norm()).product::<f64>();
        let denominator = self.poles.iter().map(|p| (s - p).norm()).product::<f64>();
        self.gain.abs() * numerator / denominator
    }
}

/// The four transfer functions shown in the modulus scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulusPreset {
    /// Zero at `s = 1`.
    RealZero,
    /// Zeros at `s = 1 ± i`.
    ComplexConjugateZeros,
    /// Pole at `s = 1`.
    RealPole,
    /// Poles at `s = 1 ± 2i`.
    ComplexConjugatePoles,
}

impl ModulusPreset {
    pub const ALL: [ModulusPreset; 4] = [
        ModulusPreset::RealZero,
        ModulusPreset::ComplexConjugateZeros,
        ModulusPreset::RealPole,
        ModulusPreset::ComplexConjugatePoles,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ModulusPreset::RealZero => "modulus of a real zero",
            ModulusPreset::ComplexConjugateZeros => "modulus of a pair of complex conjugate zeros",
            ModulusPreset::RealPole => "modulus of a real pole",
            ModulusPreset::ComplexConjugatePoles => "modulus of a pair of complex conjugate poles",
        }
    }

    pub fn transfer_function(self) -> TransferFunction {
        let c = Complex64::new;
        match self {
            ModulusPreset::RealZero => TransferFunction::new(1.0, vec![c(1.0, 0.0)], vec![]),
            ModulusPreset::ComplexConjugateZeros => {
                TransferFunction::new(1.0, vec![c(1.0, 1.0), c(1.0, -1.0)], vec![])
            }
            ModulusPreset::RealPole => TransferFunction::new(1.0, vec![], vec![c(1.0, 0.0)]),
            ModulusPreset::ComplexConjugatePoles => {
                TransferFunction::new(1.0, vec![], vec![c(1.0, 2.0), c(1.0, -2.0)])
            }
        }
    }

    /// Square plotting window the scene uses for this preset.
    pub fn settings(self) -> SurfaceSettings {
        let half = match self {
            ModulusPreset::RealZero | ModulusPreset::RealPole => 5.0,
            ModulusPreset::ComplexConjugateZeros => 2.0,
            ModulusPreset::ComplexConjugatePoles => 3.0,
        };
        SurfaceSettings {
            re_range: AxisRange::new(-half, half),
            im_range: AxisRange::new(-half, half),
            ..SurfaceSettings::default()
        }
    }
}

/// Sampled `|H(s)|`; `heights[(i, j)]` sits at `re_axis[i] + i·im_axis[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModulusSurface {
    pub re_axis: Vec<f64>,
    pub im_axis: Vec<f64>,
    pub heights: DMatrix<f64>,
}

/// Row-major form of a [`ModulusSurface`] for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMesh {
    pub re_axis: Vec<f64>,
    pub im_axis: Vec<f64>,
    /// `heights[i * im_axis.len() + j]`.
    pub heights: Vec<f64>,
}

impl ModulusSurface {
    pub fn max_height(&self) -> f64 {
        self.heights.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_height(&self) -> f64 {
        self.heights.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn to_mesh(&self) -> SurfaceMesh {
        let (rows, cols) = self.heights.shape();
        let mut heights = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            heights.extend(self.heights.row(i).iter().copied());
        }
        SurfaceMesh {
            re_axis: self.re_axis.clone(),
            im_axis: self.im_axis.clone(),
            heights,
        }
    }
}

/// Samples `|H(s)|` on a `(resolution + 1)²` grid over the settings' rectangle.
pub fn sample_modulus(tf: &TransferFunction, settings: &SurfaceSettings) -> Result<ModulusSurface> {
    settings.validate()?;
    let re_axis = linspace(settings.re_range, settings.resolution + 1);
    let im_axis = linspace(settings.im_range, settings.resolution + 1);

    let mut clamped = 0usize;
    let mut heights = DMatrix::zeros(re_axis.len(), im_axis.len());
    for (i, &re) in re_axis.iter().enumerate() {
        for (j, &im) in im_axis.iter().enumerate() {
            let height = tf.modulus(Complex64::new(re, im));
            heights[(i, j)] = match settings.height_limit {
                Some(limit) if !(height <= limit) => {
                    clamped += 1;
                    limit
                }
                Some(_) => height,
                None if height.is_finite() => height,
                None => {
                    return Err(Error::Evaluation {
                        signal: format!("|H(s)| at s = {re}{im:+}i"),
                        time: re,
                        value: height,
                    })
                }
            };
        }
    }
    if clamped > 0 {
        warn!("clamped {clamped} modulus samples to the height limit");
    }
    debug!(
        "sampled |H(s)| on a {}x{} grid",
        re_axis.len(),
        im_axis.len()
    );

    Ok(ModulusSurface {
        re_axis,
        im_axis,
        heights,
    })
}

fn linspace(range: AxisRange, count: usize) -> Vec<f64> {
    let step = range.span() / (count - 1) as f64;
    (0..count)
        .map(|i| {
            if i + 1 == count {
                range.max
            } else {
                range.min + i as f64 * step
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{sample_modulus, ModulusPreset, TransferFunction};
    use crate::error::Error;
    use crate::settings::{AxisRange, SurfaceSettings};
    use num_complex::Complex64;

    #[test]
    fn presets_match_closed_forms() {
        let s = Complex64::new(0.3, -0.7);
        let (u, v) = (s.re, s.im);
        let expected = [
            ((u - 1.0).powi(2) + v * v).sqrt(),
            (((u - 1.0).powi(2) + (v - 1.0).powi(2)) * ((u - 1.0).powi(2) + (v + 1.0).powi(2)))
                .sqrt(),
            1.0 / ((u - 1.0).powi(2) + v * v).sqrt(),
            1.0 / (((u - 1.0).powi(2) + (v - 2.0).powi(2)) * ((u - 1.0).powi(2) + (v + 2.0).powi(2)))
                .sqrt(),
        ];
        for (preset, exact) in ModulusPreset::ALL.iter().zip(expected) {
            let tf = preset.transfer_function();
            assert!((tf.modulus(s) - exact).abs() < 1e-12, "{preset:?}");
            assert!((tf.evaluate(s).norm() - exact).abs() < 1e-12, "{preset:?}");
        }
    }

    #[test]
    fn default_surface_has_thirty_three_samples_per_axis() {
        let preset = ModulusPreset::RealZero;
        let surface =
            sample_modulus(&preset.transfer_function(), &preset.settings()).expect("surface");
        assert_eq!(surface.heights.shape(), (33, 33));
        assert_eq!(surface.re_axis[0], -5.0);
        assert_eq!(surface.re_axis[32], 5.0);
        assert!(surface.min_height() > 0.0);
        // Farthest corner from s = 1 is (-5, ±5).
        assert!((surface.max_height() - (36.0f64 + 25.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn pole_on_grid_needs_a_height_limit() {
        let tf = ModulusPreset::RealPole.transfer_function();
        let settings = SurfaceSettings {
            re_range: AxisRange::new(0.0, 2.0),
            im_range: AxisRange::new(-1.0, 1.0),
            resolution: 2,
            height_limit: None,
        };
        let err = sample_modulus(&tf, &settings).expect_err("pole on grid");
        assert!(matches!(err, Error::Evaluation { .. }));

        let settings = SurfaceSettings {
            height_limit: Some(10.0),
            ..settings
        };
        let surface = sample_modulus(&tf, &settings).expect("clamped");
        assert_eq!(surface.heights[(1, 1)], 10.0);
        assert!((surface.heights[(0, 1)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mesh_is_row_major() {
        let tf = TransferFunction::new(2.0, vec![Complex64::new(0.0, 0.0)], vec![]);
        let settings = SurfaceSettings {
            re_range: AxisRange::new(0.0, 1.0),
            im_range: AxisRange::new(0.0, 2.0),
            resolution: 1,
            height_limit: None,
        };
        let mesh = sample_modulus(&tf, &settings).expect("surface").to_mesh();
        assert_eq!(mesh.re_axis, vec![0.0, 1.0]);
        assert_eq!(mesh.im_axis, vec![0.0, 2.0]);
        let expected = [0.0, 4.0, 2.0, 2.0 * 5.0f64.sqrt()];
        for (h, e) in mesh.heights.iter().zip(expected) {
            assert!((h - e).abs() < 1e-12);
        }
    }
}
