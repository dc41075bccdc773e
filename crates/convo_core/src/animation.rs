//! Per-frame data for the sliding-shift convolution animation.
//!
//! The renderer asks for frames one at a time. Every frame is computed from
//! the shared grid and signals alone; nothing carries over between frames, so
//! a frame that fails (overflow in a signal, say) leaves later frames intact.

use crate::convolution::ConvolutionEvaluator;
use crate::error::{Error, Result};
use crate::grid::{arange_len, TimeGrid};
use crate::quadrature::QuadratureRule;
use crate::settings::{AnimationSettings, ViewLimits};
use crate::traits::Signal;
use log::{debug, warn};
use serde::Serialize;
use std::time::Duration;

/// Ordered shift values `t0`, one per frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftSchedule {
    start: f64,
    step: f64,
    len: usize,
}

impl ShiftSchedule {
    /// `numpy.arange(start, stop, step)` worth of shifts.
    pub fn arange(start: f64, stop: f64, step: f64) -> Result<Self> {
        let len = arange_len(start, stop, step)?;
        if len == 0 {
            return Err(Error::settings(format!(
                "shift range [{start}, {stop}) with step {step} is empty"
            )));
        }
        Ok(Self { start, step, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        (index < self.len).then(|| self.start + index as f64 * self.step)
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(move |i| self.start + i as f64 * self.step)
    }
}

/// Everything the renderer draws for one shift value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Position in the shift schedule; `None` for a shift outside it.
    pub index: Option<usize>,
    pub t0: f64,
    pub times: Vec<f64>,
    /// `f1(τ)`.
    pub f1: Vec<f64>,
    /// `f2(t0 − τ)`.
    pub f2_shifted: Vec<f64>,
    /// `f1(τ) · f2(t0 − τ)`.
    pub product: Vec<f64>,
    /// `(f1 * f2)(t)` over the whole grid.
    pub convolution: Vec<f64>,
    /// `(f1 * f2)(t0)`, the marker on the convolution panel.
    pub value0: f64,
}

impl Frame {
    pub fn compute<F1, F2>(
        f1: &F1,
        f2: &F2,
        grid: &TimeGrid,
        rule: QuadratureRule,
        index: Option<usize>,
        t0: f64,
    ) -> Result<Self>
    where
        F1: Signal + ?Sized,
        F2: Signal + ?Sized,
    {
        let evaluator = ConvolutionEvaluator::new(f1, f2, grid).with_rule(rule);
        let overlap = evaluator.overlap(t0)?;
        let result = evaluator.evaluate(t0)?;

        Ok(Self {
            index,
            t0,
            times: grid.as_slice().to_vec(),
            f1: overlap.f1,
            f2_shifted: overlap.f2_shifted,
            product: overlap.product,
            convolution: result.curve,
            value0: result.value0,
        })
    }

    /// Position of the convolution marker.
    pub fn marker(&self) -> (f64, f64) {
        (self.t0, self.value0)
    }
}

/// Two signals, a grid and a shift schedule: a playable convolution animation.
pub struct ConvolutionAnimation<F1, F2> {
    f1: F1,
    f2: F2,
    grid: TimeGrid,
    schedule: ShiftSchedule,
    rule: QuadratureRule,
    view: ViewLimits,
    frame_interval: Duration,
}

impl<F1: Signal, F2: Signal> ConvolutionAnimation<F1, F2> {
    pub fn new(f1: F1, f2: F2, settings: &AnimationSettings) -> Result<Self> {
        settings.validate()?;
        let grid = TimeGrid::symmetric(settings.sampling_frequency, settings.half_window)?;
        let schedule = ShiftSchedule::arange(
            settings.shift_start,
            settings.shift_stop,
            settings.shift_step,
        )?;
        debug!(
            "convolution animation: {} grid samples, {} frames",
            grid.len(),
            schedule.len()
        );
        Ok(Self {
            f1,
            f2,
            grid,
            schedule,
            rule: settings.rule,
            view: settings.view,
            frame_interval: Duration::from_millis(u64::from(settings.frame_interval_ms)),
        })
    }

    pub fn len(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn schedule(&self) -> &ShiftSchedule {
        &self.schedule
    }

    pub fn view(&self) -> &ViewLimits {
        &self.view
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Mutable access to both signals, for retuning parameters between frames.
    pub fn signals_mut(&mut self) -> (&mut F1, &mut F2) {
        (&mut self.f1, &mut self.f2)
    }

    /// Frame for the `index`-th shift of the schedule.
    pub fn frame(&self, index: usize) -> Result<Frame> {
        let t0 = self.schedule.get(index).ok_or_else(|| {
            Error::settings(format!(
                "frame index {index} out of range (0..{})",
                self.schedule.len()
            ))
        })?;
        self.compute(Some(index), t0)
    }

    /// Frame for an arbitrary shift, outside the schedule.
    pub fn frame_at(&self, t0: f64) -> Result<Frame> {
        self.compute(None, t0)
    }

    /// All frames in schedule order; a failing frame does not end the iteration.
    pub fn frames(&self) -> impl Iterator<Item = Result<Frame>> + '_ {
        (0..self.schedule.len()).map(move |index| self.frame(index))
    }

    fn compute(&self, index: Option<usize>, t0: f64) -> Result<Frame> {
        let frame = Frame::compute(&self.f1, &self.f2, &self.grid, self.rule, index, t0);
        match &frame {
            Ok(frame) => debug!("frame {index:?}: t0 = {t0}, value = {}", frame.value0),
            Err(err) => warn!("frame {index:?} at t0 = {t0} failed: {err}"),
        }
        frame
    }
}
