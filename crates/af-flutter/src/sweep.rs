//! Coarse velocity sweep.

use crate::error::{FlutterError, FlutterResult};
use crate::roots::RootSet;
use af_core::linspace;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

/// Search range `[lower, upper]` sampled at `divisions + 1` evenly spaced
/// velocities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityRange {
    lower: f64,
    upper: f64,
    divisions: usize,
}

impl VelocityRange {
    pub fn new(lower: f64, upper: f64, divisions: usize) -> FlutterResult<Self> {
        if !(lower.is_finite() && upper.is_finite()) {
            return Err(FlutterError::invalid(format!(
                "velocity range [{lower}, {upper}] must be finite"
            )));
        }
        if lower >= upper {
            return Err(FlutterError::invalid(format!(
                "velocity range lower bound {lower} must be below upper bound {upper}"
            )));
        }
        if divisions == 0 {
            return Err(FlutterError::invalid("velocity range needs at least one division"));
        }
        Ok(Self {
            lower,
            upper,
            divisions,
        })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    /// Sample spacing
    pub fn step(&self) -> f64 {
        (self.upper - self.lower) / self.divisions as f64
    }

    pub fn points(&self) -> Vec<f64> {
        linspace(self.lower, self.upper, self.divisions)
    }
}

/// Outcome of one sweep sample.
#[derive(Debug, Clone)]
pub struct SweepSample {
    pub index: usize,
    pub velocity: f64,
    pub result: FlutterResult<RootSet>,
}

/// Evaluate every velocity of `range`.
///
/// Samples are independent. With `parallel` they are computed on the rayon
/// pool and streamed back as they finish; otherwise they are computed in
/// order. Either way `on_sample` sees samples in velocity order, and a
/// `Break` stops further evaluations: queued parallel samples are skipped,
/// ones already running finish and are discarded.
pub fn execute_sweep<F, P>(
    range: &VelocityRange,
    parallel: bool,
    evaluate: F,
    mut on_sample: P,
) -> FlutterResult<Vec<SweepSample>>
where
    F: Fn(f64) -> FlutterResult<RootSet> + Sync,
    P: FnMut(&SweepSample) -> ControlFlow<()>,
{
    let points = range.points();
    let sample = |(index, velocity): (usize, &f64)| SweepSample {
        index,
        velocity: *velocity,
        result: evaluate(*velocity),
    };

    if parallel {
        // A rayon worker blocking on the channel could starve the pool, so
        // nested sweeps fall back to collecting first.
        if rayon::current_thread_index().is_some() {
            let samples: Vec<SweepSample> = points.par_iter().enumerate().map(sample).collect();
            for s in &samples {
                if on_sample(s).is_break() {
                    return Err(FlutterError::Cancelled);
                }
            }
            return Ok(samples);
        }
        return stream_parallel(&points, &sample, &mut on_sample);
    }

    let mut samples = Vec::with_capacity(points.len());
    for item in points.iter().enumerate() {
        let s = sample(item);
        if on_sample(&s).is_break() {
            return Err(FlutterError::Cancelled);
        }
        samples.push(s);
    }
    Ok(samples)
}

/// Run the rayon sweep on a scoped thread and release finished samples to
/// `on_sample` in index order.
fn stream_parallel<S, P>(
    points: &[f64],
    sample: &S,
    on_sample: &mut P,
) -> FlutterResult<Vec<SweepSample>>
where
    S: Fn((usize, &f64)) -> SweepSample + Sync,
    P: FnMut(&SweepSample) -> ControlFlow<()>,
{
    let cancel = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<SweepSample>();

    thread::scope(|scope| {
        scope.spawn(|| {
            points.par_iter().enumerate().for_each_with(tx, |tx, item| {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                // The receiver is gone once the sweep was cancelled.
                let _ = tx.send(sample(item));
            });
        });

        let mut pending = BTreeMap::new();
        let mut samples = Vec::with_capacity(points.len());
        for s in rx {
            pending.insert(s.index, s);
            while let Some(next) = pending.remove(&samples.len()) {
                if on_sample(&next).is_break() {
                    cancel.store(true, Ordering::Relaxed);
                    return Err(FlutterError::Cancelled);
                }
                samples.push(next);
            }
        }
        Ok(samples)
    })
}
