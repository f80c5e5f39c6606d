//! Bisection refinement of a crossing bracket.

use crate::error::{FlutterError, FlutterResult};
use crate::roots::{EigenPair, RootSet};
use crate::tracker::{Bracket, BracketEnd, RootTracker};
use std::ops::ControlFlow;
use tracing::{debug, warn};

/// Bisection configuration.
#[derive(Debug, Clone)]
pub struct BisectionConfig {
    /// Tolerance on `|real λ|` and on the relative bracket width
    pub tol: f64,
    /// Maximum midpoint evaluations
    pub max_iterations: usize,
    /// Finish with one secant evaluation inside the final bracket
    pub polish: bool,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            tol: 1e-6,
            max_iterations: 60,
            polish: true,
        }
    }
}

/// State after one midpoint evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BisectionStep {
    pub iteration: usize,
    pub velocity: f64,
    pub growth_rate: f64,
    pub frequency: f64,
    /// Alignment with the previous iterate
    pub alignment: f64,
    pub lower: f64,
    pub upper: f64,
    pub lower_growth: f64,
    pub upper_growth: f64,
}

/// Bisection result; `converged == false` is a usable best estimate.
#[derive(Debug, Clone)]
pub struct BisectionOutcome {
    pub velocity: f64,
    pub pair: EigenPair,
    pub b: nalgebra::DMatrix<f64>,
    pub converged: bool,
    pub iterations: usize,
    /// Final bracket
    pub bracket: (f64, f64),
    /// `(σ_hi − σ_lo) / (V_hi − V_lo)` over the final bracket
    pub growth_slope: Option<f64>,
    /// Root sets evaluated during refinement, in evaluation order
    pub evaluated: Vec<RootSet>,
}

/// Refine `bracket` until `|real λ| < tol` or `V_hi − V_lo < tol · |V_hi|`.
///
/// `evaluate` builds and solves the eigenproblem at one velocity. At every
/// midpoint the tracked mode is the root best aligned with either end of
/// the current bracket; near a branch point (a complex pair splitting into
/// real roots) one end still tells the branches apart when the other does
/// not. `on_step` may stop the refinement, which yields
/// [`FlutterError::Cancelled`].
///
/// Failures inside the loop are wrapped in
/// [`FlutterError::BisectionAborted`] with the last valid bracket. The
/// closing secant polish is optional: if it fails, the bisection estimate
/// stands.
pub fn bisect<E, P>(
    bracket: &Bracket,
    tracker: &RootTracker,
    config: &BisectionConfig,
    mut evaluate: E,
    mut on_step: P,
) -> FlutterResult<BisectionOutcome>
where
    E: FnMut(f64) -> FlutterResult<RootSet>,
    P: FnMut(&BisectionStep) -> ControlFlow<()>,
{
    if !(config.tol.is_finite() && config.tol > 0.0) {
        return Err(FlutterError::invalid(format!(
            "bisection tolerance must be positive, got {}",
            config.tol
        )));
    }
    if !(bracket.lower.velocity < bracket.upper.velocity) {
        return Err(FlutterError::invalid(format!(
            "bracket [{}, {}] is empty",
            bracket.lower.velocity, bracket.upper.velocity
        )));
    }

    let mut lo = bracket.lower.clone();
    let mut hi = bracket.upper.clone();
    let mut last: Option<BracketEnd> = None;
    let mut evaluated = Vec::new();

    let mut converged = lo.growth_rate().abs().min(hi.growth_rate().abs()) < config.tol;
    let mut iterations = 0;

    while !converged && iterations < config.max_iterations {
        if hi.velocity - lo.velocity < config.tol * hi.velocity.abs() {
            converged = true;
            break;
        }

        let mid = 0.5 * (lo.velocity + hi.velocity);
        iterations += 1;

        let (end, alignment) =
            evaluate_end(mid, [&lo, &hi], tracker, &mut evaluate, &mut evaluated)?;

        let growth = end.growth_rate();
        if tracker.is_unstable(growth) {
            hi = end.clone();
        } else {
            lo = end.clone();
        }

        let step = BisectionStep {
            iteration: iterations,
            velocity: mid,
            growth_rate: growth,
            frequency: end.pair.frequency(),
            alignment,
            lower: lo.velocity,
            upper: hi.velocity,
            lower_growth: lo.growth_rate(),
            upper_growth: hi.growth_rate(),
        };
        debug!(
            iteration = iterations,
            velocity = mid,
            growth_rate = growth,
            alignment,
            "bisection step"
        );
        if on_step(&step).is_break() {
            return Err(FlutterError::Cancelled);
        }

        converged = growth.abs() < config.tol;
        last = Some(end);
    }

    let mut estimate = closest_to_neutral(&lo, &hi, last.as_ref()).clone();

    let width = hi.velocity - lo.velocity;
    let growth_slope = (width > 0.0).then(|| (hi.growth_rate() - lo.growth_rate()) / width);

    if config.polish
        && estimate.growth_rate().abs() > 0.0
        && let Some(slope) = growth_slope.filter(|s| s.is_finite() && *s > 0.0)
    {
        let guess = lo.velocity - lo.growth_rate() / slope;
        if guess > lo.velocity && guess < hi.velocity {
            match evaluate_end(guess, [&lo, &hi], tracker, &mut evaluate, &mut evaluated) {
                Ok((end, _)) => {
                    if end.growth_rate().abs() <= estimate.growth_rate().abs() {
                        converged |= end.growth_rate().abs() < config.tol;
                        estimate = end;
                    }
                }
                Err(e) => warn!(
                    velocity = guess,
                    error = %e,
                    "secant polish failed; keeping the bisection estimate"
                ),
            }
        }
    }

    Ok(BisectionOutcome {
        velocity: estimate.velocity,
        pair: estimate.pair,
        b: estimate.b,
        converged,
        iterations,
        bracket: (lo.velocity, hi.velocity),
        growth_slope,
        evaluated,
    })
}

fn closest_to_neutral<'e>(
    lo: &'e BracketEnd,
    hi: &'e BracketEnd,
    last: Option<&'e BracketEnd>,
) -> &'e BracketEnd {
    [Some(lo), Some(hi), last]
        .into_iter()
        .flatten()
        .min_by(|l, r| l.growth_rate().abs().total_cmp(&r.growth_rate().abs()))
        .unwrap_or(lo)
}

/// Evaluate `velocity` and pick the root best aligned with any of `ends`.
fn evaluate_end<E>(
    velocity: f64,
    ends: [&BracketEnd; 2],
    tracker: &RootTracker,
    evaluate: &mut E,
    evaluated: &mut Vec<RootSet>,
) -> FlutterResult<(BracketEnd, f64)>
where
    E: FnMut(f64) -> FlutterResult<RootSet>,
{
    let (lower, upper) = (ends[0].velocity, ends[1].velocity);
    let abort = |source: FlutterError| FlutterError::BisectionAborted {
        lower,
        upper,
        source: Box::new(source),
    };

    let set = evaluate(velocity).map_err(abort)?;
    let best = ends
        .iter()
        .filter_map(|end| tracker.closest(&end.pair, &end.b, &set))
        .max_by(|l, r| l.alignment.total_cmp(&r.alignment));
    let Some(found) = best.filter(|c| c.alignment >= tracker.config().min_alignment) else {
        return Err(abort(FlutterError::BisectionDivergence {
            velocity,
            best_alignment: best.map_or(0.0, |c| c.alignment),
            lower,
            upper,
        }));
    };

    let end = BracketEnd {
        velocity,
        pair: set.pairs[found.index].clone(),
        b: set.b.clone(),
    };
    evaluated.push(set);
    Ok((end, found.alignment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roots::C64;
    use nalgebra::{DMatrix, DVector};

    /// Single real mode with growth rate `g(V)`.
    fn scalar_set(velocity: f64, growth: f64) -> RootSet {
        RootSet {
            velocity,
            pairs: vec![EigenPair {
                value: C64::new(growth, 0.0),
                right: DVector::from_element(1, C64::new(1.0, 0.0)),
                left: None,
            }],
            b: DMatrix::identity(1, 1),
        }
    }

    fn bracket_for(g: impl Fn(f64) -> f64, lower: f64, upper: f64) -> Bracket {
        let end = |v: f64| {
            let set = scalar_set(v, g(v));
            BracketEnd {
                velocity: v,
                pair: set.pairs[0].clone(),
                b: set.b,
            }
        };
        Bracket {
            mode: 0,
            lower: end(lower),
            upper: end(upper),
            spans_failed_sample: false,
        }
    }

    #[test]
    fn linear_growth_converges_exactly_with_polish() {
        let g = |v: f64| 0.01 * (v - 100.0);
        let bracket = bracket_for(g, 90.0, 120.0);
        let out = bisect(
            &bracket,
            &RootTracker::default(),
            &BisectionConfig::default(),
            |v| Ok(scalar_set(v, g(v))),
            |_| ControlFlow::Continue(()),
        )
        .unwrap();

        assert!(out.converged);
        assert!((out.velocity - 100.0).abs() < 1e-9);
        assert!((out.growth_slope.unwrap() - 0.01).abs() < 1e-9);
        assert!(out.bracket.0 <= 100.0 && out.bracket.1 >= 100.0);
    }

    #[test]
    fn exhausted_iterations_are_not_an_error() {
        let g = |v: f64| v.powi(3) - 2.0;
        let bracket = bracket_for(g, 0.0, 4.0);
        let config = BisectionConfig {
            tol: 1e-12,
            max_iterations: 3,
            polish: false,
        };
        let out = bisect(
            &bracket,
            &RootTracker::default(),
            &config,
            |v| Ok(scalar_set(v, g(v))),
            |_| ControlFlow::Continue(()),
        )
        .unwrap();
        assert!(!out.converged);
        assert_eq!(out.iterations, 3);
        assert_eq!(out.bracket, (1.0, 1.5));
    }

    #[test]
    fn lost_mode_diverges_with_last_bracket() {
        let bracket = bracket_for(|v| v - 1.0, 0.0, 2.0);
        let err = bisect(
            &bracket,
            &RootTracker::default(),
            &BisectionConfig::default(),
            |v| {
                let mut set = scalar_set(v, 0.5);
                set.pairs[0].right = DVector::from_element(1, C64::new(0.0, 0.0));
                Ok(set)
            },
            |_| ControlFlow::Continue(()),
        )
        .unwrap_err();

        match err {
            FlutterError::BisectionAborted { lower, upper, source } => {
                assert_eq!((lower, upper), (0.0, 2.0));
                assert!(matches!(*source, FlutterError::BisectionDivergence { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn evaluation_failure_aborts_refinement() {
        let bracket = bracket_for(|v| v - 1.0, 0.0, 2.0);
        let err = bisect(
            &bracket,
            &RootTracker::default(),
            &BisectionConfig::default(),
            |v| {
                Err(FlutterError::EigensolveFailure {
                    velocity: v,
                    what: "no convergence".to_string(),
                })
            },
            |_| ControlFlow::Continue(()),
        )
        .unwrap_err();
        assert!(matches!(err, FlutterError::BisectionAborted { .. }));
    }

    #[test]
    fn failed_polish_keeps_the_bisection_estimate() {
        let g = |v: f64| v - 1.0;
        let bracket = bracket_for(g, 0.0, 3.0);
        let config = BisectionConfig {
            tol: 1e-12,
            max_iterations: 2,
            polish: true,
        };
        let mut calls = 0;
        let out = bisect(
            &bracket,
            &RootTracker::default(),
            &config,
            |v| {
                calls += 1;
                if calls > 2 {
                    return Err(FlutterError::EigensolveFailure {
                        velocity: v,
                        what: "no convergence".to_string(),
                    });
                }
                Ok(scalar_set(v, g(v)))
            },
            |_| ControlFlow::Continue(()),
        )
        .unwrap();

        assert_eq!(calls, 3);
        assert!(!out.converged);
        assert_eq!(out.iterations, 2);
        assert_eq!(out.bracket, (0.75, 1.5));
        assert_eq!(out.velocity, 0.75);
        assert_eq!(out.evaluated.len(), 2);
    }

    #[test]
    fn midpoint_follows_the_branch_aligned_with_either_end() {
        // q'' + 0.1 q' + (4 - 0.01 V) q = 0 past its branch point at
        // V = 399.75: two real roots with state vectors `[1, λ]`.
        let two_roots = |v: f64| {
            let d = (0.01 * (v - 400.0) + 0.0025).sqrt();
            let pairs = [-0.05 + d, -0.05 - d]
                .into_iter()
                .map(|l| EigenPair {
                    value: C64::new(l, 0.0),
                    right: DVector::from_vec(vec![C64::new(1.0, 0.0), C64::new(l, 0.0)]),
                    left: None,
                })
                .collect();
            RootSet {
                velocity: v,
                pairs,
                b: DMatrix::identity(2, 2),
            }
        };

        // Stable end still complex; it is slightly closer to the decaying
        // branch at the first midpoint, the growing upper end is not.
        let complex = C64::new(-0.05, 0.4537);
        let lower = BracketEnd {
            velocity: 399.0,
            pair: EigenPair {
                value: complex,
                right: DVector::from_vec(vec![C64::new(1.0, 0.0), complex]),
                left: None,
            },
            b: DMatrix::identity(2, 2),
        };
        let upper_set = two_roots(413.0);
        let bracket = Bracket {
            mode: 0,
            lower,
            upper: BracketEnd {
                velocity: 413.0,
                pair: upper_set.pairs[0].clone(),
                b: upper_set.b,
            },
            spans_failed_sample: false,
        };

        let config = BisectionConfig {
            tol: 1e-9,
            max_iterations: 3,
            polish: false,
        };
        let mut steps = Vec::new();
        let out = bisect(
            &bracket,
            &RootTracker::default(),
            &config,
            |v| Ok(two_roots(v)),
            |s| {
                steps.push(*s);
                ControlFlow::Continue(())
            },
        )
        .unwrap();

        // Midpoints 406, 402.5 and 400.75 all lie past the crossing at 400.
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|s| s.growth_rate > 0.0));
        assert_eq!(out.bracket, (399.0, 400.75));
    }

    #[test]
    fn callback_can_cancel() {
        let bracket = bracket_for(|v| v - 1.0, 0.0, 3.0);
        let mut steps = 0;
        let err = bisect(
            &bracket,
            &RootTracker::default(),
            &BisectionConfig::default(),
            |v| Ok(scalar_set(v, v - 1.0)),
            |_| {
                steps += 1;
                if steps == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
        .unwrap_err();
        assert!(matches!(err, FlutterError::Cancelled));
        assert_eq!(steps, 2);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn bracket_invariant_holds(
                root in 1.0f64..99.0,
                slope in 0.01f64..10.0,
                curve in 0.0f64..1e-3,
            ) {
                // Monotone growth with a single zero at `root`.
                let g = move |v: f64| slope * (v - root) + curve * (v - root).powi(3);
                let bracket = bracket_for(g, 0.0, 100.0);
                let config = BisectionConfig { tol: 1e-8, max_iterations: 200, polish: false };
                let mut steps = Vec::new();
                let out = bisect(
                    &bracket,
                    &RootTracker::default(),
                    &config,
                    |v| Ok(scalar_set(v, g(v))),
                    |s| { steps.push(*s); ControlFlow::Continue(()) },
                ).unwrap();

                for s in &steps {
                    prop_assert!(s.lower_growth <= 0.0 + 1e-10);
                    prop_assert!(s.upper_growth >= 0.0);
                    prop_assert!(s.lower < s.upper);
                }
                prop_assert!(out.converged);
                let bound = ((100.0f64) / config.tol).log2().ceil() as usize;
                prop_assert!(out.iterations <= bound);
                prop_assert!(out.bracket.0 <= root + 1e-7 && out.bracket.1 >= root - 1e-7);
            }
        }
    }
}
