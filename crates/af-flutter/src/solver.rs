//! Flutter search driver.
//!
//! Ties the pieces together: coarse sweep, mode tracking, bracket selection,
//! bisection and on-demand sensitivities. One solver serves one analysis;
//! parameters and collaborators are borrowed from the caller's session.

use crate::basis::ModalBasis;
use crate::bisection::{BisectionConfig, BisectionStep, bisect};
use crate::eigen::{EigenSolverConfig, GeneralizedEigenSolver};
use crate::error::{FlutterError, FlutterResult};
use crate::operators::{OperatorAssembler, ReducedForm, ReducedOperatorBuilder};
use crate::report;
use crate::roots::{FlutterRoot, RootHistory, RootSet};
use crate::sensitivity::SensitivityEngine;
use crate::sweep::{VelocityRange, execute_sweep};
use crate::tracker::{RootTracker, TrackingConfig};
use af_core::{ParamId, ParameterSet};
use std::io;
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

/// Search configuration.
#[derive(Debug, Clone)]
pub struct FlutterConfig {
    pub form: ReducedForm,
    pub eigen: EigenSolverConfig,
    pub tracking: TrackingConfig,
    /// `tol` and `max_iterations` are overridden per search call
    pub bisection: BisectionConfig,
    /// Evaluate coarse sweep samples on the rayon pool
    pub parallel_sweep: bool,
}

impl Default for FlutterConfig {
    fn default() -> Self {
        Self {
            form: ReducedForm::default(),
            eigen: EigenSolverConfig::default(),
            tracking: TrackingConfig::default(),
            bisection: BisectionConfig::default(),
            parallel_sweep: true,
        }
    }
}

/// Progress events streamed during a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchProgress {
    SampleEvaluated {
        index: usize,
        total: usize,
        velocity: f64,
        /// `None` when the sample failed
        max_growth_rate: Option<f64>,
    },
    BracketFound {
        mode: usize,
        lower: f64,
        upper: f64,
    },
    Bisection(BisectionStep),
}

/// Result of [`FlutterSolver::find_critical_root`].
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Converged(FlutterRoot),
    /// Iteration budget exhausted; the root is the best estimate.
    NotConverged(FlutterRoot),
    /// No instability in the sampled range.
    NoCrossingFound { samples: usize, failed_samples: usize },
}

impl SearchOutcome {
    /// A root was located, converged or not.
    pub fn found(&self) -> bool {
        !matches!(self, Self::NoCrossingFound { .. })
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged(_))
    }

    pub fn root(&self) -> Option<&FlutterRoot> {
        match self {
            Self::Converged(root) | Self::NotConverged(root) => Some(root),
            Self::NoCrossingFound { .. } => None,
        }
    }

    pub fn into_root(self) -> Option<FlutterRoot> {
        match self {
            Self::Converged(root) | Self::NotConverged(root) => Some(root),
            Self::NoCrossingFound { .. } => None,
        }
    }
}

type ProgressFn<'p> = Option<&'p mut dyn FnMut(&SearchProgress) -> ControlFlow<()>>;

fn emit(progress: &mut ProgressFn<'_>, event: SearchProgress) -> ControlFlow<()> {
    match progress {
        Some(cb) => cb(&event),
        None => ControlFlow::Continue(()),
    }
}

#[derive(Debug, Clone)]
struct SearchSetup {
    velocity_param: ParamId,
    reference_velocity: f64,
    range: VelocityRange,
    basis: ModalBasis,
}

/// Flutter search engine for one analysis.
pub struct FlutterSolver<'a, A: OperatorAssembler + ?Sized> {
    assembler: &'a A,
    params: &'a ParameterSet,
    config: FlutterConfig,
    eigen: GeneralizedEigenSolver,
    tracker: RootTracker,
    setup: Option<SearchSetup>,
    sensitivity_params: Vec<ParamId>,
    history: RootHistory,
    critical: Option<FlutterRoot>,
    generation: u64,
}

impl<'a, A: OperatorAssembler + ?Sized> FlutterSolver<'a, A> {
    pub fn new(assembler: &'a A, params: &'a ParameterSet, config: FlutterConfig) -> Self {
        Self {
            assembler,
            params,
            eigen: GeneralizedEigenSolver::new(config.eigen.clone()),
            tracker: RootTracker::new(config.tracking.clone()),
            config,
            setup: None,
            sensitivity_params: Vec::new(),
            history: RootHistory::new(),
            critical: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &FlutterConfig {
        &self.config
    }

    /// Configure range and basis. Re-initializing discards previous results.
    pub fn initialize(
        &mut self,
        velocity_param: ParamId,
        lower: f64,
        upper: f64,
        divisions: usize,
        basis: ModalBasis,
    ) -> FlutterResult<()> {
        let reference_velocity = self.params.value(velocity_param)?;
        let range = VelocityRange::new(lower, upper, divisions)?;
        if basis.is_empty() {
            return Err(FlutterError::invalid("modal basis is empty"));
        }
        if self.sensitivity_params.contains(&velocity_param) {
            return Err(FlutterError::invalid(
                "the velocity parameter cannot be a sensitivity parameter",
            ));
        }

        debug!(
            assembler = self.assembler.name(),
            modes = basis.len(),
            lower,
            upper,
            divisions,
            reference_velocity,
            "flutter search initialized"
        );

        self.setup = Some(SearchSetup {
            velocity_param,
            reference_velocity,
            range,
            basis,
        });
        self.clear();
        Ok(())
    }

    /// Parameters whose sensitivities are computed with every converged root.
    pub fn set_sensitivity_parameters(&mut self, params: Vec<ParamId>) -> FlutterResult<()> {
        for &p in &params {
            self.params.get(p)?;
            if self.setup.as_ref().is_some_and(|s| s.velocity_param == p) {
                return Err(FlutterError::invalid(
                    "the velocity parameter cannot be a sensitivity parameter",
                ));
            }
        }
        self.sensitivity_params = params;
        Ok(())
    }

    pub fn reference_velocity(&self) -> Option<f64> {
        self.setup.as_ref().map(|s| s.reference_velocity)
    }

    pub fn range(&self) -> Option<&VelocityRange> {
        self.setup.as_ref().map(|s| &s.range)
    }

    pub fn basis(&self) -> Option<&ModalBasis> {
        self.setup.as_ref().map(|s| &s.basis)
    }

    pub fn history(&self) -> &RootHistory {
        &self.history
    }

    pub fn critical_root(&self) -> Option<&FlutterRoot> {
        self.critical.as_ref()
    }

    /// Release the root history and invalidate the current root.
    pub fn clear(&mut self) {
        self.history = RootHistory::new();
        self.critical = None;
        self.generation += 1;
    }

    /// Build and solve the eigenproblem at one velocity.
    pub fn evaluate(&self, velocity: f64) -> FlutterResult<RootSet> {
        let setup = self.require_setup()?;
        let builder =
            ReducedOperatorBuilder::new(self.assembler, self.params, &setup.basis, self.config.form);
        self.eigen.solve(&builder.build(velocity)?)
    }

    pub fn find_critical_root(
        &mut self,
        tol: f64,
        max_bisection_iters: usize,
    ) -> FlutterResult<SearchOutcome> {
        self.find_critical_root_with_progress(tol, max_bisection_iters, None)
    }

    /// Coarse sweep, bracket selection and bisection.
    ///
    /// `progress` may stop the search between samples or iterations, which
    /// yields [`FlutterError::Cancelled`].
    pub fn find_critical_root_with_progress(
        &mut self,
        tol: f64,
        max_bisection_iters: usize,
        mut progress: ProgressFn<'_>,
    ) -> FlutterResult<SearchOutcome> {
        self.clear();
        let generation = self.generation;

        let setup = self
            .setup
            .as_ref()
            .ok_or_else(|| FlutterError::invalid("initialize must be called before searching"))?;
        let builder =
            ReducedOperatorBuilder::new(self.assembler, self.params, &setup.basis, self.config.form);
        let eigen = &self.eigen;
        let evaluate = |v: f64| -> FlutterResult<RootSet> { eigen.solve(&builder.build(v)?) };

        let total = setup.range.divisions() + 1;
        let samples = execute_sweep(&setup.range, self.config.parallel_sweep, evaluate, |s| {
            emit(
                &mut progress,
                SearchProgress::SampleEvaluated {
                    index: s.index,
                    total,
                    velocity: s.velocity,
                    max_growth_rate: s.result.as_ref().ok().and_then(RootSet::max_growth_rate),
                },
            )
        })?;

        for sample in samples {
            match sample.result {
                Ok(set) => {
                    debug!(
                        velocity = sample.velocity,
                        roots = set.len(),
                        max_growth_rate = set.max_growth_rate(),
                        "sweep sample"
                    );
                    self.history.push_sweep(set);
                }
                Err(e) if e.is_per_sample() => {
                    warn!(velocity = sample.velocity, error = %e, "sweep sample failed");
                    self.history.record_failure(sample.velocity, e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        let tracks = self.tracker.track(self.history.sweep());
        let brackets = self.tracker.find_brackets(&self.history, &tracks);
        let Some(bracket) = self.tracker.select_bracket(&brackets) else {
            let samples = self.history.sweep().len();
            let failed_samples = self.history.failures().len();
            info!(
                lower = setup.range.lower(),
                upper = setup.range.upper(),
                samples,
                failed_samples,
                "no flutter crossing in range"
            );
            return Ok(SearchOutcome::NoCrossingFound {
                samples,
                failed_samples,
            });
        };

        info!(
            mode = bracket.mode,
            lower = bracket.lower.velocity,
            upper = bracket.upper.velocity,
            candidates = brackets.len(),
            "flutter bracket found"
        );
        if bracket.spans_failed_sample {
            warn!(
                lower = bracket.lower.velocity,
                upper = bracket.upper.velocity,
                "bracket spans a failed sample; more than one crossing may be hidden"
            );
        }
        if emit(
            &mut progress,
            SearchProgress::BracketFound {
                mode: bracket.mode,
                lower: bracket.lower.velocity,
                upper: bracket.upper.velocity,
            },
        )
        .is_break()
        {
            return Err(FlutterError::Cancelled);
        }

        let config = BisectionConfig {
            tol,
            max_iterations: max_bisection_iters,
            ..self.config.bisection.clone()
        };
        let outcome = bisect(bracket, &self.tracker, &config, evaluate, |step| {
            emit(&mut progress, SearchProgress::Bisection(*step))
        })?;

        let mode = bracket.mode;
        for set in outcome.evaluated {
            self.history.push_refinement(set);
        }

        let parameters = if self.sensitivity_params.is_empty() {
            self.params
                .iter()
                .map(|p| p.id())
                .filter(|id| *id != setup.velocity_param)
                .collect()
        } else {
            self.sensitivity_params.clone()
        };

        let mut root = FlutterRoot {
            velocity: outcome.velocity,
            pair: outcome.pair,
            b: outcome.b,
            mode,
            converged: outcome.converged,
            iterations: outcome.iterations,
            bracket: outcome.bracket,
            growth_slope: outcome.growth_slope,
            velocity_param: setup.velocity_param,
            parameters,
            sensitivities: Vec::new(),
            generation,
        };

        if !root.converged {
            warn!(
                velocity = root.velocity,
                growth_rate = root.growth_rate(),
                iterations = root.iterations,
                "bisection did not converge"
            );
            self.critical = Some(root.clone());
            return Ok(SearchOutcome::NotConverged(root));
        }

        info!(
            velocity = root.velocity,
            frequency = root.frequency(),
            iterations = root.iterations,
            "flutter root converged"
        );

        let engine = SensitivityEngine::new(&builder);
        for &param in &self.sensitivity_params {
            let name = self.params.name(param)?;
            let s = engine.sensitivity(&root, param, name)?;
            info!(param = name, dv_dp = s.velocity, "flutter velocity sensitivity");
            root.record_sensitivity(s);
        }

        self.critical = Some(root.clone());
        Ok(SearchOutcome::Converged(root))
    }

    /// `dV*/dp` for a converged root of the latest search. The result is
    /// also recorded on `root` and on the solver's critical root.
    pub fn calculate_sensitivity(
        &mut self,
        root: &mut FlutterRoot,
        param: ParamId,
    ) -> FlutterResult<f64> {
        let current = self.critical.as_ref().ok_or_else(|| FlutterError::StaleRoot {
            what: "no flutter root has been found".to_string(),
        })?;
        if root.generation != self.generation || current.generation != self.generation {
            return Err(FlutterError::StaleRoot {
                what: "root belongs to a previous search".to_string(),
            });
        }
        let name = self.params.name(param)?;
        if !root.parameters.contains(&param) {
            return Err(FlutterError::StaleRoot {
                what: format!("parameter '{name}' was not tracked for this root"),
            });
        }

        let setup = self.require_setup()?;
        let builder =
            ReducedOperatorBuilder::new(self.assembler, self.params, &setup.basis, self.config.form);
        let s = SensitivityEngine::new(&builder).sensitivity(root, param, name)?;
        let dv = s.velocity;

        info!(param = name, dv_dp = dv, "flutter velocity sensitivity");
        root.record_sensitivity(s.clone());
        if let Some(critical) = self.critical.as_mut() {
            critical.record_sensitivity(s);
        }
        Ok(dv)
    }

    /// Sorted listing of every root evaluated by the latest search.
    pub fn write_sorted_roots<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        report::write_sorted_roots(&self.history, out)
    }

    fn require_setup(&self) -> FlutterResult<&SearchSetup> {
        self.setup
            .as_ref()
            .ok_or_else(|| FlutterError::invalid("initialize must be called first"))
    }
}
