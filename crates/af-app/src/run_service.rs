//! Run execution and caching service.

use std::ops::ControlFlow;
use std::path::Path;
use std::time::Instant;

use af_flutter::{C64, FlutterRoot, RootHistory, SearchOutcome, SearchProgress, SlopeSource};
use af_project::Analysis;
use af_results::{
    FlutterModeRecord, FlutterRecord, RootRecord, RunArtifacts, RunManifest, RunOutcome, RunStore,
    SearchPhase, SensitivityRecord,
};
use nalgebra::DVector;
use tracing::{info, warn};

use crate::analysis_service;
use crate::error::{AppError, AppResult};
use crate::progress::{RefineProgress, RunProgressEvent, RunStage, SweepProgress};
use crate::session::AnalysisSession;

/// Options for running a flutter search.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub solver_version: String,
    /// Abandon the search once this much wall-clock time has passed
    pub wall_clock_budget_s: Option<f64>,
    /// Replaces the analysis file's `sensitivity` list
    pub sensitivity: Option<Vec<String>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
            wall_clock_budget_s: None,
            sensitivity: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub analysis_path: &'a Path,
    pub options: RunOptions,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub flutter: Option<FlutterRecord>,
    pub loaded_from_cache: bool,
    pub total_time_s: f64,
}

type ProgressCb<'a> = Option<&'a mut dyn FnMut(RunProgressEvent)>;

fn emit_stage(progress_cb: &mut ProgressCb<'_>, stage: RunStage, started: Instant, message: &str) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            Some(message.to_string()),
        ));
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream search progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: ProgressCb<'_>,
) -> AppResult<RunResponse> {
    let started = Instant::now();

    emit_stage(&mut progress_cb, RunStage::LoadingAnalysis, started, "Loading analysis");
    let mut analysis = analysis_service::load_analysis(request.analysis_path)?;
    if let Some(names) = &request.options.sensitivity {
        analysis.sensitivity = names.clone();
        analysis_service::validate_analysis(&analysis)?;
    }

    emit_stage(&mut progress_cb, RunStage::CheckingCache, started, "Checking run cache");
    let run_id = af_results::compute_run_id(&analysis, &request.options.solver_version);
    let store = RunStore::for_analysis(request.analysis_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        emit_stage(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            "Loading cached run",
        );
        let manifest = store.load_manifest(&run_id)?;
        let flutter = store.load_flutter(&run_id)?;
        emit_stage(&mut progress_cb, RunStage::Completed, started, "Loaded cached run");
        return Ok(RunResponse {
            run_id,
            manifest,
            flutter,
            loaded_from_cache: true,
            total_time_s: started.elapsed().as_secs_f64(),
        });
    }

    let artifacts = execute_run(
        analysis,
        &run_id,
        &request.options,
        &mut progress_cb,
        started,
    )?;

    emit_stage(&mut progress_cb, RunStage::SavingResults, started, "Saving results");
    store.save_run(&artifacts)?;

    emit_stage(&mut progress_cb, RunStage::Completed, started, "Run completed");
    Ok(RunResponse {
        run_id,
        manifest: artifacts.manifest,
        flutter: artifacts.flutter,
        loaded_from_cache: false,
        total_time_s: started.elapsed().as_secs_f64(),
    })
}

fn execute_run(
    analysis: Analysis,
    run_id: &str,
    options: &RunOptions,
    progress_cb: &mut ProgressCb<'_>,
    started: Instant,
) -> AppResult<RunArtifacts> {
    emit_stage(progress_cb, RunStage::ComputingModes, started, "Computing structural modes");
    let session = AnalysisSession::new(analysis)?;

    let budget = options.wall_clock_budget_s;
    let mut over_budget = false;
    let mut on_search = |event: &SearchProgress| {
        if budget.is_some_and(|b| started.elapsed().as_secs_f64() > b) {
            over_budget = true;
            return ControlFlow::Break(());
        }
        if let Some(cb) = progress_cb.as_deref_mut() {
            cb(search_event(event, started));
        }
        ControlFlow::Continue(())
    };

    let solution = match session.solve(Some(&mut on_search)) {
        Err(AppError::Cancelled) if over_budget => {
            let budget_s = budget.unwrap_or_default();
            warn!(budget_s, "flutter search exceeded its wall-clock budget");
            return Err(AppError::BudgetExceeded { budget_s });
        }
        other => other?,
    };

    let outcome = match &solution.outcome {
        SearchOutcome::Converged(_) => RunOutcome::Converged,
        SearchOutcome::NotConverged(_) => RunOutcome::NotConverged,
        SearchOutcome::NoCrossingFound {
            samples,
            failed_samples,
        } => RunOutcome::NoCrossingFound {
            samples: *samples,
            failed_samples: *failed_samples,
        },
    };
    let flutter = solution.outcome.root().map(flutter_record);
    let flutter_mode = solution
        .outcome
        .root()
        .zip(solution.mode_shape.as_ref())
        .map(|(root, shape)| flutter_mode_record(root.velocity, shape));
    if let Some(f) = &flutter {
        info!(
            run_id,
            velocity_mps = f.velocity_mps,
            frequency_hz = f.frequency_hz,
            converged = f.converged,
            "flutter run finished"
        );
    }

    let analysis = session.analysis();
    Ok(RunArtifacts {
        manifest: RunManifest {
            run_id: run_id.to_string(),
            analysis_name: analysis.name.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            solver_version: options.solver_version.clone(),
            outcome,
            sensitivity: analysis.sensitivity.clone(),
            elapsed_s: started.elapsed().as_secs_f64(),
        },
        roots: root_records(&solution.history),
        flutter,
        flutter_mode,
        sorted_roots: solution.sorted_roots,
    })
}

fn search_event(event: &SearchProgress, started: Instant) -> RunProgressEvent {
    let elapsed = started.elapsed().as_secs_f64();
    match event {
        SearchProgress::SampleEvaluated {
            index,
            total,
            velocity,
            max_growth_rate,
        } => RunProgressEvent {
            sweep: Some(SweepProgress {
                sample: *index,
                total: *total,
                velocity_mps: *velocity,
                max_growth_rate: *max_growth_rate,
            }),
            ..RunProgressEvent::stage(RunStage::Sweeping, elapsed, None)
        },
        SearchProgress::BracketFound { mode, lower, upper } => RunProgressEvent::stage(
            RunStage::Refining,
            elapsed,
            Some(format!("mode {mode} crosses between {lower} and {upper} m/s")),
        ),
        SearchProgress::Bisection(step) => RunProgressEvent {
            refine: Some(RefineProgress {
                iteration: step.iteration,
                velocity_mps: step.velocity,
                growth_rate: step.growth_rate,
                bracket_mps: (step.lower, step.upper),
            }),
            ..RunProgressEvent::stage(RunStage::Refining, elapsed, None)
        },
    }
}

fn root_records(history: &RootHistory) -> Vec<RootRecord> {
    let collect = |sets: &[af_flutter::RootSet], phase: SearchPhase| {
        sets.iter()
            .flat_map(|set| {
                set.iter().enumerate().map(move |(index, pair)| RootRecord {
                    phase,
                    velocity_mps: set.velocity,
                    index,
                    growth_rate: pair.growth_rate(),
                    frequency_rad_s: pair.frequency(),
                })
            })
            .collect::<Vec<_>>()
    };
    let mut records = collect(history.sweep(), SearchPhase::Sweep);
    records.extend(collect(history.refinement(), SearchPhase::Refinement));
    records
}

fn flutter_record(root: &FlutterRoot) -> FlutterRecord {
    FlutterRecord {
        velocity_mps: root.velocity,
        growth_rate: root.growth_rate(),
        frequency_rad_s: root.frequency(),
        frequency_hz: root.frequency() / (2.0 * std::f64::consts::PI),
        mode: root.mode,
        converged: root.converged,
        iterations: root.iterations,
        bracket_mps: root.bracket,
        growth_slope: root.growth_slope,
        sensitivities: root
            .sensitivities
            .iter()
            .map(|s| SensitivityRecord {
                param: s.name.clone(),
                dv_dp: s.velocity,
                dlambda_re: s.eigenvalue.re,
                dlambda_im: s.eigenvalue.im,
                growth_slope: s.growth_slope,
                slope_source: match s.slope_source {
                    SlopeSource::Analytic => "analytic",
                    SlopeSource::FiniteDifference => "finite_difference",
                }
                .to_string(),
            })
            .collect(),
    }
}

/// Scale `shape` so its largest entry is `1 + 0i`.
fn flutter_mode_record(velocity: f64, shape: &DVector<C64>) -> FlutterModeRecord {
    let pivot = shape
        .iter()
        .copied()
        .max_by(|a, b| a.norm().total_cmp(&b.norm()))
        .unwrap_or(C64::new(1.0, 0.0));
    let scale = if pivot.norm() > 0.0 { pivot.inv() } else { C64::new(1.0, 0.0) };
    let scaled: Vec<C64> = shape.iter().map(|v| v * scale).collect();
    FlutterModeRecord {
        velocity_mps: velocity,
        re: scaled.iter().map(|v| v.re).collect(),
        im: scaled.iter().map(|v| v.im).collect(),
    }
}

/// Runs cached next to an analysis file, oldest first.
pub fn list_runs(analysis_path: &Path) -> AppResult<Vec<RunManifest>> {
    let analysis = analysis_service::load_analysis(analysis_path)?;
    let store = RunStore::for_analysis(analysis_path)?;
    Ok(store.list_runs(&analysis.name)?)
}

/// Load every stored artifact of a run.
pub fn load_run(analysis_path: &Path, run_id: &str) -> AppResult<RunArtifacts> {
    let store = RunStore::for_analysis(analysis_path)?;
    Ok(store.load_run(run_id)?)
}
