mod common;

use af_app::{
    AppError, RunOptions, RunProgressEvent, RunRequest, RunStage, ensure_run_with_progress,
};

#[test]
fn sweep_and_refinement_progress_are_reported() {
    let path = common::write_analysis("af_app_progress", &common::strip());
    let request = RunRequest {
        analysis_path: &path,
        options: RunOptions {
            use_cache: false,
            ..RunOptions::default()
        },
    };

    let mut events: Vec<RunProgressEvent> = Vec::new();
    let response =
        ensure_run_with_progress(&request, Some(&mut |event| events.push(event))).unwrap();
    assert!(!response.loaded_from_cache);

    let samples: Vec<_> = events.iter().filter_map(|e| e.sweep.clone()).collect();
    assert_eq!(samples.len(), 36);
    assert!(samples.iter().all(|s| s.total == 36));
    assert!(samples.windows(2).all(|w| w[0].velocity_mps < w[1].velocity_mps));

    let steps: Vec<_> = events.iter().filter_map(|e| e.refine.clone()).collect();
    assert!(!steps.is_empty());
    for step in &steps {
        assert!(step.bracket_mps.0 <= step.velocity_mps && step.velocity_mps <= step.bracket_mps.1);
    }

    assert_eq!(events.first().map(|e| e.stage), Some(RunStage::LoadingAnalysis));
    assert_eq!(events.last().map(|e| e.stage), Some(RunStage::Completed));
    assert!(events.iter().any(|e| e.stage == RunStage::SavingResults));
    assert!(events.windows(2).all(|w| w[0].elapsed_wall_s <= w[1].elapsed_wall_s));
}

#[test]
fn exhausted_budget_abandons_the_run() {
    let path = common::write_analysis("af_app_budget", &common::strip());
    let request = RunRequest {
        analysis_path: &path,
        options: RunOptions {
            use_cache: false,
            wall_clock_budget_s: Some(0.0),
            ..RunOptions::default()
        },
    };
    let err = af_app::ensure_run(&request).unwrap_err();
    assert!(matches!(err, AppError::BudgetExceeded { .. }));
    assert!(af_app::list_runs(&path).unwrap().is_empty());
}
