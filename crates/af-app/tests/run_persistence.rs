mod common;

use af_app::{AppError, RunOptions, RunRequest, ensure_run, list_runs, load_run};
use af_results::RunOutcome;

fn request(path: &std::path::Path, use_cache: bool) -> RunRequest<'_> {
    RunRequest {
        analysis_path: path,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    }
}

#[test]
fn second_run_is_served_from_cache() {
    let path = common::write_analysis("af_app_cache", &common::strip());

    let first = ensure_run(&request(&path, true)).unwrap();
    assert!(!first.loaded_from_cache);
    assert_eq!(first.manifest.outcome, RunOutcome::Converged);
    let flutter = first.flutter.clone().unwrap();
    assert!(flutter.converged);
    assert!(flutter.sensitivity("E").is_some());

    let second = ensure_run(&request(&path, true)).unwrap();
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);
    let cached = second.flutter.unwrap();
    assert!((cached.velocity_mps - flutter.velocity_mps).abs() < 1e-9 * flutter.velocity_mps);

    let runs = list_runs(&path).unwrap();
    assert_eq!(runs.len(), 1);

    let artifacts = load_run(&path, &first.run_id).unwrap();
    assert!(!artifacts.roots.is_empty());
    let mode = artifacts.flutter_mode.unwrap();
    assert_eq!(mode.velocity_mps, flutter.velocity_mps);
    let peak = (0..mode.len())
        .filter_map(|dof| mode.magnitude(dof))
        .fold(0.0, f64::max);
    assert!((peak - 1.0).abs() < 1e-12);
    assert_eq!(artifacts.sorted_roots.lines().count(), artifacts.roots.len());
}

#[test]
fn no_cache_recomputes() {
    let path = common::write_analysis("af_app_no_cache", &common::strip());
    ensure_run(&request(&path, true)).unwrap();
    let again = ensure_run(&request(&path, false)).unwrap();
    assert!(!again.loaded_from_cache);
    assert_eq!(list_runs(&path).unwrap().len(), 1);
}

#[test]
fn sensitivity_override_is_a_different_run() {
    let path = common::write_analysis("af_app_override", &common::strip());
    let base = ensure_run(&request(&path, true)).unwrap();

    let mut req = request(&path, true);
    req.options.sensitivity = Some(vec!["thy".to_string()]);
    let other = ensure_run(&req).unwrap();
    assert_ne!(other.run_id, base.run_id);
    let flutter = other.flutter.unwrap();
    assert_eq!(flutter.sensitivities.len(), 1);
    assert!(flutter.sensitivity("thy").unwrap().dv_dp > 0.0);

    req.options.sensitivity = Some(vec!["V".to_string()]);
    assert!(matches!(ensure_run(&req), Err(AppError::Validation(_))));
}

#[test]
fn range_below_flutter_stores_no_crossing() {
    let mut analysis = common::strip();
    analysis.search.upper_mps = 900.0;
    analysis.search.divisions = 8;
    let path = common::write_analysis("af_app_none", &analysis);

    let response = ensure_run(&request(&path, false)).unwrap();
    assert_eq!(
        response.manifest.outcome,
        RunOutcome::NoCrossingFound {
            samples: 9,
            failed_samples: 0
        }
    );
    assert!(response.flutter.is_none());
    let artifacts = load_run(&path, &response.run_id).unwrap();
    assert!(artifacts.flutter.is_none());
    assert!(artifacts.flutter_mode.is_none());
}

#[test]
fn missing_run_is_reported() {
    let path = common::write_analysis("af_app_missing", &common::strip());
    assert!(matches!(
        load_run(&path, "does-not-exist"),
        Err(AppError::RunNotFound(_))
    ));
}
