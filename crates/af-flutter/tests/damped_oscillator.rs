//! State-space form: single-degree-of-freedom oscillators.

mod common;

use af_flutter::{FlutterConfig, FlutterSolver, ReducedForm};
use common::{DampedOscillator, SofteningOscillator, identity_basis};

#[test]
fn complex_root_crosses_with_its_frequency() {
    let (model, params, v) = DampedOscillator::setup(0.2);
    let config = FlutterConfig {
        form: ReducedForm::StateSpace,
        ..Default::default()
    };
    let mut solver = FlutterSolver::new(&model, &params, config);
    solver.initialize(v, 0.0, 300.0, 10, identity_basis(1)).unwrap();

    // One root per sample: the conjugate is filtered out.
    let set = solver.evaluate(0.0).unwrap();
    assert_eq!(set.len(), 1);
    assert!(set.pairs[0].frequency() > 0.0);

    let mut root = solver.find_critical_root(1e-8, 100).unwrap().into_root().unwrap();
    assert!(root.converged);
    assert!((root.velocity - 100.0).abs() < 1e-5, "V* = {}", root.velocity);
    assert!((root.frequency() - 2.0).abs() < 1e-6);

    let dv = solver.calculate_sensitivity(&mut root, model.c0).unwrap();
    assert!((dv - 500.0).abs() < 1e-3, "dV*/dc0 = {dv}");
}

#[test]
fn root_that_first_appears_unstable_is_bracketed() {
    let (model, params, v) = SofteningOscillator::setup(0.1);
    let config = FlutterConfig {
        form: ReducedForm::StateSpace,
        ..Default::default()
    };
    let mut solver = FlutterSolver::new(&model, &params, config);
    solver.initialize(v, 0.0, 650.0, 6, identity_basis(1)).unwrap();

    // Complex and stable at 325, a real pair with one growing root at 433.
    let before = solver.evaluate(325.0).unwrap();
    assert_eq!(before.len(), 1);
    assert!(before.pairs[0].growth_rate() < 0.0);
    let after = solver.evaluate(650.0 * 4.0 / 6.0).unwrap();
    assert_eq!(after.len(), 2);
    assert!(after.max_growth_rate().unwrap() > 0.5);

    let outcome = solver.find_critical_root(1e-8, 100).unwrap();
    assert!(outcome.found());
    let root = outcome.root().unwrap();
    assert!(root.converged);
    assert!((root.velocity - 400.0).abs() < 1e-5, "V* = {}", root.velocity);
    assert!(root.growth_rate().abs() < 1e-8);
    assert!(root.frequency().abs() < 1e-9);
    assert!(root.bracket.0 >= 325.0 - 1e-9 && root.bracket.1 <= 650.0 * 4.0 / 6.0 + 1e-9);
}
