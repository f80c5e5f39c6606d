//! Clamped beam strip in Mach 3 flow: end-to-end flutter search.

use af_core::ParameterSet;
use af_core::units::m;
use af_flutter::{FlutterConfig, FlutterSolver, ModalBasis, ModalSolver};
use af_structures::{BeamMesh, BeamParameters, BeamPistonAssembler, PanelProperties, PistonOrder, Support};

fn panel() -> (BeamPistonAssembler, ParameterSet, ModalBasis) {
    let mut params = ParameterSet::new();
    let ids = BeamParameters::register(&mut params, &PanelProperties::default(), 0.0).unwrap();
    let mesh = BeamMesh::new(m(10.0), 20, Support::Clamped, Support::Clamped).unwrap();
    let asm = BeamPistonAssembler::new(mesh, ids, PistonOrder::First).unwrap();
    let basis = asm.solve_modes(&params, 6).unwrap();
    (asm, params, basis)
}

fn flutter_velocity(asm: &BeamPistonAssembler, params: &ParameterSet, basis: &ModalBasis) -> f64 {
    let mut solver = FlutterSolver::new(asm, params, FlutterConfig::default());
    solver
        .initialize(asm.ids().velocity, 100.0, 6000.0, 59, basis.clone())
        .unwrap();
    let outcome = solver.find_critical_root(1e-10, 200).unwrap();
    outcome.root().unwrap().velocity
}

#[test]
fn finds_coalescence_flutter() {
    let (asm, params, basis) = panel();
    let mut solver = FlutterSolver::new(&asm, &params, FlutterConfig::default());
    solver
        .initialize(asm.ids().velocity, 100.0, 6000.0, 59, basis)
        .unwrap();

    let outcome = solver.find_critical_root(1e-8, 200).unwrap();
    assert!(outcome.is_converged());
    let root = outcome.root().unwrap();
    assert!(
        root.velocity > 1000.0 && root.velocity < 3000.0,
        "V* = {}",
        root.velocity
    );
    assert!(root.frequency() > 0.0);
    assert!(root.growth_rate().abs() < 1e-3);
    assert!(root.growth_slope.is_some_and(|s| s > 0.0));

    // At the lowest sample every root is damped by the aerodynamic term.
    let first = &solver.history().sweep()[0];
    assert!(first.max_growth_rate().unwrap() < 0.0);
}

#[test]
fn stiffness_sensitivity_matches_finite_difference() {
    let (asm, params, basis) = panel();
    let ids = *asm.ids();

    let mut solver = FlutterSolver::new(&asm, &params, FlutterConfig::default());
    solver
        .initialize(ids.velocity, 100.0, 6000.0, 59, basis.clone())
        .unwrap();
    let mut root = solver
        .find_critical_root(1e-10, 200)
        .unwrap()
        .into_root()
        .unwrap();
    let analytic = solver.calculate_sensitivity(&mut root, ids.e).unwrap();
    assert!(analytic > 0.0, "a stiffer beam flutters later");

    let e = params.value(ids.e).unwrap();
    let h = 1e-3 * e;
    let up = flutter_velocity(&asm, &params.with_value(ids.e, e + h).unwrap(), &basis);
    let dn = flutter_velocity(&asm, &params.with_value(ids.e, e - h).unwrap(), &basis);
    let fd = (up - dn) / (2.0 * h);

    let rel = (analytic - fd).abs() / fd.abs();
    assert!(rel < 1e-3, "analytic {analytic:e} vs finite difference {fd:e}");
}

#[test]
fn denser_air_lowers_the_flutter_velocity() {
    let (asm, params, basis) = panel();
    let ids = *asm.ids();

    let mut solver = FlutterSolver::new(&asm, &params, FlutterConfig::default());
    solver.set_sensitivity_parameters(vec![ids.rho_air, ids.thy]).unwrap();
    solver
        .initialize(ids.velocity, 100.0, 6000.0, 59, basis)
        .unwrap();
    let mut root = solver
        .find_critical_root(1e-10, 200)
        .unwrap()
        .into_root()
        .unwrap();

    assert!(solver.calculate_sensitivity(&mut root, ids.rho_air).unwrap() < 0.0);
    assert!(solver.calculate_sensitivity(&mut root, ids.thy).unwrap() > 0.0);
    // not tracked for this search
    assert!(solver.calculate_sensitivity(&mut root, ids.e).is_err());
    assert_eq!(root.sensitivities.len(), 2);
}
