use std::path::PathBuf;

#[test]
fn demos_load_and_validate() {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let root = crate_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root");

    let demos = ["demos/beam_mach3.yaml", "demos/beam_pinned_second_order.json"];

    for rel in demos {
        let path = root.join(rel);
        let result = af_project::load(&path);
        assert!(
            result.is_ok(),
            "demo failed validation: {} => {:?}",
            path.display(),
            result.err()
        );
    }
}

#[test]
fn yaml_demo_fields() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/beam_mach3.yaml");
    let analysis = af_project::load_yaml(&path).unwrap();
    assert_eq!(analysis.structure.elements, 20);
    assert_eq!(analysis.search.policy, af_project::CrossingPolicyDef::LowestVelocity);
    assert_eq!(analysis.sensitivity, vec!["E", "thy", "rho_air"]);
    // defaulted
    assert_eq!(analysis.search.reference_velocity_mps, 0.0);
    assert!(analysis.search.parallel_sweep);
}
