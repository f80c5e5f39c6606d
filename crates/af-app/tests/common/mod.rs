#![allow(dead_code)]

use af_project::schema::*;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{}_{}", prefix, nanos));
    std::fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

/// Clamped aluminium strip at Mach 3; flutters near 1.5 km/s.
pub fn strip() -> Analysis {
    Analysis {
        version: LATEST_VERSION,
        name: "strip".to_string(),
        structure: StructureDef {
            length_m: 10.0,
            elements: 10,
            left: SupportDef::Clamped,
            right: SupportDef::Clamped,
        },
        material: MaterialDef {
            youngs_modulus_pa: 72e9,
            poisson_ratio: 0.33,
            density_kg_m3: 2800.0,
        },
        section: SectionDef {
            thy_m: 0.06,
            thz_m: 1.0,
        },
        flow: FlowDef {
            mach: 3.0,
            density_kg_m3: 1.05,
            gamma: 1.4,
            alpha_rad: 0.0,
            piston_order: PistonOrderDef::First,
        },
        modal: ModalDef {
            modes: 4,
            form: ReducedFormDef::StateSpace,
        },
        search: SearchDef {
            lower_mps: 500.0,
            upper_mps: 4000.0,
            divisions: 35,
            reference_velocity_mps: 0.0,
            tolerance: 1e-8,
            max_iterations: 200,
            policy: CrossingPolicyDef::LowestVelocity,
            parallel_sweep: true,
        },
        sensitivity: vec!["E".to_string(), "rho_air".to_string()],
    }
}

/// Write `analysis` into a fresh directory and return the file path.
pub fn write_analysis(prefix: &str, analysis: &Analysis) -> PathBuf {
    let path = unique_temp_dir(prefix).join("analysis.yaml");
    af_app::save_analysis(&path, analysis).expect("failed to write analysis");
    path
}
