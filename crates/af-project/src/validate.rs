//! Analysis validation logic.

use crate::schema::{
    Analysis, CrossingPolicyDef, DESIGN_PARAMETERS, FlowDef, LATEST_VERSION, MaterialDef, SearchDef,
    SectionDef, StructureDef, SupportDef,
};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate entry: {id} in {context}")]
    Duplicate { id: String, context: String },

    #[error("Unknown parameter: {name} (valid names: {})", DESIGN_PARAMETERS.join(", "))]
    UnknownParameter { name: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be positive and finite"))
    }
}

pub fn validate_analysis(analysis: &Analysis) -> Result<(), ValidationError> {
    if analysis.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: analysis.version,
        });
    }
    if analysis.name.trim().is_empty() {
        return Err(invalid("name", "", "must not be empty"));
    }

    validate_structure(&analysis.structure)?;
    validate_material(&analysis.material)?;
    validate_section(&analysis.section)?;
    validate_flow(&analysis.flow)?;

    let modes = analysis.modal.modes;
    let free = free_dofs(&analysis.structure);
    if modes == 0 || modes > free {
        return Err(invalid(
            "modal.modes",
            modes,
            &format!("must lie in 1..={free} for this mesh"),
        ));
    }

    validate_search(&analysis.search, modes)?;

    let mut seen = HashSet::new();
    for name in &analysis.sensitivity {
        if !DESIGN_PARAMETERS.contains(&name.as_str()) {
            return Err(ValidationError::UnknownParameter { name: name.clone() });
        }
        if !seen.insert(name) {
            return Err(ValidationError::Duplicate {
                id: name.clone(),
                context: "sensitivity".to_string(),
            });
        }
    }

    Ok(())
}

/// Unconstrained dofs of the beam mesh (two per node).
pub fn free_dofs(structure: &StructureDef) -> usize {
    let constrained = |s: SupportDef| match s {
        SupportDef::Clamped => 2,
        SupportDef::Pinned => 1,
        SupportDef::Free => 0,
    };
    (2 * (structure.elements + 1))
        .saturating_sub(constrained(structure.left) + constrained(structure.right))
}

fn validate_structure(structure: &StructureDef) -> Result<(), ValidationError> {
    positive("structure.length_m", structure.length_m)?;
    if structure.elements == 0 {
        return Err(invalid("structure.elements", 0, "at least one element is required"));
    }
    if structure.left == SupportDef::Free && structure.right == SupportDef::Free {
        return Err(invalid(
            "structure.left/right",
            "free/free",
            "an unsupported beam has rigid-body modes",
        ));
    }
    Ok(())
}

fn validate_material(material: &MaterialDef) -> Result<(), ValidationError> {
    positive("material.youngs_modulus_pa", material.youngs_modulus_pa)?;
    positive("material.density_kg_m3", material.density_kg_m3)?;
    let nu = material.poisson_ratio;
    if !(nu > -1.0 && nu < 0.5) {
        return Err(invalid("material.poisson_ratio", nu, "must lie in (-1, 0.5)"));
    }
    Ok(())
}

fn validate_section(section: &SectionDef) -> Result<(), ValidationError> {
    positive("section.thy_m", section.thy_m)?;
    positive("section.thz_m", section.thz_m)
}

fn validate_flow(flow: &FlowDef) -> Result<(), ValidationError> {
    if !(flow.mach.is_finite() && flow.mach > 1.0) {
        return Err(invalid("flow.mach", flow.mach, "piston theory needs supersonic flow"));
    }
    positive("flow.density_kg_m3", flow.density_kg_m3)?;
    if !(flow.gamma.is_finite() && flow.gamma > 1.0) {
        return Err(invalid("flow.gamma", flow.gamma, "must exceed 1"));
    }
    if !flow.alpha_rad.is_finite() {
        return Err(invalid("flow.alpha_rad", flow.alpha_rad, "must be finite"));
    }
    Ok(())
}

fn validate_search(search: &SearchDef, modes: usize) -> Result<(), ValidationError> {
    if !(search.lower_mps.is_finite() && search.lower_mps >= 0.0) {
        return Err(invalid("search.lower_mps", search.lower_mps, "must be non-negative"));
    }
    if !(search.upper_mps.is_finite() && search.upper_mps > search.lower_mps) {
        return Err(invalid("search.upper_mps", search.upper_mps, "must exceed lower_mps"));
    }
    if search.divisions == 0 {
        return Err(invalid("search.divisions", 0, "at least one division is required"));
    }
    if !search.reference_velocity_mps.is_finite() {
        return Err(invalid(
            "search.reference_velocity_mps",
            search.reference_velocity_mps,
            "must be finite",
        ));
    }
    positive("search.tolerance", search.tolerance)?;
    if search.max_iterations == 0 {
        return Err(invalid("search.max_iterations", 0, "must be at least 1"));
    }
    if let CrossingPolicyDef::Mode { index } = search.policy {
        if index >= modes {
            return Err(invalid(
                "search.policy.index",
                index,
                &format!("only {modes} modes are tracked"),
            ));
        }
    }
    Ok(())
}
