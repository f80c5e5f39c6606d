//! Analysis session.
//!
//! A session owns the [`ParameterSet`], the beam assembler and the modal
//! basis of one analysis. Searches borrow them for their duration, so a
//! session can be re-solved after design parameters change.

use std::ops::ControlFlow;

use af_core::units::{kgpm3, m, pa};
use af_core::{ParamId, ParameterSet};
use af_flutter::{
    C64, CrossingPolicy, FlutterConfig, FlutterSolver, ModalBasis, ModalSolver, ReducedForm,
    RootHistory, SearchOutcome, SearchProgress, TrackingConfig,
};
use af_project::{Analysis, CrossingPolicyDef, PistonOrderDef, ReducedFormDef, SupportDef};
use af_structures::{
    BeamMesh, BeamParameters, BeamPistonAssembler, IsotropicMaterial, PanelProperties,
    PistonOrder, PistonTheory, RectangularSection, Support,
};
use nalgebra::DVector;
use tracing::debug;

use crate::analysis_service;
use crate::error::{AppError, AppResult};

/// One in-vacuo mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeSummary {
    pub index: usize,
    pub omega_rad_s: f64,
    pub frequency_hz: f64,
}

/// Everything one search produced.
#[derive(Debug, Clone)]
pub struct FlutterSolution {
    pub outcome: SearchOutcome,
    pub history: RootHistory,
    /// Flutter mode on the full structural dofs, when a root was found
    pub mode_shape: Option<DVector<C64>>,
    /// Sorted-root listing, one line per evaluated root
    pub sorted_roots: String,
}

pub struct AnalysisSession {
    analysis: Analysis,
    params: ParameterSet,
    assembler: BeamPistonAssembler,
    basis: ModalBasis,
}

fn support(def: SupportDef) -> Support {
    match def {
        SupportDef::Clamped => Support::Clamped,
        SupportDef::Pinned => Support::Pinned,
        SupportDef::Free => Support::Free,
    }
}

fn piston_order(def: PistonOrderDef) -> PistonOrder {
    match def {
        PistonOrderDef::First => PistonOrder::First,
        PistonOrderDef::Second => PistonOrder::Second,
    }
}

/// Physical properties described by an analysis.
pub fn panel_properties(analysis: &Analysis) -> AppResult<PanelProperties> {
    let mat = &analysis.material;
    let flow = &analysis.flow;
    Ok(PanelProperties {
        material: IsotropicMaterial::new(
            pa(mat.youngs_modulus_pa),
            mat.poisson_ratio,
            kgpm3(mat.density_kg_m3),
        )?,
        section: RectangularSection::new(m(analysis.section.thy_m), m(analysis.section.thz_m))?,
        flow: PistonTheory::new(
            piston_order(flow.piston_order),
            flow.mach,
            kgpm3(flow.density_kg_m3),
            flow.gamma,
            flow.alpha_rad,
        )?,
    })
}

impl AnalysisSession {
    /// Build the structural model and its modal basis.
    pub fn new(analysis: Analysis) -> AppResult<Self> {
        analysis_service::validate_analysis(&analysis)?;
        let props = panel_properties(&analysis)?;

        let mut params = ParameterSet::new();
        let ids = BeamParameters::register(
            &mut params,
            &props,
            analysis.search.reference_velocity_mps,
        )?;

        let s = &analysis.structure;
        let mesh = BeamMesh::new(m(s.length_m), s.elements, support(s.left), support(s.right))?;
        let assembler = BeamPistonAssembler::new(mesh, ids, piston_order(analysis.flow.piston_order))?;
        let basis = assembler.solve_modes(&params, analysis.modal.modes)?;

        debug!(
            analysis = %analysis.name,
            dofs = assembler.ndofs(),
            modes = basis.len(),
            "analysis session ready"
        );

        Ok(Self {
            analysis,
            params,
            assembler,
            basis,
        })
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn assembler(&self) -> &BeamPistonAssembler {
        &self.assembler
    }

    pub fn basis(&self) -> &ModalBasis {
        &self.basis
    }

    /// Change a named parameter. The modal basis is kept as is; call
    /// [`Self::refresh_basis`] to recompute it for the new structure.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> AppResult<()> {
        let id = self.params.id(name)?;
        let trial = self.params.with_value(id, value)?;
        self.assembler
            .ids()
            .properties(&trial, self.assembler.order())?;
        self.params = trial;
        Ok(())
    }

    pub fn refresh_basis(&mut self) -> AppResult<()> {
        self.basis = self
            .assembler
            .solve_modes(&self.params, self.analysis.modal.modes)?;
        Ok(())
    }

    /// Lowest `count` in-vacuo modes at the current parameter values.
    pub fn modes(&self, count: usize) -> AppResult<Vec<ModeSummary>> {
        let solution = self.assembler.modes(&self.params, count)?;
        Ok(solution
            .omega
            .iter()
            .enumerate()
            .map(|(index, &omega_rad_s)| ModeSummary {
                index,
                omega_rad_s,
                frequency_hz: solution.frequency(index).map_or(0.0, |f| f.value),
            })
            .collect())
    }

    pub fn flutter_config(&self) -> FlutterConfig {
        let search = &self.analysis.search;
        let policy = match search.policy {
            CrossingPolicyDef::LowestVelocity => CrossingPolicy::LowestVelocity,
            CrossingPolicyDef::StrongestGrowth => CrossingPolicy::StrongestGrowth,
            CrossingPolicyDef::Mode { index } => CrossingPolicy::Mode(index),
        };
        FlutterConfig {
            form: match self.analysis.modal.form {
                ReducedFormDef::StateSpace => ReducedForm::StateSpace,
                ReducedFormDef::Generalized => ReducedForm::Generalized,
            },
            tracking: TrackingConfig {
                policy,
                ..TrackingConfig::default()
            },
            parallel_sweep: search.parallel_sweep,
            ..FlutterConfig::default()
        }
    }

    /// Ids of the parameters listed under `sensitivity`.
    pub fn sensitivity_ids(&self) -> AppResult<Vec<ParamId>> {
        self.analysis
            .sensitivity
            .iter()
            .map(|name| self.params.id(name).map_err(AppError::from))
            .collect()
    }

    /// Run the flutter search; sensitivities of a converged root are
    /// computed for every listed parameter.
    pub fn solve(
        &self,
        progress: Option<&mut dyn FnMut(&SearchProgress) -> ControlFlow<()>>,
    ) -> AppResult<FlutterSolution> {
        let search = &self.analysis.search;
        let mut solver = FlutterSolver::new(&self.assembler, &self.params, self.flutter_config());
        solver.set_sensitivity_parameters(self.sensitivity_ids()?)?;
        solver.initialize(
            self.assembler.ids().velocity,
            search.lower_mps,
            search.upper_mps,
            search.divisions,
            self.basis.clone(),
        )?;

        let outcome =
            solver.find_critical_root_with_progress(search.tolerance, search.max_iterations, progress)?;

        let mut listing = Vec::new();
        solver.write_sorted_roots(&mut listing)?;
        let mode_shape = outcome
            .root()
            .map(|root| root.mode_shape(&self.basis))
            .transpose()?;

        Ok(FlutterSolution {
            outcome,
            history: solver.history().clone(),
            mode_shape,
            sorted_roots: String::from_utf8_lossy(&listing).into_owned(),
        })
    }
}
