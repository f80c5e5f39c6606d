//! Beam + piston-theory operator assembler.
//!
//! Reads every physical quantity from the analysis [`ParameterSet`], so
//! design parameters can be changed between searches and differentiated
//! analytically.

use crate::beam::{BeamMesh, UnitMatrices};
use crate::error::StructureResult;
use crate::material::IsotropicMaterial;
use crate::modal::{ModalSolution, solve_modes};
use crate::piston::{FlowQuantity, PistonOrder, PistonTheory};
use crate::section::RectangularSection;
use af_core::units::{kgpm3, m, pa};
use af_core::{AfResult, ParamId, ParameterSet};
use af_flutter::{
    FlutterResult, FullOrderOperators, ModalBasis, ModalSolver, OperatorAssembler,
};
use nalgebra::DMatrix;

/// Material, section and flow of a beam panel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanelProperties {
    pub material: IsotropicMaterial,
    pub section: RectangularSection,
    pub flow: PistonTheory,
}

/// Parameter ids used by [`BeamPistonAssembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamParameters {
    pub velocity: ParamId,
    pub e: ParamId,
    pub nu: ParamId,
    pub rho: ParamId,
    pub thy: ParamId,
    pub thz: ParamId,
    pub mach: ParamId,
    pub rho_air: ParamId,
    pub gamma: ParamId,
    pub alpha: ParamId,
}

impl BeamParameters {
    pub const NAMES: [&'static str; 10] = [
        "V", "E", "nu", "rho", "thy", "thz", "mach", "rho_air", "gamma", "alpha",
    ];

    /// Add the panel quantities to `set` under their standard names.
    pub fn register(set: &mut ParameterSet, props: &PanelProperties, velocity: f64) -> AfResult<Self> {
        Ok(Self {
            velocity: set.add("V", velocity)?,
            e: set.add("E", props.material.e.value)?,
            nu: set.add("nu", props.material.nu)?,
            rho: set.add("rho", props.material.rho.value)?,
            thy: set.add("thy", props.section.thy.value)?,
            thz: set.add("thz", props.section.thz.value)?,
            mach: set.add("mach", props.flow.mach)?,
            rho_air: set.add("rho_air", props.flow.rho_air.value)?,
            gamma: set.add("gamma", props.flow.gamma)?,
            alpha: set.add("alpha", props.flow.alpha)?,
        })
    }

    /// Look the standard names up in an existing set.
    pub fn resolve(set: &ParameterSet) -> AfResult<Self> {
        Ok(Self {
            velocity: set.id("V")?,
            e: set.id("E")?,
            nu: set.id("nu")?,
            rho: set.id("rho")?,
            thy: set.id("thy")?,
            thz: set.id("thz")?,
            mach: set.id("mach")?,
            rho_air: set.id("rho_air")?,
            gamma: set.id("gamma")?,
            alpha: set.id("alpha")?,
        })
    }

    /// Current panel properties, validated.
    pub fn properties(&self, set: &ParameterSet, order: PistonOrder) -> StructureResult<PanelProperties> {
        Ok(PanelProperties {
            material: IsotropicMaterial::new(
                pa(set.value(self.e)?),
                set.value(self.nu)?,
                kgpm3(set.value(self.rho)?),
            )?,
            section: RectangularSection::new(m(set.value(self.thy)?), m(set.value(self.thz)?))?,
            flow: PistonTheory::new(
                order,
                set.value(self.mach)?,
                kgpm3(set.value(self.rho_air)?),
                set.value(self.gamma)?,
                set.value(self.alpha)?,
            )?,
        })
    }
}

/// Beam strip in supersonic flow: Euler-Bernoulli structure plus
/// piston-theory loads on its `thz`-wide face.
#[derive(Debug, Clone)]
pub struct BeamPistonAssembler {
    mesh: BeamMesh,
    units: UnitMatrices,
    ids: BeamParameters,
    order: PistonOrder,
}

impl BeamPistonAssembler {
    pub fn new(mesh: BeamMesh, ids: BeamParameters, order: PistonOrder) -> StructureResult<Self> {
        let units = mesh.unit_matrices()?;
        Ok(Self {
            mesh,
            units,
            ids,
            order,
        })
    }

    pub fn mesh(&self) -> &BeamMesh {
        &self.mesh
    }

    pub fn ids(&self) -> &BeamParameters {
        &self.ids
    }

    pub fn order(&self) -> PistonOrder {
        self.order
    }

    pub fn ndofs(&self) -> usize {
        self.units.mass.nrows()
    }

    /// Structural `(K, M)` without aerodynamic terms.
    pub fn structural(&self, params: &ParameterSet) -> StructureResult<(DMatrix<f64>, DMatrix<f64>)> {
        let props = self.ids.properties(params, self.order)?;
        let ei = props.material.e.value * props.section.inertia();
        let rho_a = props.material.rho.value * props.section.area();
        Ok((&self.units.stiffness * ei, &self.units.mass * rho_a))
    }

    /// Lowest `count` in-vacuo modes.
    pub fn modes(&self, params: &ParameterSet, count: usize) -> StructureResult<ModalSolution> {
        let (k, m) = self.structural(params)?;
        solve_modes(&k, &m, count)
    }

    fn operators(
        &self,
        stiffness: f64,
        mass: f64,
        convection: f64,
        damping: f64,
    ) -> FullOrderOperators {
        FullOrderOperators {
            stiffness: &self.units.stiffness * stiffness + &self.units.convection * convection,
            mass: &self.units.mass * mass,
            damping: Some(&self.units.mass * damping),
        }
    }
}

impl OperatorAssembler for BeamPistonAssembler {
    fn name(&self) -> &str {
        "beam-piston-theory"
    }

    fn assemble(&self, params: &ParameterSet, velocity: f64) -> FlutterResult<FullOrderOperators> {
        let props = self.ids.properties(params, self.order)?;
        let b = props.section.thz.value;
        Ok(self.operators(
            props.material.e.value * props.section.inertia(),
            props.material.rho.value * props.section.area(),
            b * props.flow.stiffness_gain(velocity),
            b * props.flow.damping_gain(velocity),
        ))
    }

    fn assemble_sensitivity(
        &self,
        params: &ParameterSet,
        param: ParamId,
        velocity: f64,
    ) -> FlutterResult<FullOrderOperators> {
        let props = self.ids.properties(params, self.order)?;
        let ids = &self.ids;
        let e = props.material.e.value;
        let rho = props.material.rho.value;
        let section = &props.section;
        let flow = &props.flow;
        let b = section.thz.value;

        let flow_term = |quantity| {
            let (dq, dc) = flow.gain_derivatives(quantity, velocity);
            self.operators(0.0, 0.0, b * dq, b * dc)
        };

        let d = if param == ids.e {
            self.operators(section.inertia(), 0.0, 0.0, 0.0)
        } else if param == ids.rho {
            self.operators(0.0, section.area(), 0.0, 0.0)
        } else if param == ids.thy {
            self.operators(e * section.d_inertia_d_thy(), rho * section.d_area_d_thy(), 0.0, 0.0)
        } else if param == ids.thz {
            self.operators(
                e * section.d_inertia_d_thz(),
                rho * section.d_area_d_thz(),
                flow.stiffness_gain(velocity),
                flow.damping_gain(velocity),
            )
        } else if param == ids.velocity {
            flow_term(FlowQuantity::Velocity)
        } else if param == ids.mach {
            flow_term(FlowQuantity::Mach)
        } else if param == ids.rho_air {
            flow_term(FlowQuantity::Density)
        } else if param == ids.gamma {
            flow_term(FlowQuantity::Gamma)
        } else if param == ids.alpha {
            flow_term(FlowQuantity::Alpha)
        } else {
            // nu, or any parameter the panel does not read
            self.operators(0.0, 0.0, 0.0, 0.0)
        };
        Ok(d)
    }

    fn assemble_velocity_sensitivity(
        &self,
        params: &ParameterSet,
        velocity: f64,
    ) -> FlutterResult<Option<FullOrderOperators>> {
        self.assemble_sensitivity(params, self.ids.velocity, velocity)
            .map(Some)
    }
}

impl ModalSolver for BeamPistonAssembler {
    fn solve_modes(&self, params: &ParameterSet, count: usize) -> FlutterResult<ModalBasis> {
        let modes = self.modes(params, count)?;
        ModalBasis::from_columns(modes.shapes)
    }
}
