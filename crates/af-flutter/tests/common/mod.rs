//! Small synthetic operator models with known flutter velocities.

#![allow(dead_code)]

use af_core::{ParamId, ParameterSet};
use af_flutter::{
    FlutterConfig, FlutterResult, FullOrderOperators, ModalBasis, OperatorAssembler, ReducedForm,
};
use nalgebra::{DMatrix, DVector};

/// `A = diag(-k + 0.01 V, -2, -3)`, `B = I`: the first root crosses at
/// `V* = 100 k`.
pub struct DiagonalModel {
    pub k: ParamId,
    pub analytic_velocity: bool,
}

impl DiagonalModel {
    pub fn setup(analytic_velocity: bool) -> (Self, ParameterSet, ParamId) {
        let mut params = ParameterSet::new();
        let k = params.add("k", 1.0).unwrap();
        let v = params.add("V", 0.0).unwrap();
        (
            Self {
                k,
                analytic_velocity,
            },
            params,
            v,
        )
    }
}

impl OperatorAssembler for DiagonalModel {
    fn name(&self) -> &str {
        "diagonal"
    }

    fn assemble(&self, params: &ParameterSet, velocity: f64) -> FlutterResult<FullOrderOperators> {
        let k = params.value(self.k)?;
        Ok(FullOrderOperators {
            stiffness: DMatrix::from_diagonal(&DVector::from_vec(vec![
                -k + 0.01 * velocity,
                -2.0,
                -3.0,
            ])),
            mass: DMatrix::identity(3, 3),
            damping: None,
        })
    }

    fn assemble_sensitivity(
        &self,
        _params: &ParameterSet,
        param: ParamId,
        _velocity: f64,
    ) -> FlutterResult<FullOrderOperators> {
        let mut d = FullOrderOperators::zeros(3);
        if param == self.k {
            d.stiffness[(0, 0)] = -1.0;
        }
        Ok(d)
    }

    fn assemble_velocity_sensitivity(
        &self,
        _params: &ParameterSet,
        _velocity: f64,
    ) -> FlutterResult<Option<FullOrderOperators>> {
        if !self.analytic_velocity {
            return Ok(None);
        }
        let mut d = FullOrderOperators::zeros(3);
        d.stiffness[(0, 0)] = 0.01;
        Ok(Some(d))
    }
}

/// `A = [[-1 + 0.01 V, p], [0.5, -3]]`, `B = diag(1, 2)`.
///
/// Eigenvalues stay real; the larger one crosses zero at
/// `V* = 100 (1 - p / 6)`.
pub struct CoupledModel {
    pub p: ParamId,
}

impl CoupledModel {
    pub fn setup(p: f64) -> (Self, ParameterSet, ParamId) {
        let mut params = ParameterSet::new();
        let id = params.add("p", p).unwrap();
        let v = params.add("V", 0.0).unwrap();
        (Self { p: id }, params, v)
    }
}

impl OperatorAssembler for CoupledModel {
    fn name(&self) -> &str {
        "coupled"
    }

    fn assemble(&self, params: &ParameterSet, velocity: f64) -> FlutterResult<FullOrderOperators> {
        let p = params.value(self.p)?;
        Ok(FullOrderOperators {
            stiffness: DMatrix::from_row_slice(2, 2, &[-1.0 + 0.01 * velocity, p, 0.5, -3.0]),
            mass: DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 2.0])),
            damping: None,
        })
    }

    fn assemble_sensitivity(
        &self,
        _params: &ParameterSet,
        param: ParamId,
        _velocity: f64,
    ) -> FlutterResult<FullOrderOperators> {
        let mut d = FullOrderOperators::zeros(2);
        if param == self.p {
            d.stiffness[(0, 1)] = 1.0;
        }
        Ok(d)
    }
}

/// Single oscillator `q'' + (c0 - 0.002 V) q' + 4 q = 0`; damping vanishes at
/// `V* = 500 c0` with frequency 2 rad/s.
pub struct DampedOscillator {
    pub c0: ParamId,
}

impl DampedOscillator {
    pub fn setup(c0: f64) -> (Self, ParameterSet, ParamId) {
        let mut params = ParameterSet::new();
        let id = params.add("c0", c0).unwrap();
        let v = params.add("V", 0.0).unwrap();
        (Self { c0: id }, params, v)
    }
}

impl OperatorAssembler for DampedOscillator {
    fn name(&self) -> &str {
        "damped-oscillator"
    }

    fn assemble(&self, params: &ParameterSet, velocity: f64) -> FlutterResult<FullOrderOperators> {
        let c0 = params.value(self.c0)?;
        Ok(FullOrderOperators {
            stiffness: DMatrix::from_element(1, 1, 4.0),
            mass: DMatrix::from_element(1, 1, 1.0),
            damping: Some(DMatrix::from_element(1, 1, c0 - 0.002 * velocity)),
        })
    }

    fn assemble_sensitivity(
        &self,
        _params: &ParameterSet,
        param: ParamId,
        _velocity: f64,
    ) -> FlutterResult<FullOrderOperators> {
        let mut d = FullOrderOperators::zeros(1);
        d.damping = Some(DMatrix::from_element(
            1,
            1,
            if param == self.c0 { 1.0 } else { 0.0 },
        ));
        Ok(d)
    }
}

/// Softening oscillator `q'' + c q' + (4 - 0.01 V) q = 0`. The complex pair
/// splits into two real roots at `V = 400 - 25 c²` and the growing one
/// crosses zero at `V* = 400` without ever being sampled as complex.
pub struct SofteningOscillator {
    pub c: ParamId,
}

impl SofteningOscillator {
    pub fn setup(c: f64) -> (Self, ParameterSet, ParamId) {
        let mut params = ParameterSet::new();
        let id = params.add("c", c).unwrap();
        let v = params.add("V", 0.0).unwrap();
        (Self { c: id }, params, v)
    }
}

impl OperatorAssembler for SofteningOscillator {
    fn name(&self) -> &str {
        "softening-oscillator"
    }

    fn assemble(&self, params: &ParameterSet, velocity: f64) -> FlutterResult<FullOrderOperators> {
        let c = params.value(self.c)?;
        Ok(FullOrderOperators {
            stiffness: DMatrix::from_element(1, 1, 4.0 - 0.01 * velocity),
            mass: DMatrix::from_element(1, 1, 1.0),
            damping: Some(DMatrix::from_element(1, 1, c)),
        })
    }

    fn assemble_sensitivity(
        &self,
        _params: &ParameterSet,
        param: ParamId,
        _velocity: f64,
    ) -> FlutterResult<FullOrderOperators> {
        let mut d = FullOrderOperators::zeros(1);
        d.damping = Some(DMatrix::from_element(
            1,
            1,
            if param == self.c { 1.0 } else { 0.0 },
        ));
        Ok(d)
    }
}

pub fn identity_basis(n: usize) -> ModalBasis {
    ModalBasis::from_columns(DMatrix::identity(n, n)).unwrap()
}

pub fn generalized() -> FlutterConfig {
    FlutterConfig {
        form: ReducedForm::Generalized,
        ..Default::default()
    }
}
