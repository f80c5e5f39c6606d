//! Collaborator contracts and reduced-operator construction.
//!
//! Full-order operators come from an external [`OperatorAssembler`]; the
//! [`ReducedOperatorBuilder`] projects them onto a [`ModalBasis`] to form the
//! small pair `(A(V), B(V))` of the eigenproblem `A x = λ B x`.

use crate::basis::ModalBasis;
use crate::error::{FlutterError, FlutterResult};
use af_core::{ParamId, ParameterSet};
use nalgebra::DMatrix;

/// Full-order structural/aerodynamic operators at one velocity.
///
/// For a second-order system `M q̈ + C q̇ + K q = 0` the fields carry
/// `K`, `M` and `C`. Sensitivity calls return the derivatives of the same
/// fields.
#[derive(Debug, Clone)]
pub struct FullOrderOperators {
    pub stiffness: DMatrix<f64>,
    pub mass: DMatrix<f64>,
    pub damping: Option<DMatrix<f64>>,
}

impl FullOrderOperators {
    pub fn zeros(ndofs: usize) -> Self {
        Self {
            stiffness: DMatrix::zeros(ndofs, ndofs),
            mass: DMatrix::zeros(ndofs, ndofs),
            damping: None,
        }
    }
}

/// Builds full-order operators for a given parameter state and velocity.
///
/// Implementations must be deterministic so that independent velocity
/// samples can be evaluated from several threads.
pub trait OperatorAssembler: Send + Sync {
    /// Assembler name for logs.
    fn name(&self) -> &str;

    /// Operators at `velocity` with all other parameters taken from `params`.
    fn assemble(&self, params: &ParameterSet, velocity: f64) -> FlutterResult<FullOrderOperators>;

    /// Partial derivatives of the operators with respect to `param`.
    fn assemble_sensitivity(
        &self,
        params: &ParameterSet,
        param: ParamId,
        velocity: f64,
    ) -> FlutterResult<FullOrderOperators>;

    /// Analytic derivatives with respect to velocity, when the aerodynamic
    /// model provides them.
    fn assemble_velocity_sensitivity(
        &self,
        _params: &ParameterSet,
        _velocity: f64,
    ) -> FlutterResult<Option<FullOrderOperators>> {
        Ok(None)
    }
}

/// Produces the structural modal basis consumed by the flutter search.
pub trait ModalSolver {
    fn solve_modes(&self, params: &ParameterSet, count: usize) -> FlutterResult<ModalBasis>;
}

/// How the projected operators are arranged into `(A, B)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReducedForm {
    /// `A = ΦᵀKΦ`, `B = ΦᵀMΦ`, size `n`.
    Generalized,
    /// First-order form of `M q̈ + C q̇ + K q = 0`, size `2n`:
    /// `A = [[0, I], [-K, -C]]`, `B = [[I, 0], [0, M]]`.
    #[default]
    StateSpace,
}

impl ReducedForm {
    /// Dimension of the reduced pair for a basis of `n` modes.
    pub fn dimension(self, n: usize) -> usize {
        match self {
            Self::Generalized => n,
            Self::StateSpace => 2 * n,
        }
    }
}

/// The small square matrices `(A(V), B(V))`, or their derivatives.
#[derive(Debug, Clone)]
pub struct ReducedOperatorPair {
    pub velocity: f64,
    pub a: DMatrix<f64>,
    pub b: DMatrix<f64>,
}

impl ReducedOperatorPair {
    pub fn dimension(&self) -> usize {
        self.a.nrows()
    }

    fn check_finite(&self) -> FlutterResult<()> {
        if self.a.iter().chain(self.b.iter()).all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(FlutterError::assembly(format!(
                "reduced operators contain non-finite entries at V = {}",
                self.velocity
            )))
        }
    }
}

/// Projects assembler output onto a fixed modal basis.
///
/// Holds no state between calls: every result is a pure function of the
/// velocity, the parameter values and the basis.
pub struct ReducedOperatorBuilder<'a, A: OperatorAssembler + ?Sized> {
    assembler: &'a A,
    params: &'a ParameterSet,
    basis: &'a ModalBasis,
    form: ReducedForm,
}

impl<'a, A: OperatorAssembler + ?Sized> ReducedOperatorBuilder<'a, A> {
    pub fn new(
        assembler: &'a A,
        params: &'a ParameterSet,
        basis: &'a ModalBasis,
        form: ReducedForm,
    ) -> Self {
        Self {
            assembler,
            params,
            basis,
            form,
        }
    }

    pub fn form(&self) -> ReducedForm {
        self.form
    }

    pub fn dimension(&self) -> usize {
        self.form.dimension(self.basis.len())
    }

    /// `(A(V), B(V))`.
    pub fn build(&self, velocity: f64) -> FlutterResult<ReducedOperatorPair> {
        let full = self.assembler.assemble(self.params, velocity)?;
        let pair = self.reduce(&full, velocity, false)?;
        pair.check_finite()?;
        Ok(pair)
    }

    /// `(dA/dp, dB/dp)` at `velocity`, projected onto the same basis.
    pub fn build_sensitivity(
        &self,
        param: ParamId,
        velocity: f64,
    ) -> FlutterResult<ReducedOperatorPair> {
        let full = self
            .assembler
            .assemble_sensitivity(self.params, param, velocity)?;
        let pair = self.reduce(&full, velocity, true)?;
        pair.check_finite()?;
        Ok(pair)
    }

    /// `(dA/dV, dB/dV)` when the assembler differentiates in velocity.
    pub fn build_velocity_sensitivity(
        &self,
        velocity: f64,
    ) -> FlutterResult<Option<ReducedOperatorPair>> {
        match self
            .assembler
            .assemble_velocity_sensitivity(self.params, velocity)?
        {
            Some(full) => {
                let pair = self.reduce(&full, velocity, true)?;
                pair.check_finite()?;
                Ok(Some(pair))
            }
            None => Ok(None),
        }
    }

    fn reduce(
        &self,
        full: &FullOrderOperators,
        velocity: f64,
        derivative: bool,
    ) -> FlutterResult<ReducedOperatorPair> {
        let k = self.basis.project(&full.stiffness)?;
        let m = self.basis.project(&full.mass)?;

        match self.form {
            ReducedForm::Generalized => Ok(ReducedOperatorPair { velocity, a: k, b: m }),
            ReducedForm::StateSpace => {
                let n = self.basis.len();
                let c = match &full.damping {
                    Some(damping) => self.basis.project(damping)?,
                    None => DMatrix::zeros(n, n),
                };

                let mut a = DMatrix::zeros(2 * n, 2 * n);
                let mut b = DMatrix::zeros(2 * n, 2 * n);

                // The identity blocks are constant, so they vanish in derivatives.
                if !derivative {
                    a.view_mut((0, n), (n, n)).fill_with_identity();
                    b.view_mut((0, 0), (n, n)).fill_with_identity();
                }
                a.view_mut((n, 0), (n, n)).copy_from(&(-k));
                a.view_mut((n, n), (n, n)).copy_from(&(-c));
                b.view_mut((n, n), (n, n)).copy_from(&m);

                Ok(ReducedOperatorPair { velocity, a, b })
            }
        }
    }
}
