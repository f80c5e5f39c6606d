//! Eigenpairs, root sets and the flutter root.

use crate::basis::ModalBasis;
use crate::error::{FlutterError, FlutterResult};
use af_core::ParamId;
use nalgebra::{Complex, DMatrix, DVector};

/// Complex scalar used for eigenvalues and eigenvectors.
pub type C64 = Complex<f64>;

/// Lift a real matrix to complex entries.
pub(crate) fn complexify(m: &DMatrix<f64>) -> DMatrix<C64> {
    m.map(|v| C64::new(v, 0.0))
}

/// Eigenvalue `λ = σ + iω` with its right (and optionally left) eigenvector
/// in reduced coordinates.
///
/// Right vectors satisfy `xᵀ B x = 1`; left vectors satisfy `yᵀ B x = 1`.
#[derive(Debug, Clone)]
pub struct EigenPair {
    pub value: C64,
    pub right: DVector<C64>,
    pub left: Option<DVector<C64>>,
}

impl EigenPair {
    /// Real part: positive means the mode grows.
    pub fn growth_rate(&self) -> f64 {
        self.value.re
    }

    /// Imaginary part (rad/s for a state-space form).
    pub fn frequency(&self) -> f64 {
        self.value.im
    }

    /// `|xᵀ B x − 1|`.
    pub fn normalization_error(&self, b: &DMatrix<f64>) -> f64 {
        let bx = complexify(b) * &self.right;
        (self.right.dot(&bx) - C64::new(1.0, 0.0)).norm()
    }
}

/// All eigenpairs found at one velocity, plus the `B` they were normalized
/// against.
#[derive(Debug, Clone)]
pub struct RootSet {
    pub velocity: f64,
    pub pairs: Vec<EigenPair>,
    pub b: DMatrix<f64>,
}

impl RootSet {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EigenPair> {
        self.pairs.iter()
    }

    pub fn max_growth_rate(&self) -> Option<f64> {
        self.pairs
            .iter()
            .map(EigenPair::growth_rate)
            .max_by(|a, b| a.total_cmp(b))
    }
}

/// A sample that could not be evaluated.
#[derive(Debug, Clone)]
pub struct FailedSample {
    pub velocity: f64,
    pub reason: String,
}

/// Root sets gathered during one search: the coarse sweep (used for
/// tracking) and the refinement evaluations (kept for reporting).
#[derive(Debug, Clone, Default)]
pub struct RootHistory {
    sweep: Vec<RootSet>,
    refinement: Vec<RootSet>,
    failures: Vec<FailedSample>,
}

impl RootHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sweep sample keeping velocity order.
    pub fn push_sweep(&mut self, set: RootSet) {
        let at = self
            .sweep
            .partition_point(|s| s.velocity <= set.velocity);
        self.sweep.insert(at, set);
    }

    pub fn push_refinement(&mut self, set: RootSet) {
        self.refinement.push(set);
    }

    pub fn record_failure(&mut self, velocity: f64, reason: impl Into<String>) {
        self.failures.push(FailedSample {
            velocity,
            reason: reason.into(),
        });
    }

    pub fn sweep(&self) -> &[RootSet] {
        &self.sweep
    }

    pub fn refinement(&self) -> &[RootSet] {
        &self.refinement
    }

    pub fn failures(&self) -> &[FailedSample] {
        &self.failures
    }

    /// True when a failed sample lies strictly inside `(lower, upper)`.
    pub fn has_failure_between(&self, lower: f64, upper: f64) -> bool {
        self.failures
            .iter()
            .any(|f| f.velocity > lower && f.velocity < upper)
    }

    /// Every evaluated root set, sweep first.
    pub fn all_sets(&self) -> impl Iterator<Item = &RootSet> {
        self.sweep.iter().chain(self.refinement.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.sweep.is_empty() && self.refinement.is_empty()
    }
}

/// Where `∂(real λ)/∂V` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeSource {
    Analytic,
    FiniteDifference,
}

/// Sensitivity of the critical root to one parameter.
#[derive(Debug, Clone)]
pub struct RootSensitivity {
    pub param: ParamId,
    pub name: String,
    /// `dλ/dp`
    pub eigenvalue: C64,
    /// `∂(real λ)/∂V` used in the implicit differentiation
    pub growth_slope: f64,
    pub slope_source: SlopeSource,
    /// `dV*/dp`
    pub velocity: f64,
}

/// The critical eigenpair at the flutter velocity `V*`.
#[derive(Debug, Clone)]
pub struct FlutterRoot {
    pub velocity: f64,
    pub pair: EigenPair,
    /// Reduced `B` at `V*`.
    pub b: DMatrix<f64>,
    /// Index of the tracked mode in the coarse sweep.
    pub mode: usize,
    pub converged: bool,
    pub iterations: usize,
    /// Final bisection bracket.
    pub bracket: (f64, f64),
    /// Finite-difference `∂(real λ)/∂V` across the final bracket.
    pub growth_slope: Option<f64>,
    pub velocity_param: ParamId,
    /// Parameters the root may be differentiated against.
    pub parameters: Vec<ParamId>,
    pub sensitivities: Vec<RootSensitivity>,
    pub(crate) generation: u64,
}

impl FlutterRoot {
    pub fn growth_rate(&self) -> f64 {
        self.pair.growth_rate()
    }

    pub fn frequency(&self) -> f64 {
        self.pair.frequency()
    }

    pub fn sensitivity(&self, param: ParamId) -> Option<&RootSensitivity> {
        self.sensitivities.iter().find(|s| s.param == param)
    }

    /// Complex flutter mode on the full structural dofs.
    ///
    /// A state-space eigenvector `[q, λq]` contributes its displacement
    /// block; a generalized one is used as is.
    pub fn mode_shape(&self, basis: &ModalBasis) -> FlutterResult<DVector<C64>> {
        let m = basis.len();
        let right = &self.pair.right;
        if right.len() == 2 * m {
            basis.expand(&right.rows(0, m).into_owned())
        } else if right.len() == m {
            basis.expand(right)
        } else {
            Err(FlutterError::DimensionMismatch {
                what: "flutter eigenvector length",
                expected: m,
                found: right.len(),
            })
        }
    }

    pub(crate) fn record_sensitivity(&mut self, sensitivity: RootSensitivity) {
        match self
            .sensitivities
            .iter_mut()
            .find(|s| s.param == sensitivity.param)
        {
            Some(existing) => *existing = sensitivity,
            None => self.sensitivities.push(sensitivity),
        }
    }
}
