//! Error types for flutter search operations.

use af_core::error::AfError;
use thiserror::Error;

/// Errors that can occur during a flutter search.
///
/// A sweep that finds no instability and a bisection that runs out of
/// iterations are not errors; see [`crate::SearchOutcome`].
#[derive(Error, Debug, Clone)]
pub enum FlutterError {
    #[error("Operator assembly failed: {what}")]
    AssemblyFailure { what: String },

    #[error("Eigensolve failed at V = {velocity}: {what}")]
    EigensolveFailure { velocity: f64, what: String },

    #[error(
        "Bisection lost track of the mode at V = {velocity} (best alignment {best_alignment:.3}, bracket [{lower}, {upper}])"
    )]
    BisectionDivergence {
        velocity: f64,
        best_alignment: f64,
        lower: f64,
        upper: f64,
    },

    #[error("Bisection aborted with bracket [{lower}, {upper}]: {source}")]
    BisectionAborted {
        lower: f64,
        upper: f64,
        #[source]
        source: Box<FlutterError>,
    },

    #[error("Stale flutter root: {what}")]
    StaleRoot { what: String },

    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Search cancelled by caller")]
    Cancelled,

    #[error("Core error: {0}")]
    Core(#[from] AfError),
}

pub type FlutterResult<T> = Result<T, FlutterError>;

impl FlutterError {
    pub fn assembly(what: impl Into<String>) -> Self {
        Self::AssemblyFailure { what: what.into() }
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidArg { what: what.into() }
    }

    /// True for failures that abandon one velocity sample only.
    pub fn is_per_sample(&self) -> bool {
        matches!(
            self,
            Self::AssemblyFailure { .. } | Self::EigensolveFailure { .. }
        )
    }
}
