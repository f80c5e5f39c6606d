//! Error types for the af-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Failed to read analysis file: {path}")]
    AnalysisFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Analysis validation failed: {0}")]
    Validation(String),

    #[error("Structural model error: {0}")]
    Structure(String),

    #[error("Flutter search error: {0}")]
    Flutter(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Run exceeded its wall-clock budget of {budget_s} s")]
    BudgetExceeded { budget_s: f64 },

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for af-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<af_project::ProjectError> for AppError {
    fn from(err: af_project::ProjectError) -> Self {
        match err {
            af_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Analysis(other.to_string()),
        }
    }
}

impl From<af_structures::StructureError> for AppError {
    fn from(err: af_structures::StructureError) -> Self {
        AppError::Structure(err.to_string())
    }
}

impl From<af_flutter::FlutterError> for AppError {
    fn from(err: af_flutter::FlutterError) -> Self {
        match err {
            af_flutter::FlutterError::Cancelled => AppError::Cancelled,
            other => AppError::Flutter(other.to_string()),
        }
    }
}

impl From<af_core::AfError> for AppError {
    fn from(err: af_core::AfError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<af_results::ResultsError> for AppError {
    fn from(err: af_results::ResultsError) -> Self {
        match err {
            af_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
