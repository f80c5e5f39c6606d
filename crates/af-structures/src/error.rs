//! Error types for structural and aerodynamic operator assembly.

use af_core::error::AfError;
use af_flutter::FlutterError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StructureError {
    #[error("Invalid geometry: {what}")]
    InvalidGeometry { what: String },

    #[error("Invalid material: {what}")]
    InvalidMaterial { what: String },

    #[error("Invalid flow condition: {what}")]
    InvalidFlow { what: String },

    #[error("Modal solve failed: {what}")]
    ModalFailure { what: String },

    #[error("Core error: {0}")]
    Core(#[from] AfError),
}

pub type StructureResult<T> = Result<T, StructureError>;

impl From<StructureError> for FlutterError {
    fn from(e: StructureError) -> Self {
        match e {
            StructureError::ModalFailure { what } => FlutterError::EigensolveFailure {
                velocity: 0.0,
                what,
            },
            StructureError::Core(e) => FlutterError::Core(e),
            other => FlutterError::AssemblyFailure {
                what: other.to_string(),
            },
        }
    }
}
