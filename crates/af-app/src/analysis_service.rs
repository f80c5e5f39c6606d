//! Analysis loading, saving and validation.

use af_project::Analysis;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Load an analysis file (YAML, or JSON by extension) and validate it.
pub fn load_analysis(path: &Path) -> AppResult<Analysis> {
    if !path.exists() {
        return Err(AppError::AnalysisFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(af_project::load(path)?)
}

pub fn save_analysis(path: &Path, analysis: &Analysis) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => af_project::save_json(path, analysis)?,
        _ => af_project::save_yaml(path, analysis)?,
    }
    Ok(())
}

pub fn validate_analysis(analysis: &Analysis) -> AppResult<()> {
    af_project::validate_analysis(analysis).map_err(|e| AppError::Validation(e.to_string()))
}
