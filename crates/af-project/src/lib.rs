//! af-project: analysis definition file format and validation.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, free_dofs, validate_analysis};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &std::path::Path) -> ProjectResult<Analysis> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        _ => load_yaml(path),
    }
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<Analysis> {
    let content = std::fs::read_to_string(path)?;
    let analysis: Analysis = serde_yaml::from_str(&content)?;
    validate_analysis(&analysis)?;
    Ok(analysis)
}

pub fn save_yaml(path: &std::path::Path, analysis: &Analysis) -> ProjectResult<()> {
    validate_analysis(analysis)?;
    let content = serde_yaml::to_string(analysis)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<Analysis> {
    let content = std::fs::read_to_string(path)?;
    let analysis: Analysis = serde_json::from_str(&content)?;
    validate_analysis(&analysis)?;
    Ok(analysis)
}

pub fn save_json(path: &std::path::Path, analysis: &Analysis) -> ProjectResult<()> {
    validate_analysis(analysis)?;
    let content = serde_json::to_string_pretty(analysis)?;
    std::fs::write(path, content)?;
    Ok(())
}
