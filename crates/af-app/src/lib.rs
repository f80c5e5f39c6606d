//! Shared application service layer for the flutter tools.
//!
//! Loads analysis files, builds sessions, runs searches with progress and
//! a wall-clock budget, and caches results.

pub mod analysis_service;
pub mod error;
pub mod progress;
pub mod run_service;
pub mod session;

pub use analysis_service::{load_analysis, save_analysis, validate_analysis};
pub use error::{AppError, AppResult};
pub use progress::{RefineProgress, RunProgressEvent, RunStage, SweepProgress};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, ensure_run, ensure_run_with_progress, list_runs, load_run,
};
pub use session::{AnalysisSession, FlutterSolution, ModeSummary, panel_properties};
