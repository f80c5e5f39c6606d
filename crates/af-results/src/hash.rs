//! Content-based hashing for run IDs.

use af_project::Analysis;
use sha2::{Digest, Sha256};

/// SHA-256 over the analysis definition and solver version.
///
/// `reference_velocity_mps` and `parallel_sweep` take part in the hash even
/// though a deterministic solve does not depend on them.
pub fn compute_run_id(analysis: &Analysis, solver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let analysis_json = serde_json::to_string(analysis).unwrap_or_default();
    hasher.update(analysis_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
