//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub analysis_name: String,
    pub timestamp: String,
    pub solver_version: String,
    pub outcome: RunOutcome,
    /// Parameters differentiated in this run
    #[serde(default)]
    pub sensitivity: Vec<String>,
    pub elapsed_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunOutcome {
    Converged,
    NotConverged,
    NoCrossingFound {
        samples: usize,
        failed_samples: usize,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Sweep,
    Refinement,
}

/// One evaluated eigenvalue; a line of `roots.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootRecord {
    pub phase: SearchPhase,
    pub velocity_mps: f64,
    /// Position in the root set at this velocity
    pub index: usize,
    pub growth_rate: f64,
    pub frequency_rad_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensitivityRecord {
    pub param: String,
    pub dv_dp: f64,
    pub dlambda_re: f64,
    pub dlambda_im: f64,
    pub growth_slope: f64,
    pub slope_source: String,
}

/// Critical root of a run; stored as `flutter.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlutterRecord {
    pub velocity_mps: f64,
    pub growth_rate: f64,
    pub frequency_rad_s: f64,
    pub frequency_hz: f64,
    pub mode: usize,
    pub converged: bool,
    pub iterations: usize,
    pub bracket_mps: (f64, f64),
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_slope: Option<f64>,
    #[serde(default)]
    pub sensitivities: Vec<SensitivityRecord>,
}

impl FlutterRecord {
    pub fn sensitivity(&self, param: &str) -> Option<&SensitivityRecord> {
        self.sensitivities.iter().find(|s| s.param == param)
    }
}

/// Complex flutter mode on the structural dofs; stored as
/// `flutter_mode.json`.
///
/// Scaled so the entry of largest magnitude is `1 + 0i`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlutterModeRecord {
    pub velocity_mps: f64,
    pub re: Vec<f64>,
    pub im: Vec<f64>,
}

impl FlutterModeRecord {
    pub fn len(&self) -> usize {
        self.re.len()
    }

    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    pub fn magnitude(&self, dof: usize) -> Option<f64> {
        Some(self.re.get(dof)?.hypot(*self.im.get(dof)?))
    }

    /// Phase in radians relative to the reference entry.
    pub fn phase(&self, dof: usize) -> Option<f64> {
        Some(self.im.get(dof)?.atan2(*self.re.get(dof)?))
    }
}

/// Everything a run writes to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RunArtifacts {
    pub manifest: RunManifest,
    pub roots: Vec<RootRecord>,
    pub flutter: Option<FlutterRecord>,
    pub flutter_mode: Option<FlutterModeRecord>,
    /// Contents of `sorted_roots.txt`
    pub sorted_roots: String,
}
