//! Run storage API.
//!
//! ```text
//! <root>/<run_id>/manifest.json
//!                /roots.jsonl
//!                /flutter.json        (only when a root was found)
//!                /flutter_mode.json   (with flutter.json)
//!                /sorted_roots.txt
//! ```

use crate::types::{FlutterModeRecord, FlutterRecord, RootRecord, RunArtifacts, RunManifest};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store next to an analysis file, under `.flutter/runs`.
    pub fn for_analysis(analysis_path: &Path) -> ResultsResult<Self> {
        let dir = analysis_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "analysis path has no parent directory".to_string(),
            })?;
        Self::new(dir.join(".flutter").join("runs"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, artifacts: &RunArtifacts) -> ResultsResult<()> {
        let run_dir = self.run_dir(&artifacts.manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let mut roots_content = String::new();
        for record in &artifacts.roots {
            roots_content.push_str(&serde_json::to_string(record)?);
            roots_content.push('\n');
        }
        fs::write(run_dir.join("roots.jsonl"), roots_content)?;

        write_optional(&run_dir.join("flutter.json"), artifacts.flutter.as_ref())?;
        write_optional(&run_dir.join("flutter_mode.json"), artifacts.flutter_mode.as_ref())?;

        fs::write(run_dir.join("sorted_roots.txt"), &artifacts.sorted_roots)?;

        // Manifest last: its presence marks a complete run.
        let manifest_json = serde_json::to_string_pretty(&artifacts.manifest)?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;

        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_roots(&self, run_id: &str) -> ResultsResult<Vec<RootRecord>> {
        let path = self.run_dir(run_id).join("roots.jsonl");
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(line)?);
            }
        }
        Ok(records)
    }

    /// `None` when the run found no crossing.
    pub fn load_flutter(&self, run_id: &str) -> ResultsResult<Option<FlutterRecord>> {
        self.load_optional(run_id, "flutter.json")
    }

    /// `None` when the run found no crossing.
    pub fn load_flutter_mode(&self, run_id: &str) -> ResultsResult<Option<FlutterModeRecord>> {
        self.load_optional(run_id, "flutter_mode.json")
    }

    fn load_optional<T: serde::de::DeserializeOwned>(
        &self,
        run_id: &str,
        file: &str,
    ) -> ResultsResult<Option<T>> {
        if !self.has_run(run_id) {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let path = self.run_dir(run_id).join(file);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn load_sorted_roots(&self, run_id: &str) -> ResultsResult<String> {
        let path = self.run_dir(run_id).join("sorted_roots.txt");
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(fs::read_to_string(path)?)
    }

    pub fn load_run(&self, run_id: &str) -> ResultsResult<RunArtifacts> {
        Ok(RunArtifacts {
            manifest: self.load_manifest(run_id)?,
            roots: self.load_roots(run_id)?,
            flutter: self.load_flutter(run_id)?,
            flutter_mode: self.load_flutter_mode(run_id)?,
            sorted_roots: self.load_sorted_roots(run_id)?,
        })
    }

    /// Runs of one analysis, oldest first.
    pub fn list_runs(&self, analysis_name: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.analysis_name == analysis_name
                {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}

/// Write `value` as pretty JSON, or remove a stale file when absent.
fn write_optional<T: serde::Serialize>(path: &Path, value: Option<&T>) -> ResultsResult<()> {
    match value {
        Some(v) => fs::write(path, serde_json::to_string_pretty(v)?)?,
        None if path.exists() => fs::remove_file(path)?,
        None => {}
    }
    Ok(())
}
