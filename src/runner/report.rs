//! Run reports.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};
use crate::steps::{StepResult, StepStatus};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step was skipped or succeeded.
    Completed,
    /// The named step failed; later steps never ran.
    Failed { step: String },
    /// Cancellation was requested.
    Cancelled,
}

/// Ordered results of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<StepResult>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// The failing step's result, if the run failed.
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.results.iter().find(|r| r.is_failed())
    }

    /// Number of results with the given status.
    pub fn count(&self, status: StepStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Result for a step name.
    pub fn result(&self, name: &str) -> Option<&StepResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Total wall-clock time.
    pub fn duration(&self) -> std::time::Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Completed => 0,
            RunOutcome::Failed { .. } => 1,
            RunOutcome::Cancelled => 130,
        }
    }

    /// Write the report as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ProvisionError::Other(e.into()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;
        }
        fs::write(path, json).map_err(|e| ProvisionError::io(path, e))
    }

    /// Read a report written by [`RunReport::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ProvisionError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| ProvisionError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
