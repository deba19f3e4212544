//! Directory tree creation.

use std::fs;
use std::path::PathBuf;

use crate::error::{ProvisionError, Result};
use crate::steps::{Applied, CheckResult, Step, StepContext};

/// Ensure every listed directory exists, creating them in order.
#[derive(Debug, Clone)]
pub struct EnsureDirectory {
    name: String,
    paths: Vec<PathBuf>,
}

impl EnsureDirectory {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            name: "ensure-directories".to_string(),
            paths,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Step for EnsureDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        let paths: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        format!("Create directories {}", paths.join(", "))
    }

    fn check(&self, _ctx: &StepContext<'_>) -> CheckResult {
        let missing: Vec<String> = self
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .map(|p| p.display().to_string())
            .collect();

        if missing.is_empty() {
            CheckResult::complete(format!("All {} directories exist", self.paths.len()))
        } else {
            CheckResult::incomplete(
                format!("{} directories missing", missing.len()),
                missing.join(", "),
            )
        }
    }

    fn apply(&self, _ctx: &StepContext<'_>) -> Result<Applied> {
        let mut created = 0;
        for path in &self.paths {
            if path.is_dir() {
                continue;
            }
            if path.exists() {
                return Err(ProvisionError::io(
                    path,
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "exists and is not a directory",
                    ),
                ));
            }
            fs::create_dir_all(path).map_err(|e| ProvisionError::io(path, e))?;
            tracing::debug!("Created {}", path.display());
            created += 1;
        }
        Ok(Applied::detail(format!("created {} directories", created)))
    }
}
