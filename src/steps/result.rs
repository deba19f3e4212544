//! Step result model.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ProvisionError};

/// Final status of one step in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Precondition already held; `apply` was not called.
    Skipped,

    /// `apply` ran and succeeded.
    Succeeded,

    /// `apply` ran and failed. The run stops here.
    Failed,
}

impl StepStatus {
    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Skipped => '○',
            StepStatus::Succeeded => '✓',
            StepStatus::Failed => '✗',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Skipped => "skipped",
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
        }
    }
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// What a successful `apply` reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Exit code of the external process the step ran, if any.
    pub exit_code: Option<i32>,

    /// Short human-readable note about what changed.
    pub detail: Option<String>,
}

impl Applied {
    pub fn detail(detail: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            detail: Some(detail.into()),
        }
    }

    pub fn exit_code(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            detail: None,
        }
    }
}

/// Result of executing a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name.
    pub name: String,

    pub status: StepStatus,

    /// Error category and message (if failed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,

    /// Exit code (if a process was run).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Check description for skipped steps, change note for applied ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Execution duration.
    #[serde(with = "duration_millis")]
    pub duration: Duration,

    /// When the step finished.
    pub timestamp: DateTime<Utc>,
}

impl StepResult {
    /// Create a skipped result.
    pub fn skipped(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Skipped,
            failure: None,
            exit_code: None,
            detail: Some(reason.into()),
            duration: Duration::ZERO,
            timestamp: Utc::now(),
        }
    }

    /// Create a success result.
    pub fn succeeded(name: &str, applied: Applied, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Succeeded,
            failure: None,
            exit_code: applied.exit_code,
            detail: applied.detail,
            duration,
            timestamp: Utc::now(),
        }
    }

    /// Create a failure result. `message` is expected to be masked already.
    pub fn failed(
        name: &str,
        error: &ProvisionError,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Failed,
            failure: Some(StepFailure {
                kind: error.kind(),
                message: message.into(),
            }),
            exit_code: error.exit_code(),
            detail: None,
            duration,
            timestamp: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }

    /// Error category, if the step failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.failure.as_ref().map(|f| f.kind)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
