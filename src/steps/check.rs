//! Precondition check results.

/// Outcome of a step's precondition check.
///
/// `complete` means the step's target state already holds and the runner
/// skips `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Whether the check passed (step is complete).
    pub complete: bool,

    /// Description of what was checked.
    pub description: String,

    /// Details about the check result.
    pub details: Option<String>,
}

impl CheckResult {
    /// Create a complete result.
    pub fn complete(description: impl Into<String>) -> Self {
        Self {
            complete: true,
            description: description.into(),
            details: None,
        }
    }

    /// Create an incomplete result.
    pub fn incomplete(description: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            complete: false,
            description: description.into(),
            details: Some(details.into()),
        }
    }

    /// Result for steps without a meaningful precondition.
    pub fn always_apply() -> Self {
        Self {
            complete: false,
            description: "No precondition".to_string(),
            details: None,
        }
    }

    /// Incomplete result for a check that could not read OS state.
    ///
    /// The following `apply` surfaces the real error.
    pub fn unknown(description: impl Into<String>, error: &crate::error::ProvisionError) -> Self {
        Self::incomplete(description, format!("Could not determine state: {}", error))
    }
}
