//! User interface components.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for interactive terminal usage
//! - [`NonInteractiveUI`] for CI/headless environments
//! - [`MockUI`] for tests
//! - Prompts, spinners, and the end-of-run summary
//!
//! # Example
//!
//! ```
//! use provision::ui::{create_ui, OutputMode};
//!
//! let mut ui = create_ui(false, OutputMode::Quiet, false);
//! ui.show_header("provision");
//! ui.success("Provisioning complete");
//! ```

pub mod mock;
pub mod non_interactive;
pub mod output;
pub mod progress;
pub mod prompts;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use mock::{MockSpinner, MockUI, SpinnerStatus};
pub use non_interactive::NonInteractiveUI;
pub use output::OutputMode;
pub use progress::{format_duration, outcome_line, resume_hint, summary_lines};
pub use prompts::prompt_user;
pub use spinner::ProgressSpinner;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, ProvisionTheme};

use crate::error::Result;
use crate::runner::RunReport;

/// Operator-facing output and input.
pub trait UserInterface {
    fn output_mode(&self) -> OutputMode;

    fn set_output_mode(&mut self, mode: OutputMode);

    fn message(&mut self, msg: &str);

    fn success(&mut self, msg: &str);

    fn warning(&mut self, msg: &str);

    /// Errors are shown in every output mode.
    fn error(&mut self, msg: &str);

    /// Ask the operator for a value.
    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult>;

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    fn show_header(&mut self, title: &str);

    /// Show a step counter such as `[3/15]`.
    fn show_progress(&mut self, current: usize, total: usize);

    /// Echo one line of external program output (verbose mode).
    fn show_command_output(&mut self, line: &str);

    /// Show the end-of-run summary.
    fn show_report(&mut self, report: &RunReport);

    fn is_interactive(&self) -> bool;
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    fn set_message(&mut self, msg: &str);

    fn finish_success(&mut self, msg: &str);

    fn finish_error(&mut self, msg: &str);

    fn finish_skipped(&mut self, msg: &str);
}

/// A question for the operator.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Stable key, used for `PROVISION_PROMPT_<KEY>` overrides.
    pub key: String,
    pub question: String,
    pub prompt_type: PromptType,
    /// Answer used when the operator just presses enter.
    pub default: Option<String>,
}

impl Prompt {
    /// A hidden password prompt.
    pub fn password(key: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            question: question.into(),
            prompt_type: PromptType::Password { confirm: true },
            default: None,
        }
    }

    pub fn confirm(key: impl Into<String>, question: impl Into<String>, default: bool) -> Self {
        Self {
            key: key.into(),
            question: question.into(),
            prompt_type: PromptType::Confirm,
            default: Some(default.to_string()),
        }
    }

    /// Environment variable that answers this prompt without a terminal.
    pub fn env_key(&self) -> String {
        format!("PROVISION_PROMPT_{}", self.key.to_uppercase().replace('-', "_"))
    }
}

/// The type of prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptType {
    /// Yes/no confirmation.
    Confirm,
    /// Free-form text input.
    Input,
    /// Hidden input, optionally entered twice.
    Password { confirm: bool },
}

/// Answer to a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResult {
    Bool(bool),
    String(String),
}

impl PromptResult {
    pub fn as_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::String(s) => s.clone(),
        }
    }

    /// Boolean answer; string answers are read as yes/no.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::String(s) => prompts::parse_yes(s),
        }
    }
}
