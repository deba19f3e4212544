//! Non-interactive UI for CI/headless environments.

use std::collections::HashMap;

use crate::error::{ProvisionError, Result};
use crate::runner::RunReport;

use super::theme::ProvisionTheme;
use super::{
    resume_hint, summary_lines, OutputMode, Prompt, PromptResult, PromptType, SpinnerHandle, UserInterface,
};

/// Plain line-oriented UI.
///
/// Prompts are answered from `PROVISION_PROMPT_<KEY>` variables or the
/// prompt's default. Under CI the step counter is suppressed.
pub struct NonInteractiveUI {
    mode: OutputMode,
    env_overrides: HashMap<String, String>,
    is_ci: bool,
}

impl NonInteractiveUI {
    pub fn new(mode: OutputMode) -> Self {
        let env_overrides = std::env::vars()
            .filter(|(k, _)| k.starts_with("PROVISION_PROMPT_"))
            .collect();

        Self {
            mode,
            env_overrides,
            is_ci: crate::shell::is_ci(),
        }
    }

    /// Create with explicit overrides (for testing).
    pub fn with_overrides(mode: OutputMode, overrides: HashMap<String, String>) -> Self {
        Self {
            mode,
            env_overrides: overrides,
            is_ci: false,
        }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn set_output_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    fn message(&mut self, msg: &str) {
        if self.mode.narrates() {
            println!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        println!("✓ {}", msg);
    }

    fn warning(&mut self, msg: &str) {
        eprintln!("⚠ {}", msg);
    }

    fn error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        if let Some(value) = self.env_overrides.get(&prompt.env_key()) {
            return Ok(match prompt.prompt_type {
                PromptType::Confirm => PromptResult::Bool(super::prompts::parse_yes(value)),
                _ => PromptResult::String(value.clone()),
            });
        }

        let is_password = matches!(prompt.prompt_type, PromptType::Password { .. });
        match &prompt.default {
            Some(default) if !is_password => Ok(match prompt.prompt_type {
                PromptType::Confirm => PromptResult::Bool(super::prompts::parse_yes(default)),
                _ => PromptResult::String(default.clone()),
            }),
            _ => Err(ProvisionError::configuration(format!(
                "cannot prompt for '{}' in non-interactive mode (set {})",
                prompt.key,
                prompt.env_key()
            ))),
        }
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.narrates() {
            println!("  {}", message);
        }
        Box::new(LineSpinner {
            theme: ProvisionTheme::plain(),
        })
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.narrates() {
            println!("\n{}\n", title);
        }
    }

    fn show_progress(&mut self, current: usize, total: usize) {
        if !self.is_ci && self.mode.counts_steps() {
            println!("[{}/{}]", current, total);
        }
    }

    fn show_command_output(&mut self, line: &str) {
        if self.mode.echoes_program_output() {
            println!("    {}", line);
        }
    }

    fn show_report(&mut self, report: &RunReport) {
        println!();
        for line in summary_lines(report, &ProvisionTheme::plain()) {
            println!("{}", line);
        }
        if let Some(hint) = resume_hint(report) {
            println!("  {}", hint);
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner replacement that prints only the final status line.
struct LineSpinner {
    theme: ProvisionTheme,
}

impl SpinnerHandle for LineSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        println!("  {}", self.theme.format_success(msg));
    }

    fn finish_error(&mut self, msg: &str) {
        eprintln!("  {}", self.theme.format_error(msg));
    }

    fn finish_skipped(&mut self, msg: &str) {
        println!("  {}", self.theme.format_skipped(msg));
    }
}
