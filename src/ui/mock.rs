//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion. It can be configured with
//! pre-determined prompt responses.
//!
//! # Example
//!
//! ```
//! use provision::ui::{MockUI, Prompt, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.set_prompt_response("sys-password", "SysPass1x");
//!
//! let answer = ui.prompt(&Prompt::password("sys-password", "SYS password")).unwrap();
//! assert_eq!(answer.as_string(), "SysPass1x");
//!
//! ui.success("Done");
//! assert!(ui.has_success("Done"));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;
use crate::runner::RunReport;

use super::{OutputMode, Prompt, PromptResult, PromptType, SpinnerHandle, UserInterface};

/// Records every interaction instead of drawing anything.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    interactive: bool,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    progress: Vec<(usize, usize)>,
    spinners: Vec<String>,
    command_output: Vec<String>,
    reports: Vec<RunReport>,
    prompt_responses: HashMap<String, String>,
    prompts_shown: Vec<String>,
    spinner_results: Rc<RefCell<Vec<(SpinnerStatus, String)>>>,
}

/// How a mock spinner finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerStatus {
    Success,
    Error,
    Skipped,
}

impl MockUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Answer prompts with this key using `response`.
    pub fn set_prompt_response(&mut self, key: &str, response: &str) {
        self.prompt_responses
            .insert(key.to_string(), response.to_string());
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn progress(&self) -> &[(usize, usize)] {
        &self.progress
    }

    /// Messages spinners were started with.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// How each spinner finished, in order.
    pub fn spinner_results(&self) -> Vec<(SpinnerStatus, String)> {
        self.spinner_results.borrow().clone()
    }

    pub fn command_output(&self) -> &[String] {
        &self.command_output
    }

    pub fn reports(&self) -> &[RunReport] {
        &self.reports
    }

    /// Keys of prompts that were shown.
    pub fn prompts_shown(&self) -> &[String] {
        &self.prompts_shown
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.successes.iter().any(|m| m.contains(msg))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn set_output_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        self.prompts_shown.push(prompt.key.clone());

        let answer = self
            .prompt_responses
            .get(&prompt.key)
            .or(prompt.default.as_ref())
            .cloned()
            .unwrap_or_default();

        Ok(match prompt.prompt_type {
            PromptType::Confirm => PromptResult::Bool(super::prompts::parse_yes(&answer)),
            _ => PromptResult::String(answer),
        })
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner {
            messages: Vec::new(),
            results: Rc::clone(&self.spinner_results),
        })
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn show_progress(&mut self, current: usize, total: usize) {
        self.progress.push((current, total));
    }

    fn show_command_output(&mut self, line: &str) {
        self.command_output.push(line.to_string());
    }

    fn show_report(&mut self, report: &RunReport) {
        self.reports.push(report.clone());
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// Spinner that reports its outcome back to the [`MockUI`] that made it.
#[derive(Debug)]
pub struct MockSpinner {
    messages: Vec<String>,
    results: Rc<RefCell<Vec<(SpinnerStatus, String)>>>,
}

impl MockSpinner {
    /// Messages set while spinning.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    fn finish(&mut self, status: SpinnerStatus, msg: &str) {
        self.results.borrow_mut().push((status, msg.to_string()));
    }
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        self.finish(SpinnerStatus::Success, msg);
    }

    fn finish_error(&mut self, msg: &str) {
        self.finish(SpinnerStatus::Error, msg);
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.finish(SpinnerStatus::Skipped, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_messages() {
        let mut ui = MockUI::new();
        ui.message("hello");
        ui.warning("careful");
        ui.error("broken");
        assert!(ui.has_message("hello"));
        assert!(ui.has_warning("care"));
        assert!(ui.has_error("broken"));
    }

    #[test]
    fn prompt_prefers_configured_response() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("sid", "PROD");
        let prompt = Prompt {
            key: "sid".into(),
            question: "SID?".into(),
            prompt_type: PromptType::Input,
            default: Some("ORCL".into()),
        };
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "PROD");
        assert_eq!(ui.prompts_shown(), ["sid"]);
    }

    #[test]
    fn confirm_falls_back_to_default() {
        let mut ui = MockUI::new();
        let answer = ui.prompt(&Prompt::confirm("go", "Go?", true)).unwrap();
        assert_eq!(answer, PromptResult::Bool(true));
    }

    #[test]
    fn spinner_outcomes_are_recorded() {
        let mut ui = MockUI::new();
        let mut spinner = ui.start_spinner("create-account");
        spinner.set_message("creating");
        spinner.finish_success("create-account");
        ui.start_spinner("extract-software")
            .finish_error("extract-software");

        assert_eq!(
            ui.spinner_results(),
            vec![
                (SpinnerStatus::Success, "create-account".to_string()),
                (SpinnerStatus::Error, "extract-software".to_string()),
            ]
        );
    }
}
