//! Interactive terminal UI.
//!
//! Each step gets a live spinner prefixed with its `[n/m]` position. While
//! an installer runs, its output either scrolls above the spinner
//! (`--verbose`) or its latest line trails the spinner message.

use std::io::Write;

use console::{measure_text_width, Term};
use indicatif::ProgressBar;

use crate::error::Result;
use crate::runner::RunReport;

use super::spinner::spinner_line;
use super::{
    prompt_user, resume_hint, should_use_colors, summary_lines, NonInteractiveUI, OutputMode,
    ProgressSpinner, Prompt, PromptResult, ProvisionTheme, SpinnerHandle, UserInterface,
};

/// Spinner of the step currently running.
struct ActiveStep {
    bar: ProgressBar,
    label: String,
}

/// Interactive terminal UI implementation.
pub struct TerminalUI {
    term: Term,
    theme: ProvisionTheme,
    mode: OutputMode,
    /// Position of the next step, consumed by the next spinner.
    position: Option<String>,
    active: Option<ActiveStep>,
}

impl TerminalUI {
    pub fn new(mode: OutputMode) -> Self {
        Self::with_colors(mode, should_use_colors())
    }

    pub fn with_colors(mode: OutputMode, colors: bool) -> Self {
        Self {
            term: Term::stdout(),
            theme: ProvisionTheme::for_colors(colors),
            mode,
            position: None,
            active: None,
        }
    }

    fn line(&self, text: impl std::fmt::Display) {
        let mut term = &self.term;
        writeln!(term, "{}", text).ok();
    }

    /// The running step's spinner, if it is still drawing.
    fn running(&self) -> Option<&ActiveStep> {
        self.active.as_ref().filter(|step| !step.bar.is_finished())
    }

    /// Label for a step spinner: `[3/15] extract-software`.
    fn step_label(&mut self, name: &str) -> String {
        match self.position.take() {
            Some(position) => format!("{} {}", self.theme.dim.apply_to(position), name),
            None => name.to_string(),
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn set_output_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    fn message(&mut self, msg: &str) {
        if self.mode.narrates() {
            self.line(msg);
        }
    }

    fn success(&mut self, msg: &str) {
        self.line(self.theme.format_success(msg));
    }

    fn warning(&mut self, msg: &str) {
        self.line(self.theme.format_warning(msg));
    }

    fn error(&mut self, msg: &str) {
        Term::stderr().write_line(&self.theme.format_error(msg)).ok();
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        prompt_user(prompt, &self.term)
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        let label = self.step_label(message);
        let spinner = ProgressSpinner::new(&label, self.theme.clone());
        self.active = Some(ActiveStep {
            bar: spinner.bar(),
            label,
        });
        Box::new(spinner)
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.narrates() {
            self.line(format_args!("\n{}\n", self.theme.format_header(title)));
        }
    }

    fn show_progress(&mut self, current: usize, total: usize) {
        if self.mode.counts_steps() {
            self.position = Some(format!("[{}/{}]", current, total));
        }
    }

    fn show_command_output(&mut self, line: &str) {
        let echo = self.mode.echoes_program_output();
        let Some(step) = self.running() else {
            if echo {
                self.line(format_args!("    {}", self.theme.command.apply_to(line)));
            }
            return;
        };

        if echo {
            step.bar
                .println(format!("    {}", self.theme.command.apply_to(line)));
        } else {
            let width = usize::from(self.term.size().1);
            let room = width.saturating_sub(measure_text_width(&step.label) + 16);
            if room > 8 {
                step.bar.set_message(format!(
                    "{}  {}",
                    step.label,
                    self.theme.dim.apply_to(spinner_line(line, room))
                ));
            }
        }
    }

    fn show_report(&mut self, report: &RunReport) {
        self.active = None;
        self.line("");
        for line in summary_lines(report, &self.theme) {
            self.line(line);
        }
        if let Some(hint) = resume_hint(report) {
            self.line(format_args!("  {}", self.theme.hint.apply_to(hint)));
        }
    }

    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }
}

/// Pick the UI for this invocation: the terminal UI when interactive and
/// attached to a TTY, the plain line UI otherwise.
pub fn create_ui(interactive: bool, mode: OutputMode, no_color: bool) -> Box<dyn UserInterface> {
    if interactive && Term::stdout().is_term() {
        Box::new(TerminalUI::with_colors(mode, !no_color && should_use_colors()))
    } else {
        Box::new(NonInteractiveUI::new(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_label_carries_step_position_once() {
        let mut ui = TerminalUI::with_colors(OutputMode::Normal, false);
        ui.show_progress(3, 15);

        assert_eq!(ui.step_label("extract-software"), "[3/15] extract-software");
        assert_eq!(ui.step_label("render-install-response"), "render-install-response");
    }

    #[test]
    fn quiet_mode_drops_step_position() {
        let mut ui = TerminalUI::with_colors(OutputMode::Quiet, false);
        ui.show_progress(1, 15);
        assert_eq!(ui.step_label("create-account"), "create-account");
    }

    #[test]
    fn finished_spinner_is_not_running() {
        let mut ui = TerminalUI::with_colors(OutputMode::Normal, false);
        let mut spinner = ui.start_spinner("run-root-script");
        assert!(ui.running().is_some());

        spinner.finish_success("run-root-script");
        assert!(ui.running().is_none());
        ui.show_command_output("late output is dropped");
    }

    #[test]
    fn create_ui_non_interactive() {
        let ui = create_ui(false, OutputMode::Quiet, true);
        assert!(!ui.is_interactive());
        assert_eq!(ui.output_mode(), OutputMode::Quiet);
    }
}
