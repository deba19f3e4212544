//! Progress spinners.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::theme::ProvisionTheme;
use super::SpinnerHandle;

/// A spinner shown while a step runs.
pub struct ProgressSpinner {
    bar: ProgressBar,
    theme: ProvisionTheme,
}

impl ProgressSpinner {
    pub fn new(message: &str, theme: ProvisionTheme) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar, theme }
    }

    /// A spinner that draws nothing.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            theme: ProvisionTheme::plain(),
        }
    }

    /// Shared handle to the underlying bar, for drawing around the spinner.
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }

    fn finish(&mut self, text: String) {
        self.bar.set_style(plain_style());
        self.bar.finish_with_message(text);
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn plain_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl SpinnerHandle for ProgressSpinner {
    fn set_message(&mut self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        let text = self.theme.format_success(msg);
        self.finish(text);
    }

    fn finish_error(&mut self, msg: &str) {
        let text = self.theme.format_error(msg);
        self.finish(text);
    }

    fn finish_skipped(&mut self, msg: &str) {
        let text = self.theme.format_skipped(msg);
        self.finish(text);
    }
}

/// Trim a streamed output line so it fits on the spinner line.
pub fn spinner_line(text: &str, width: usize) -> String {
    let text = text.trim_end();
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
