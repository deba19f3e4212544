//! Visual theme and styling.

use console::Style;

use crate::steps::StepStatus;

/// Colors and glyphs for terminal output.
#[derive(Debug, Clone)]
pub struct ProvisionTheme {
    /// Success messages (green).
    pub success: Style,
    /// Warnings (orange).
    pub warning: Style,
    /// Errors (red bold).
    pub error: Style,
    /// Running elements (cyan).
    pub info: Style,
    /// Secondary text.
    pub dim: Style,
    pub highlight: Style,
    pub header: Style,
    /// Durations and timestamps (dim).
    pub duration: Style,
    /// Commands shown in output (dim italic).
    pub command: Style,
    /// Box-drawing borders (dim).
    pub border: Style,
    pub hint: Style,
}

impl Default for ProvisionTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisionTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().cyan(),
            duration: Style::new().dim(),
            command: Style::new().dim().italic(),
            border: Style::new().dim(),
            hint: Style::new().cyan().dim(),
        }
    }

    /// A theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            duration: Style::new(),
            command: Style::new(),
            border: Style::new(),
            hint: Style::new(),
        }
    }

    /// Colored theme unless colors are disabled.
    pub fn for_colors(colors: bool) -> Self {
        if colors {
            Self::new()
        } else {
            Self::plain()
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_skipped(&self, msg: &str) -> String {
        format!("{}", self.dim.apply_to(format!("○ {}", msg)))
    }

    /// Step name in bold followed by its description.
    pub fn format_step(&self, name: &str, description: &str) -> String {
        format!(
            "{} {}",
            self.highlight.apply_to(format!("◆ {}", name)),
            self.dim.apply_to(description)
        )
    }

    pub fn format_header(&self, title: &str) -> String {
        format!("{} {}", self.header.apply_to("▶"), self.highlight.apply_to(title))
    }

    /// Status glyph in the status color.
    pub fn status_icon(&self, status: StepStatus) -> String {
        let style = match status {
            StepStatus::Succeeded => &self.success,
            StepStatus::Skipped => &self.dim,
            StepStatus::Failed => &self.error,
        };
        style.apply_to(status.display_char()).to_string()
    }
}

/// Whether colors should be enabled.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    console::Term::stdout().is_term()
}
