//! Validate command implementation.
//!
//! The `provision validate` command loads the config file, overlays secrets
//! from the environment, and reports every problem at once.

use std::path::{Path, PathBuf};

use crate::config::response::{DBCA_RESPONSE, INSTALL_RESPONSE, WINDOWS_INSTALL_RESPONSE};
use crate::config::{load_template, render, validate_response_format, InstallConfig};
use crate::error::Result;
use crate::plan;
use crate::platform::PlatformKind;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::load::{load_checked, EXIT_CONFIG};

/// The validate command implementation.
pub struct ValidateCommand {
    config_path: PathBuf,
}

impl ValidateCommand {
    /// Create a new validate command.
    pub fn new(config_path: &Path) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
        }
    }
}

impl Command for ValidateCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = load_checked(&self.config_path, ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG));
        };

        let kind = config.target_platform();
        let checked = plan::build(&config, kind).and_then(|_| render_responses(&config, kind));
        if let Err(e) = checked {
            ui.error(&format!("{}: {}", self.config_path.display(), e));
            return Ok(CommandResult::failure(EXIT_CONFIG));
        }

        ui.success(&format!(
            "{} is valid ({} on {})",
            self.config_path.display(),
            config.database.sid,
            kind
        ));
        Ok(CommandResult::success())
    }
}

/// Render both response files in memory and check their line format.
fn render_responses(config: &InstallConfig, kind: PlatformKind) -> Result<()> {
    let install = match kind {
        PlatformKind::Linux => INSTALL_RESPONSE,
        PlatformKind::Windows => WINDOWS_INSTALL_RESPONSE,
    };
    let bindings = config.template_bindings();
    for (path, builtin) in [
        (config.templates.install_response.as_deref(), install),
        (config.templates.dbca_response.as_deref(), DBCA_RESPONSE),
    ] {
        let text = render(&load_template(path, builtin)?, &bindings)?;
        validate_response_format(&text)?;
    }
    Ok(())
}
