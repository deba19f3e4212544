//! Config loading shared by the commands that need a config file.

use std::path::Path;

use crate::config::{load_config, validate_config, InstallConfig};
use crate::error::{ProvisionError, Result};
use crate::ui::{Prompt, UserInterface};

/// Exit code for a missing or invalid config file.
pub const EXIT_CONFIG: i32 = 2;

/// Load, complete, and validate the config at `path`.
///
/// Missing passwords are asked for when the UI is interactive. Problems
/// with the file are reported through `ui` and yield `Ok(None)`; the caller
/// exits with [`EXIT_CONFIG`].
pub fn load_checked(path: &Path, ui: &mut dyn UserInterface) -> Result<Option<InstallConfig>> {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(ProvisionError::ConfigNotFound { path }) => {
            ui.error(&format!("No configuration found at {}", path.display()));
            ui.message("Pass --config or set PROVISION_CONFIG.");
            return Ok(None);
        }
        Err(e @ ProvisionError::ConfigParse { .. }) => {
            ui.error(&e.to_string());
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let config = if ui.is_interactive() {
        prompt_missing_secrets(config, ui)?
    } else {
        config
    };

    let issues = validate_config(&config);
    if issues.is_empty() {
        return Ok(Some(config));
    }

    ui.error(&format!(
        "{} has {} problem{}:",
        path.display(),
        issues.len(),
        if issues.len() == 1 { "" } else { "s" }
    ));
    for issue in &issues {
        ui.message(&format!("  {}: {}", issue.field, issue.message));
    }
    Ok(None)
}

/// Ask for each required password the file and environment left unset.
pub fn prompt_missing_secrets(
    mut config: InstallConfig,
    ui: &mut dyn UserInterface,
) -> Result<InstallConfig> {
    if config.account.password.is_none() {
        let question = format!("Password for account '{}'", config.account.name);
        config.account.password = Some(ask(ui, "account-password", &question)?);
    }
    if config.credentials.sys_password.is_none() {
        config.credentials.sys_password = Some(ask(ui, "sys-password", "SYS password")?);
    }
    if config.credentials.system_password.is_none() {
        config.credentials.system_password =
            Some(ask(ui, "system-password", "SYSTEM password")?);
    }
    Ok(config)
}

fn ask(ui: &mut dyn UserInterface, key: &str, question: &str) -> Result<String> {
    Ok(ui.prompt(&Prompt::password(key, question))?.as_string())
}
