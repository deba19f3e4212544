//! Schema command implementation.
//!
//! The `provision schema` command prints the JSON schema of the config file,
//! for editor completion and external validation.

use std::fs;

use crate::cli::args::SchemaArgs;
use crate::config::InstallConfig;
use crate::error::{ProvisionError, Result};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The schema command implementation.
pub struct SchemaCommand {
    args: SchemaArgs,
}

impl SchemaCommand {
    /// Create a new schema command.
    pub fn new(args: SchemaArgs) -> Self {
        Self { args }
    }
}

/// Pretty-printed JSON schema for [`InstallConfig`].
pub fn config_schema() -> Result<String> {
    let schema = schemars::schema_for!(InstallConfig);
    serde_json::to_string_pretty(&schema).map_err(|e| ProvisionError::Other(e.into()))
}

impl Command for SchemaCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let json = config_schema()?;
        match &self.args.output {
            Some(path) => {
                fs::write(path, json).map_err(|e| ProvisionError::io(path, e))?;
                ui.success(&format!("Schema written to {}", path.display()));
            }
            None => println!("{}", json),
        }
        Ok(CommandResult::success())
    }
}
