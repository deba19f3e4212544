//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands, PlanArgs};
use crate::error::Result;
use crate::runner::CancellationToken;
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    /// Result carrying an arbitrary exit code.
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            Self::success()
        } else {
            Self::failure(exit_code)
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    config_path: PathBuf,
    cancel: CancellationToken,
}

impl CommandDispatcher {
    /// Create a dispatcher for the config file at `config_path`.
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            cancel: CancellationToken::new(),
        }
    }

    /// Share a cancellation token with the run command.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Some(Commands::Run(args)) => {
                let cmd = super::run::RunCommand::new(&self.config_path, args.clone())
                    .with_cancellation(self.cancel.clone());
                cmd.execute(ui)
            }
            Some(Commands::Plan(args)) => {
                let cmd = super::plan::PlanCommand::new(&self.config_path, args.clone());
                cmd.execute(ui)
            }
            Some(Commands::Validate) => {
                let cmd = super::validate::ValidateCommand::new(&self.config_path);
                cmd.execute(ui)
            }
            Some(Commands::Schema(args)) => {
                let cmd = super::schema::SchemaCommand::new(args.clone());
                cmd.execute(ui)
            }
            Some(Commands::Completions(args)) => {
                let cmd = super::completions::CompletionsCommand::new(args.clone());
                cmd.execute(ui)
            }
            None => {
                // Default to a plan so a bare invocation never changes the host
                let cmd = super::plan::PlanCommand::new(&self.config_path, PlanArgs::default());
                cmd.execute(ui)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_failure() {
        let result = CommandResult::failure(1);
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn from_exit_code_maps_zero_to_success() {
        assert!(CommandResult::from_exit_code(0).success);
        assert!(!CommandResult::from_exit_code(130).success);
    }

    #[test]
    fn dispatcher_creation() {
        let dispatcher = CommandDispatcher::new(PathBuf::from("/etc/provision.yml"));
        assert_eq!(
            dispatcher.config_path(),
            Path::new("/etc/provision.yml")
        );
    }

    #[test]
    fn bare_invocation_plans_and_reports_missing_config() {
        let temp = TempDir::new().unwrap();
        let dispatcher = CommandDispatcher::new(temp.path().join("provision.yml"));
        let cli = Cli::parse_from(["provision"]);
        let mut ui = MockUI::new();

        let result = dispatcher.dispatch(&cli, &mut ui).unwrap();
        assert_eq!(result.exit_code, 2);
        assert!(ui.has_error("No configuration found"));
    }
}
