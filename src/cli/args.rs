//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::platform::PlatformKind;

/// Provision - Unattended database software installation.
#[derive(Debug, Parser)]
#[command(name = "provision")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (defaults to provision.yml in the current directory)
    #[arg(short, long, global = true, env = "PROVISION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show verbose output, including installer output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Never prompt; missing secrets must come from the environment
    #[arg(long, global = true)]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Provision this host
    Run(RunArgs),

    /// Show the steps a run would take (default if no command specified)
    Plan(PlanArgs),

    /// Validate the configuration file
    Validate,

    /// Print the JSON schema of the configuration file
    Schema(SchemaArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Write the run report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Do not ask for confirmation before changing the host
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the `plan` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PlanArgs {
    /// Plan for this platform instead of the configured or host platform
    #[arg(long, value_enum)]
    pub platform: Option<PlatformKind>,

    /// Evaluate each step's check against this host
    #[arg(long)]
    pub check: bool,
}

/// Arguments for the `schema` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SchemaArgs {
    /// Write the schema to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_report_and_yes() {
        let cli = Cli::parse_from(["provision", "run", "--report", "out.json", "-y"]);
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.report, Some(PathBuf::from("out.json")));
                assert!(args.yes);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "provision",
            "validate",
            "--config",
            "/etc/provision.yml",
            "--non-interactive",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/provision.yml")));
        assert!(cli.non_interactive);
        assert!(matches!(cli.command, Some(Commands::Validate)));
    }

    #[test]
    fn plan_platform_is_value_enum() {
        let cli = Cli::parse_from(["provision", "plan", "--platform", "windows", "--check"]);
        match cli.command {
            Some(Commands::Plan(args)) => {
                assert_eq!(args.platform, Some(PlatformKind::Windows));
                assert!(args.check);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::parse_from(["provision"]);
        assert!(cli.command.is_none());
    }
}
