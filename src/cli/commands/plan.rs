//! Plan command implementation.
//!
//! The `provision plan` command lists the install sequence without changing
//! anything. With `--check` it also evaluates each step's precondition
//! against the host.

use std::path::{Path, PathBuf};

use crate::cli::args::PlanArgs;
use crate::config::InstallConfig;
use crate::error::{ErrorKind, Result};
use crate::plan::{self, SystemPaths};
use crate::platform::{self, PlatformAdapter, PlatformKind};
use crate::runner::Runner;
use crate::secrets::OutputMasker;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::load::{load_checked, EXIT_CONFIG};

/// The plan command implementation.
pub struct PlanCommand {
    config_path: PathBuf,
    args: PlanArgs,
}

impl PlanCommand {
    /// Create a new plan command.
    pub fn new(config_path: &Path, args: PlanArgs) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            args,
        }
    }

    fn target(&self, config: &InstallConfig) -> PlatformKind {
        self.args
            .platform
            .unwrap_or_else(|| config.target_platform())
    }

    /// Evaluate checks with an explicit adapter and system file locations.
    pub fn check_with(
        &self,
        config: &InstallConfig,
        ui: &mut dyn UserInterface,
        adapter: &dyn PlatformAdapter,
        system: &SystemPaths,
    ) -> Result<CommandResult> {
        let runner = match Runner::new(config, adapter) {
            Ok(runner) => runner,
            Err(e) if e.kind() == ErrorKind::Configuration => {
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(EXIT_CONFIG));
            }
            Err(e) => return Err(e),
        };
        let steps = match plan::build_with(config, adapter.kind(), system) {
            Ok(steps) => steps,
            Err(e) => {
                ui.error(&format!("Cannot build the install plan: {}", e));
                return Ok(CommandResult::failure(EXIT_CONFIG));
            }
        };

        ui.show_header(&format!(
            "Plan for {} on {} ({} steps)",
            config.database.sid,
            adapter.kind(),
            steps.len()
        ));

        let previews = runner.preview(&steps);
        let pending = previews.iter().filter(|p| !p.check.complete).count();
        for (i, preview) in previews.iter().enumerate() {
            if preview.check.complete {
                ui.message(&format!(
                    "{:>3}. ✓ {} (done: {})",
                    i + 1,
                    preview.name,
                    preview.check.description
                ));
            } else {
                ui.message(&format!(
                    "{:>3}. • {}  {}",
                    i + 1,
                    preview.name,
                    preview.description
                ));
            }
        }

        if pending == 0 {
            ui.success("Host is fully provisioned");
        } else {
            ui.message(&format!("{} of {} steps would run", pending, previews.len()));
        }
        Ok(CommandResult::success())
    }

    fn list(&self, config: &InstallConfig, ui: &mut dyn UserInterface) -> CommandResult {
        let kind = self.target(config);
        let steps = match plan::build(config, kind) {
            Ok(steps) => steps,
            Err(e) => {
                ui.error(&format!("Cannot build the install plan: {}", e));
                return CommandResult::failure(EXIT_CONFIG);
            }
        };

        let masker = OutputMasker::from_config(config);
        ui.show_header(&format!(
            "Plan for {} on {} ({} steps)",
            config.database.sid,
            kind,
            steps.len()
        ));
        for (i, step) in steps.iter().enumerate() {
            ui.message(&format!(
                "{:>3}. {}  {}",
                i + 1,
                step.name(),
                masker.mask(&step.describe())
            ));
        }
        CommandResult::success()
    }
}

impl Command for PlanCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = load_checked(&self.config_path, ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG));
        };

        if !self.args.check {
            return Ok(self.list(&config, ui));
        }

        let adapter = platform::for_kind(self.target(&config));
        self.check_with(&config, ui, adapter.as_ref(), &SystemPaths::default())
    }
}
