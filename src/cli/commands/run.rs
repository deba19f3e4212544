//! Run command implementation.
//!
//! The `provision run` command builds the install sequence for the host
//! and executes it, stopping at the first failed step.

use std::path::{Path, PathBuf};

use crate::cli::args::RunArgs;
use crate::config::InstallConfig;
use crate::error::{ErrorKind, Result};
use crate::plan::{self, SystemPaths};
use crate::platform::{self, PlatformAdapter};
use crate::runner::{CancellationToken, RunOutcome, RunProgress, Runner};
use crate::steps::StepStatus;
use crate::ui::{outcome_line, Prompt, SpinnerHandle, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::load::{load_checked, EXIT_CONFIG};

/// Exit code when the operator declines or interrupts the run.
const EXIT_CANCELLED: i32 = 130;

/// The run command implementation.
pub struct RunCommand {
    config_path: PathBuf,
    args: RunArgs,
    cancel: CancellationToken,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(config_path: &Path, args: RunArgs) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            args,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel the run through `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    /// Run against an explicit adapter and system file locations.
    pub fn execute_with(
        &self,
        ui: &mut dyn UserInterface,
        adapter: &dyn PlatformAdapter,
        system: &SystemPaths,
    ) -> Result<CommandResult> {
        let Some(config) = load_checked(&self.config_path, ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG));
        };
        self.run_config(&config, ui, adapter, system)
    }

    fn run_config(
        &self,
        config: &InstallConfig,
        ui: &mut dyn UserInterface,
        adapter: &dyn PlatformAdapter,
        system: &SystemPaths,
    ) -> Result<CommandResult> {
        let runner = match Runner::new(config, adapter) {
            Ok(runner) => runner.with_cancellation(self.cancel.clone()),
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

        if ui.is_interactive() && !self.args.yes {
            let question = format!(
                "Apply {} steps to this {} host for {}?",
                steps.len(),
                adapter.kind(),
                config.database.sid
            );
            let proceed = ui.prompt(&Prompt::confirm("proceed", question, false))?;
            if !proceed.as_bool() {
                ui.warning("Nothing was changed");
                return Ok(CommandResult::failure(EXIT_CANCELLED));
            }
        }

        ui.show_header(&format!(
            "Provisioning {} on {}",
            config.database.sid,
            adapter.kind()
        ));

        let mut spinner: Option<Box<dyn SpinnerHandle>> = None;
        let report = runner.run_with_progress(&steps, |event| match event {
            RunProgress::StepStarting { name, index, total } => {
                ui.show_progress(index + 1, total);
                spinner = Some(ui.start_spinner(name));
            }
            RunProgress::StepOutput { line, .. } => {
                ui.show_command_output(line.text());
            }
            RunProgress::StepFinished { name, result } => {
                let Some(mut handle) = spinner.take() else {
                    return;
                };
                match result.status {
                    StepStatus::Succeeded => handle.finish_success(name),
                    StepStatus::Skipped => handle.finish_skipped(&format!(
                        "{} ({})",
                        name,
                        result.detail.as_deref().unwrap_or("already done")
                    )),
                    StepStatus::Failed => {
                        let reason = result
                            .failure
                            .as_ref()
                            .map(|f| f.message.as_str())
                            .unwrap_or("failed");
                        handle.finish_error(&format!("{}: {}", name, reason));
                    }
                }
            }
        });

        ui.show_report(&report);

        if let Some(path) = &self.args.report {
            match report.save(path) {
                Ok(()) => ui.message(&format!("Report written to {}", path.display())),
                Err(e) => ui.warning(&format!("Could not write report: {}", e)),
            }
        }

        let verdict = outcome_line(&report);
        match report.outcome {
            RunOutcome::Completed => ui.success(&verdict),
            RunOutcome::Failed { .. } => ui.error(&verdict),
            RunOutcome::Cancelled => ui.warning(&verdict),
        }

        Ok(CommandResult::from_exit_code(report.exit_code()))
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = load_checked(&self.config_path, ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG));
        };
        if !crate::shell::is_elevated() {
            ui.warning("Not running as root/Administrator; account and service steps will fail");
        }
        let adapter = platform::for_kind(config.target_platform());
        self.run_config(&config, ui, adapter.as_ref(), &SystemPaths::default())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::platform::MockPlatform;
    use crate::runner::RunReport;
    use crate::test_support::config_under;
    use crate::ui::{MockUI, SpinnerStatus};
    use std::fs;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, config: &InstallConfig) -> PathBuf {
        let path = temp.path().join("provision.yml");
        fs::write(&path, serde_yaml::to_string(config).unwrap()).unwrap();
        path
    }

    fn run(temp: &TempDir, args: RunArgs, ui: &mut MockUI) -> (CommandResult, MockPlatform) {
        let config = config_under(temp.path());
        let path = write_config(temp, &config);
        let adapter = MockPlatform::new();
        let system = SystemPaths::under(&temp.path().join("etc"));
        let result = RunCommand::new(&path, args)
            .execute_with(ui, &adapter, &system)
            .unwrap();
        (result, adapter)
    }

    #[test]
    fn missing_archive_fails_with_exit_one() {
        let temp = TempDir::new().unwrap();
        let report_path = temp.path().join("report.json");
        let mut ui = MockUI::new();
        let args = RunArgs {
            report: Some(report_path.clone()),
            yes: true,
        };

        let (result, adapter) = run(&temp, args, &mut ui);

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("Provisioning failed at step 'extract-software'"));
        assert_eq!(adapter.calls_to("install_service"), 0);

        let report = RunReport::load(&report_path).unwrap();
        let failed = report.failed_step().unwrap();
        assert_eq!(failed.name, "extract-software");
        assert_eq!(
            failed.failure.as_ref().unwrap().kind,
            ErrorKind::NotFound
        );
    }

    #[test]
    fn spinners_follow_step_outcomes() {
        let temp = TempDir::new().unwrap();
        let mut ui = MockUI::new();
        run(&temp, RunArgs { report: None, yes: true }, &mut ui);

        let results = ui.spinner_results();
        assert_eq!(results[0], (SpinnerStatus::Success, "create-account".to_string()));
        let (status, message) = results.last().unwrap();
        assert_eq!(*status, SpinnerStatus::Error);
        assert!(message.starts_with("extract-software:"));
        assert_eq!(ui.progress()[0].0, 1);
    }

    #[test]
    fn declined_confirmation_changes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut ui = MockUI::new();
        ui.set_interactive(true);
        ui.set_prompt_response("proceed", "no");

        let (result, adapter) = run(&temp, RunArgs::default(), &mut ui);

        assert_eq!(result.exit_code, 130);
        assert!(adapter.calls().is_empty());
        assert!(ui.has_warning("Nothing was changed"));
    }

    #[test]
    fn cancelled_token_stops_before_first_step() {
        let temp = TempDir::new().unwrap();
        let config = config_under(temp.path());
        let path = write_config(&temp, &config);
        let token = CancellationToken::new();
        token.cancel();
        let mut ui = MockUI::new();
        let adapter = MockPlatform::new();

        let result = RunCommand::new(&path, RunArgs { report: None, yes: true })
            .with_cancellation(token)
            .execute_with(&mut ui, &adapter, &SystemPaths::under(temp.path()))
            .unwrap();

        assert_eq!(result.exit_code, 130);
        assert!(adapter.calls().is_empty());
        assert!(ui.has_warning("Provisioning cancelled"));
    }
}
