//! Sequential, fail-fast execution of a step list.

use std::cell::RefCell;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::InstallConfig;
use crate::error::{ErrorKind, ProvisionError, Result};
use crate::platform::{PlatformAdapter, PlatformKind};
use crate::secrets::OutputMasker;
use crate::shell::OutputLine;
use crate::steps::{CheckResult, Step, StepContext, StepResult};

use super::cancel::CancellationToken;
use super::report::{RunOutcome, RunReport};

/// Progress events emitted during a run.
#[derive(Debug)]
pub enum RunProgress<'a> {
    /// A step is about to be checked and, if needed, applied.
    StepStarting {
        name: &'a str,
        index: usize,
        total: usize,
    },
    /// A line of output from a program the step runs, secrets masked.
    StepOutput { name: &'a str, line: &'a OutputLine },
    /// A step finished.
    StepFinished {
        name: &'a str,
        result: &'a StepResult,
    },
}

/// A step's check evaluated without applying anything.
#[derive(Debug, Clone)]
pub struct Preview {
    pub name: String,
    pub description: String,
    pub check: CheckResult,
}

/// Executes steps in order against one platform adapter.
pub struct Runner<'a> {
    config: &'a InstallConfig,
    platform: &'a dyn PlatformAdapter,
    cancel: CancellationToken,
    masker: OutputMasker,
}

impl<'a> Runner<'a> {
    /// Create a runner, refusing adapters that do not fit the host or config.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the adapter's platform differs from
    /// the host (unless the adapter is host-agnostic) or from the platform the
    /// config names.
    pub fn new(config: &'a InstallConfig, platform: &'a dyn PlatformAdapter) -> Result<Self> {
        let kind = platform.kind();
        let host = PlatformKind::host();
        if !platform.host_agnostic() && kind != host {
            return Err(ProvisionError::configuration(format!(
                "{} adapter cannot run on a {} host",
                kind, host
            )));
        }
        if let Some(target) = config.platform {
            if target != kind {
                return Err(ProvisionError::configuration(format!(
                    "config targets {} but the adapter is for {}",
                    target, kind
                )));
            }
        }

        Ok(Self {
            config,
            platform,
            cancel: CancellationToken::new(),
            masker: OutputMasker::from_config(config),
        })
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this runner.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every step in order.
    pub fn run(&self, steps: &[Box<dyn Step>]) -> RunReport {
        self.run_with_progress(steps, |_| {})
    }

    /// Run every step in order with a progress callback.
    ///
    /// Stops at the first failed step. No step is retried.
    pub fn run_with_progress(
        &self,
        steps: &[Box<dyn Step>],
        on_progress: impl FnMut(RunProgress<'_>),
    ) -> RunReport {
        let started_at = Utc::now();
        let on_progress = RefCell::new(on_progress);
        let total = steps.len();
        let mut results = Vec::with_capacity(total);
        let mut outcome = RunOutcome::Completed;

        for (index, step) in steps.iter().enumerate() {
            let name = step.name();
            if self.cancel.is_cancelled() {
                warn!("Run cancelled before {}", name);
                outcome = RunOutcome::Cancelled;
                break;
            }

            notify(
                &on_progress,
                RunProgress::StepStarting { name, index, total },
            );
            let result = self.execute(step.as_ref(), &|line: &OutputLine| {
                notify(&on_progress, RunProgress::StepOutput { name, line })
            });
            notify(
                &on_progress,
                RunProgress::StepFinished {
                    name,
                    result: &result,
                },
            );

            let failure = result.error_kind();
            results.push(result);
            match failure {
                Some(ErrorKind::Cancelled) => {
                    outcome = RunOutcome::Cancelled;
                    break;
                }
                Some(_) => {
                    outcome = RunOutcome::Failed {
                        step: name.to_string(),
                    };
                    break;
                }
                None => {}
            }
        }

        RunReport {
            started_at,
            finished_at: Utc::now(),
            results,
            outcome,
        }
    }

    /// Evaluate every step's check without applying anything.
    pub fn preview(&self, steps: &[Box<dyn Step>]) -> Vec<Preview> {
        let ctx = self.context(None);
        steps
            .iter()
            .map(|step| Preview {
                name: step.name().to_string(),
                description: self.masker.mask(&step.describe()),
                check: step.check(&ctx),
            })
            .collect()
    }

    fn context<'s>(&'s self, output: Option<&'s dyn Fn(&OutputLine)>) -> StepContext<'s> {
        let ctx = StepContext::new(self.config, self.platform).with_cancel(self.cancel.clone());
        match output {
            Some(sink) => ctx.with_output(sink),
            None => ctx,
        }
    }

    fn execute(&self, step: &dyn Step, output: &dyn Fn(&OutputLine)) -> StepResult {
        let name = step.name();
        let ctx = self.context(Some(output));

        let check = step.check(&ctx);
        if check.complete {
            info!("Skipping {}: {}", name, check.description);
            return StepResult::skipped(name, check.description);
        }

        info!("Applying {}", name);
        let start = Instant::now();
        match step.apply(&ctx) {
            Ok(applied) => {
                info!("Finished {}", name);
                StepResult::succeeded(name, applied, start.elapsed())
            }
            Err(e) => {
                let message = self.masker.mask(&e.to_string());
                warn!("{} failed: {}", name, message);
                StepResult::failed(name, &e, message, start.elapsed())
            }
        }
    }
}

fn notify<F: FnMut(RunProgress<'_>)>(callback: &RefCell<F>, event: RunProgress<'_>) {
    let mut callback = callback.borrow_mut();
    (*callback)(event);
}
