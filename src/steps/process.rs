//! External program invocation.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ProvisionError, Result};
use crate::platform::Principal;
use crate::shell::{self, CommandOptions, Invocation};
use crate::steps::{Applied, CheckResult, Step, StepContext};

/// Run a program to completion. Exit code 0 is the only success signal.
#[derive(Debug, Clone)]
pub struct RunExternalProcess {
    name: String,
    invocation: Invocation,
    run_as: Option<Principal>,
    timeout: Option<Duration>,
    skip_if_exists: Option<PathBuf>,
}

impl RunExternalProcess {
    pub fn new(invocation: Invocation) -> Self {
        Self {
            name: format!("run {}", invocation.program_name()),
            invocation,
            run_as: None,
            timeout: None,
            skip_if_exists: None,
        }
    }

    pub fn run_as(mut self, principal: Principal) -> Self {
        self.run_as = Some(principal);
        self
    }

    /// Kill the program and fail after `timeout`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Treat the step as done when `path` exists.
    pub fn skip_if_exists(mut self, path: impl Into<PathBuf>) -> Self {
        self.skip_if_exists = Some(path.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }
}

impl Step for RunExternalProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        match &self.run_as {
            Some(principal) => format!("Run {} as {}", self.invocation, principal.name),
            None => format!("Run {}", self.invocation),
        }
    }

    fn check(&self, _ctx: &StepContext<'_>) -> CheckResult {
        match &self.skip_if_exists {
            Some(guard) if guard.exists() => {
                CheckResult::complete(format!("File exists: {}", guard.display()))
            }
            Some(guard) => CheckResult::incomplete(
                format!("File missing: {}", guard.display()),
                "Program will run",
            ),
            None => CheckResult::always_apply(),
        }
    }

    fn apply(&self, ctx: &StepContext<'_>) -> Result<Applied> {
        let invocation = match &self.run_as {
            Some(principal) => ctx
                .platform
                .run_as_principal(self.invocation.clone(), principal)?,
            None => self.invocation.clone(),
        };
        tracing::info!("Running {}", ctx.masker.mask_invocation(&invocation));

        let options = CommandOptions {
            timeout: self.timeout,
            cancel: Some(ctx.cancel.clone()),
        };
        let result = shell::execute(&invocation, &options, &mut |line| ctx.emit(line))?;

        if result.success {
            Ok(Applied::exit_code(result.exit_code.unwrap_or(0)))
        } else {
            Err(ProvisionError::ProcessFailed {
                program: self.invocation.program_name(),
                code: result.exit_code,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::platform::MockPlatform;
    use crate::shell::OutputLine;
    use crate::test_support::sample_config;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn sh(script: &str) -> Invocation {
        Invocation::new("/bin/sh").arg("-c").arg(script)
    }

    #[test]
    fn exit_zero_succeeds_with_code() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let applied = RunExternalProcess::new(sh("exit 0")).apply(&ctx).unwrap();
        assert_eq!(applied.exit_code, Some(0));
    }

    #[test]
    fn non_zero_exit_carries_exact_code() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let err = RunExternalProcess::new(sh("exit 42")).apply(&ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessFailed);
        assert_eq!(err.exit_code(), Some(42));
    }

    #[test]
    fn missing_program_is_not_found() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let err = RunExternalProcess::new(Invocation::new("/nonexistent/runInstaller"))
            .apply(&ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn timeout_is_reported() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let err = RunExternalProcess::new(sh("sleep 5"))
            .timeout(Some(Duration::from_millis(200)))
            .apply(&ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn chatty_program_still_times_out() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let err = RunExternalProcess::new(sh("while :; do echo installing; done"))
            .timeout(Some(Duration::from_millis(200)))
            .apply(&ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn legacy_encoded_output_still_succeeds() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let applied = RunExternalProcess::new(sh(r"printf 'Fran\347ais\n'; seq 1 5000; exit 0"))
            .apply(&ctx)
            .unwrap();
        assert_eq!(applied.exit_code, Some(0));
    }

    #[test]
    fn guard_file_skips_step() {
        let temp = TempDir::new().unwrap();
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let guard = temp.path().join("oratab");
        let step = RunExternalProcess::new(sh("exit 1")).skip_if_exists(&guard);
        assert!(!step.check(&ctx).complete);
        std::fs::write(&guard, "").unwrap();
        assert!(step.check(&ctx).complete);
    }

    #[test]
    fn no_guard_always_applies() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);
        assert!(!RunExternalProcess::new(sh("true")).check(&ctx).complete);
    }

    #[test]
    fn run_as_goes_through_platform() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        RunExternalProcess::new(sh("exit 0"))
            .run_as(Principal::new("oracle"))
            .apply(&ctx)
            .unwrap();
        assert_eq!(platform.calls(), vec!["run_as_principal oracle"]);
    }

    #[test]
    fn output_is_streamed_and_masked() {
        let mut config = sample_config();
        config.credentials.sys_password = Some("Secret99x".into());
        let platform = MockPlatform::new();
        let lines = RefCell::new(Vec::new());
        let sink = |line: &OutputLine| lines.borrow_mut().push(line.text().to_string());
        let ctx = StepContext::new(&config, &platform).with_output(&sink);

        RunExternalProcess::new(sh("echo start; echo pw=Secret99x"))
            .apply(&ctx)
            .unwrap();

        let lines = lines.into_inner();
        assert_eq!(lines[0], "start");
        assert!(lines.iter().all(|l| !l.contains("Secret99x")));
    }
}
