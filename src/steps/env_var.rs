//! Persistent environment variables.

use crate::error::{ProvisionError, Result};
use crate::platform::{is_valid_env_name, EnvScope};
use crate::steps::{Applied, CheckResult, Step, StepContext};

/// Persist `NAME=value` for the machine or one account.
#[derive(Debug, Clone)]
pub struct SetPersistentEnvVar {
    name: String,
    variable: String,
    value: String,
    scope: EnvScope,
}

impl SetPersistentEnvVar {
    pub fn new(variable: impl Into<String>, value: impl Into<String>, scope: EnvScope) -> Self {
        let variable = variable.into();
        Self {
            name: format!("set-env {}", variable),
            variable,
            value: value.into(),
            scope,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Step for SetPersistentEnvVar {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        format!("Set {}={} ({})", self.variable, self.value, self.scope)
    }

    fn check(&self, ctx: &StepContext<'_>) -> CheckResult {
        match ctx.platform.persisted_env_var(&self.variable, &self.scope) {
            Ok(Some(current)) if current == self.value => {
                CheckResult::complete(format!("{} already set", self.variable))
            }
            Ok(Some(current)) => CheckResult::incomplete(
                format!("{} differs", self.variable),
                format!("currently '{}'", ctx.masker.mask(&current)),
            ),
            Ok(None) => CheckResult::incomplete(format!("{} not set", self.variable), "unset"),
            Err(e) => CheckResult::unknown(format!("Reading {}", self.variable), &e),
        }
    }

    fn apply(&self, ctx: &StepContext<'_>) -> Result<Applied> {
        if !is_valid_env_name(&self.variable) {
            return Err(ProvisionError::validation(format!(
                "invalid environment variable name '{}'",
                self.variable
            )));
        }
        ctx.platform
            .persist_env_var(&self.variable, &self.value, &self.scope)?;
        Ok(Applied::detail(format!("{} ({})", self.variable, self.scope)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::platform::{MockPlatform, PlatformAdapter};
    use crate::test_support::sample_config;

    #[test]
    fn apply_then_check_is_complete() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);
        let step = SetPersistentEnvVar::new("ORACLE_SID", "ORCL", EnvScope::Machine);

        assert!(!step.check(&ctx).complete);
        step.apply(&ctx).unwrap();
        assert!(step.check(&ctx).complete);
        assert_eq!(
            platform.env_var("ORACLE_SID", &EnvScope::Machine).as_deref(),
            Some("ORCL")
        );
    }

    #[test]
    fn different_value_is_incomplete() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let scope = EnvScope::User("oracle".into());
        platform.persist_env_var("ORACLE_SID", "OLD", &scope).unwrap();
        let ctx = StepContext::new(&config, &platform);

        let result = SetPersistentEnvVar::new("ORACLE_SID", "ORCL", scope).check(&ctx);
        assert!(!result.complete);
        assert!(result.details.unwrap().contains("OLD"));
    }

    #[test]
    fn invalid_name_is_validation_error() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let err = SetPersistentEnvVar::new("ORACLE-HOME", "/x", EnvScope::Machine)
            .apply(&ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(platform.calls_to("persist_env_var"), 0);
    }

    #[test]
    fn refusal_is_permission_error() {
        let config = sample_config();
        let platform = MockPlatform::new().fail_on("persist_env_var", ErrorKind::Permission);
        let ctx = StepContext::new(&config, &platform);

        let err = SetPersistentEnvVar::new("ORACLE_BASE", "/u01", EnvScope::Machine)
            .apply(&ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }
}
