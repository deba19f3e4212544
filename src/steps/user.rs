//! Service account creation.

use crate::config::validate_password;
use crate::error::Result;
use crate::platform::Principal;
use crate::steps::{Applied, CheckResult, Step, StepContext};

/// Ensure an OS account exists with the given groups.
#[derive(Debug, Clone)]
pub struct EnsureUser {
    name: String,
    principal: Principal,
}

impl EnsureUser {
    /// `groups[0]` becomes the primary group.
    pub fn new(account: impl Into<String>, password: Option<String>, groups: Vec<String>) -> Self {
        let account = account.into();
        Self {
            name: format!("ensure-user {}", account),
            principal: Principal::new(account)
                .with_password(password)
                .with_groups(groups),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Step for EnsureUser {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        if self.principal.groups.is_empty() {
            format!("Create account '{}'", self.principal.name)
        } else {
            format!(
                "Create account '{}' in groups {}",
                self.principal.name,
                self.principal.groups.join(", ")
            )
        }
    }

    fn check(&self, ctx: &StepContext<'_>) -> CheckResult {
        let account = &self.principal.name;
        match ctx.platform.principal_exists(account) {
            Ok(true) => CheckResult::complete(format!("Account exists: {}", account)),
            Ok(false) => CheckResult::incomplete(
                format!("Account missing: {}", account),
                "Will be created",
            ),
            Err(e) => CheckResult::unknown(format!("Account lookup: {}", account), &e),
        }
    }

    fn apply(&self, ctx: &StepContext<'_>) -> Result<Applied> {
        if let Some(password) = &self.principal.password {
            validate_password(password)?;
        }
        ctx.platform.create_principal(&self.principal)?;
        tracing::info!("Created account {}", self.principal.name);
        Ok(Applied::detail(format!("created {}", self.principal.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ProvisionError};
    use crate::platform::MockPlatform;
    use crate::test_support::sample_config;

    #[test]
    fn check_reflects_existing_account() {
        let config = sample_config();
        let platform = MockPlatform::new();
        platform.add_principal("oracle");
        let ctx = StepContext::new(&config, &platform);

        let step = EnsureUser::new("oracle", None, vec![]);
        assert!(step.check(&ctx).complete);
    }

    #[test]
    fn apply_creates_account_with_groups() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let step = EnsureUser::new(
            "oracle",
            Some("Welcome1x".into()),
            vec!["oinstall".into(), "dba".into()],
        );
        assert!(!step.check(&ctx).complete);
        step.apply(&ctx).unwrap();

        assert!(step.check(&ctx).complete);
        let created = platform.principal("oracle").unwrap();
        assert_eq!(created.primary_group(), Some("oinstall"));
        assert!(platform.has_group("dba"));
    }

    #[test]
    fn weak_password_is_rejected_before_any_mutation() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let err = EnsureUser::new("oracle", Some("short".into()), vec![])
            .apply(&ctx)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Validation { .. }));
        assert_eq!(platform.calls_to("create_principal"), 0);
    }

    #[test]
    fn refusal_is_permission_error() {
        let config = sample_config();
        let platform = MockPlatform::new().fail_on("create_principal", ErrorKind::Permission);
        let ctx = StepContext::new(&config, &platform);

        let err = EnsureUser::new("oracle", Some("Welcome1x".into()), vec![])
            .apply(&ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn check_error_is_incomplete() {
        let config = sample_config();
        let platform = MockPlatform::new().fail_on("principal_exists", ErrorKind::Io);
        let ctx = StepContext::new(&config, &platform);

        let result = EnsureUser::new("oracle", None, vec![]).check(&ctx);
        assert!(!result.complete);
        assert!(result.details.is_some());
    }
}
