//! Ownership and access control.

use std::path::PathBuf;

use crate::error::{ProvisionError, Result};
use crate::platform::AccessGrant;
use crate::steps::{Applied, CheckResult, Step, StepContext};

/// Hand a path to an owner with the given mode or rights. Always applies.
#[derive(Debug, Clone)]
pub struct SetPermissions {
    name: String,
    path: PathBuf,
    grant: AccessGrant,
}

impl SetPermissions {
    pub fn new(path: impl Into<PathBuf>, grant: AccessGrant) -> Self {
        let path = path.into();
        Self {
            name: format!("set-permissions {}", path.display()),
            path,
            grant,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Step for SetPermissions {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        let owner = match &self.grant.group {
            Some(group) => format!("{}:{}", self.grant.owner, group),
            None => self.grant.owner.clone(),
        };
        let mut text = format!("Give {} to {}", self.path.display(), owner);
        if let Some(mode) = self.grant.mode {
            text.push_str(&format!(" (mode {:o})", mode));
        }
        text
    }

    fn check(&self, _ctx: &StepContext<'_>) -> CheckResult {
        CheckResult::always_apply()
    }

    fn apply(&self, ctx: &StepContext<'_>) -> Result<Applied> {
        if !self.path.exists() {
            return Err(ProvisionError::NotFound {
                path: self.path.clone(),
            });
        }
        ctx.platform.set_owner_and_mode(&self.path, &self.grant)?;
        Ok(Applied::detail(format!(
            "owner {} on {}",
            self.grant.owner,
            self.path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::platform::MockPlatform;
    use crate::test_support::sample_config;
    use tempfile::TempDir;

    #[test]
    fn delegates_grant_to_platform() {
        let temp = TempDir::new().unwrap();
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let grant = AccessGrant::owner("oracle").group("oinstall").mode(0o775);
        let step = SetPermissions::new(temp.path(), grant.clone());
        assert!(!step.check(&ctx).complete);
        step.apply(&ctx).unwrap();

        assert_eq!(platform.grants(), vec![(temp.path().to_path_buf(), grant)]);
    }

    #[test]
    fn missing_path_is_not_found() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);

        let err = SetPermissions::new("/nonexistent/u01", AccessGrant::owner("oracle"))
            .apply(&ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(platform.grants().is_empty());
    }

    #[test]
    fn describe_mentions_mode() {
        let step = SetPermissions::new("/u01", AccessGrant::owner("oracle").mode(0o755));
        assert!(step.describe().contains("755"));
    }
}
