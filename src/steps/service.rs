//! Auto-start service registration.

use crate::error::Result;
use crate::platform::ServiceDefinition;
use crate::steps::{Applied, CheckResult, Step, StepContext};

/// Register a service that starts at boot.
#[derive(Debug, Clone)]
pub struct RegisterService {
    name: String,
    definition: ServiceDefinition,
}

impl RegisterService {
    pub fn new(definition: ServiceDefinition) -> Self {
        Self {
            name: format!("register-service {}", definition.name),
            definition,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Step for RegisterService {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        format!(
            "Register service '{}' running {}",
            self.definition.name, self.definition.start
        )
    }

    fn check(&self, ctx: &StepContext<'_>) -> CheckResult {
        let service = &self.definition.name;
        match ctx.platform.service_registered(service) {
            Ok(true) => CheckResult::complete(format!("Service registered: {}", service)),
            Ok(false) => CheckResult::incomplete(
                format!("Service missing: {}", service),
                "Will be registered",
            ),
            Err(e) => CheckResult::unknown(format!("Service lookup: {}", service), &e),
        }
    }

    fn apply(&self, ctx: &StepContext<'_>) -> Result<Applied> {
        ctx.platform.install_service(&self.definition)?;
        tracing::info!("Registered service {}", self.definition.name);
        Ok(Applied::detail(format!("registered {}", self.definition.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::platform::{MockPlatform, Principal};
    use crate::shell::Invocation;
    use crate::test_support::sample_config;

    fn definition() -> ServiceDefinition {
        ServiceDefinition {
            name: "dbora".into(),
            description: "Oracle Database ORCL".into(),
            start: Invocation::new("/u01/home/bin/dbstart").arg("/u01/home"),
            stop: Some(Invocation::new("/u01/home/bin/dbshut").arg("/u01/home")),
            run_as: Some(Principal::new("oracle")),
            working_dir: None,
        }
    }

    #[test]
    fn registers_once() {
        let config = sample_config();
        let platform = MockPlatform::new();
        let ctx = StepContext::new(&config, &platform);
        let step = RegisterService::new(definition());

        assert!(!step.check(&ctx).complete);
        step.apply(&ctx).unwrap();
        assert!(step.check(&ctx).complete);
        assert_eq!(platform.service("dbora"), Some(definition()));
    }

    #[test]
    fn refusal_is_reported() {
        let config = sample_config();
        let platform = MockPlatform::new().fail_on("install_service", ErrorKind::Configuration);
        let ctx = StepContext::new(&config, &platform);

        let err = RegisterService::new(definition()).apply(&ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
