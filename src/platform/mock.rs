//! In-memory platform for testing.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{ErrorKind, ProvisionError, Result};
use crate::platform::{
    AccessGrant, EnvScope, PlatformAdapter, PlatformKind, Principal, ServiceDefinition,
};
use crate::shell::Invocation;

/// A [`PlatformAdapter`] that records every call and keeps OS state in memory.
///
/// It is host-agnostic, so a runner accepts it on any host. Operations can
/// be made to fail with [`MockPlatform::fail_on`].
///
/// # Example
///
/// ```
/// use provision::platform::{MockPlatform, PlatformAdapter, Principal};
///
/// let platform = MockPlatform::new();
/// platform.create_principal(&Principal::new("oracle")).unwrap();
///
/// assert!(platform.principal_exists("oracle").unwrap());
/// assert_eq!(
///     platform.calls(),
///     vec!["create_principal oracle", "principal_exists oracle"]
/// );
/// ```
#[derive(Debug)]
pub struct MockPlatform {
    kind: PlatformKind,
    state: Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    principals: BTreeMap<String, Principal>,
    groups: BTreeSet<String>,
    grants: Vec<(PathBuf, AccessGrant)>,
    restricted: Vec<(PathBuf, Option<String>)>,
    env: BTreeMap<(EnvScope, String), String>,
    services: BTreeMap<String, ServiceDefinition>,
    calls: Vec<String>,
    failures: BTreeMap<String, ErrorKind>,
}

impl MockPlatform {
    /// A mock reporting the host's platform kind.
    pub fn new() -> Self {
        Self::with_kind(PlatformKind::host())
    }

    pub fn with_kind(kind: PlatformKind) -> Self {
        Self {
            kind,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Make `operation` (a trait method name) fail with an error of `kind`.
    pub fn fail_on(self, operation: &str, kind: ErrorKind) -> Self {
        self.lock().failures.insert(operation.to_string(), kind);
        self
    }

    /// Seed an existing account.
    pub fn add_principal(&self, name: &str) {
        self.lock()
            .principals
            .insert(name.to_string(), Principal::new(name));
    }

    /// Every call made so far, as `"<operation> <subject>"`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Calls to one operation.
    pub fn calls_to(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    pub fn principal(&self, name: &str) -> Option<Principal> {
        self.lock().principals.get(name).cloned()
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.lock().groups.contains(name)
    }

    pub fn grants(&self) -> Vec<(PathBuf, AccessGrant)> {
        self.lock().grants.clone()
    }

    pub fn restricted_files(&self) -> Vec<(PathBuf, Option<String>)> {
        self.lock().restricted.clone()
    }

    pub fn env_var(&self, name: &str, scope: &EnvScope) -> Option<String> {
        self.lock()
            .env
            .get(&(scope.clone(), name.to_string()))
            .cloned()
    }

    pub fn service(&self, name: &str) -> Option<ServiceDefinition> {
        self.lock().services.get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, operation: &str, subject: impl std::fmt::Display) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(format!("{} {}", operation, subject));
        match state.failures.get(operation) {
            Some(kind) => Err(injected_error(operation, *kind)),
            None => Ok(()),
        }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn injected_error(operation: &str, kind: ErrorKind) -> ProvisionError {
    let message = format!("{} refused", operation);
    match kind {
        ErrorKind::Validation => ProvisionError::validation(message),
        ErrorKind::Permission => ProvisionError::permission(message),
        ErrorKind::NotFound => ProvisionError::NotFound {
            path: PathBuf::from(operation),
        },
        ErrorKind::Template => ProvisionError::template(message),
        ErrorKind::Configuration => ProvisionError::configuration(message),
        ErrorKind::Timeout => ProvisionError::Timeout {
            program: operation.to_string(),
            seconds: 0,
        },
        ErrorKind::ProcessFailed => ProvisionError::ProcessFailed {
            program: operation.to_string(),
            code: Some(1),
        },
        ErrorKind::Cancelled => ProvisionError::Cancelled,
        ErrorKind::Io => ProvisionError::io(
            operation,
            std::io::Error::new(std::io::ErrorKind::Other, message),
        ),
        ErrorKind::Other => ProvisionError::Other(anyhow::anyhow!(message)),
    }
}

impl PlatformAdapter for MockPlatform {
    fn kind(&self) -> PlatformKind {
        self.kind
    }

    fn host_agnostic(&self) -> bool {
        true
    }

    fn principal_exists(&self, name: &str) -> Result<bool> {
        self.record("principal_exists", name)?;
        Ok(self.lock().principals.contains_key(name))
    }

    fn create_principal(&self, principal: &Principal) -> Result<()> {
        self.record("create_principal", &principal.name)?;
        let mut state = self.lock();
        state.groups.extend(principal.groups.iter().cloned());
        state
            .principals
            .insert(principal.name.clone(), principal.clone());
        Ok(())
    }

    fn set_owner_and_mode(&self, path: &Path, grant: &AccessGrant) -> Result<()> {
        self.record("set_owner_and_mode", path.display())?;
        self.lock().grants.push((path.to_path_buf(), grant.clone()));
        Ok(())
    }

    fn restrict_file(&self, path: &Path, owner: Option<&str>) -> Result<()> {
        self.record("restrict_file", path.display())?;
        self.lock()
            .restricted
            .push((path.to_path_buf(), owner.map(str::to_string)));
        Ok(())
    }

    fn persisted_env_var(&self, name: &str, scope: &EnvScope) -> Result<Option<String>> {
        self.record("persisted_env_var", name)?;
        Ok(self.env_var(name, scope))
    }

    fn persist_env_var(&self, name: &str, value: &str, scope: &EnvScope) -> Result<()> {
        self.record("persist_env_var", name)?;
        self.lock()
            .env
            .insert((scope.clone(), name.to_string()), value.to_string());
        Ok(())
    }

    fn service_registered(&self, name: &str) -> Result<bool> {
        self.record("service_registered", name)?;
        Ok(self.lock().services.contains_key(name))
    }

    fn install_service(&self, definition: &ServiceDefinition) -> Result<()> {
        self.record("install_service", &definition.name)?;
        self.lock()
            .services
            .insert(definition.name.clone(), definition.clone());
        Ok(())
    }

    fn run_as_principal(&self, invocation: Invocation, principal: &Principal) -> Result<Invocation> {
        self.record("run_as_principal", &principal.name)?;
        Ok(invocation)
    }
}
