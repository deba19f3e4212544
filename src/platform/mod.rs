//! OS-specific mutations behind one trait.
//!
//! Steps never branch on the operating system. Everything that differs
//! between hosts (accounts, ownership, persisted environment, auto-start
//! services, running a program as another account) goes through a
//! [`PlatformAdapter`], chosen once at startup with [`for_kind`].

pub mod linux;
pub mod mock;
pub mod windows;

use std::fmt;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};
use crate::shell::Invocation;

pub use linux::{LinuxAdapter, LinuxPaths};
pub use mock::MockPlatform;
pub use windows::WindowsAdapter;

/// Supported operating-system families.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Linux,
    Windows,
}

impl PlatformKind {
    /// The family of the host this binary runs on.
    pub fn host() -> Self {
        if cfg!(windows) {
            PlatformKind::Windows
        } else {
            PlatformKind::Linux
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Linux => "linux",
            PlatformKind::Windows => "windows",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An OS account to create or act as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub password: Option<String>,
    /// Group memberships; the first one is the primary group.
    pub groups: Vec<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: None,
            groups: Vec::new(),
        }
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// Primary group, if any groups were given.
    pub fn primary_group(&self) -> Option<&str> {
        self.groups.first().map(String::as_str)
    }
}

/// Ownership and access to apply to a path.
///
/// `mode` is honoured on Unix hosts, `rights` (an icacls permission
/// string such as `(OI)(CI)F`) on Windows hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub owner: String,
    pub group: Option<String>,
    pub mode: Option<u32>,
    pub rights: Option<String>,
    pub recursive: bool,
}

impl AccessGrant {
    /// Full control for `owner`, applied recursively.
    pub fn owner(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            group: None,
            mode: None,
            rights: None,
            recursive: true,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn rights(mut self, rights: impl Into<String>) -> Self {
        self.rights = Some(rights.into());
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

/// Where a persistent environment variable lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnvScope {
    /// Every account on the host.
    Machine,
    /// One account's login environment.
    User(String),
}

impl fmt::Display for EnvScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvScope::Machine => f.write_str("machine"),
            EnvScope::User(name) => write!(f, "user {}", name),
        }
    }
}

/// An auto-start service to register.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDefinition {
    pub name: String,
    pub description: String,
    pub start: Invocation,
    /// Ignored by service managers that stop services themselves.
    pub stop: Option<Invocation>,
    pub run_as: Option<Principal>,
    /// Directory the service starts in.
    pub working_dir: Option<PathBuf>,
}

/// Operations that differ between operating systems.
///
/// Read-only queries return `Ok` with what they found; mutations return a
/// `Permission` error when the host refuses them.
pub trait PlatformAdapter: Send + Sync {
    /// Family this adapter manages.
    fn kind(&self) -> PlatformKind;

    /// Test doubles return true to run on any host.
    fn host_agnostic(&self) -> bool {
        false
    }

    fn principal_exists(&self, name: &str) -> Result<bool>;

    /// Create an account and any of its groups that are missing.
    fn create_principal(&self, principal: &Principal) -> Result<()>;

    fn set_owner_and_mode(&self, path: &Path, grant: &AccessGrant) -> Result<()>;

    /// Limit a file to its owner (and the system), optionally handing it to `owner`.
    fn restrict_file(&self, path: &Path, owner: Option<&str>) -> Result<()>;

    fn persisted_env_var(&self, name: &str, scope: &EnvScope) -> Result<Option<String>>;

    fn persist_env_var(&self, name: &str, value: &str, scope: &EnvScope) -> Result<()>;

    fn service_registered(&self, name: &str) -> Result<bool>;

    /// Install a service definition and enable it at boot.
    fn install_service(&self, definition: &ServiceDefinition) -> Result<()>;

    /// Rewrite `invocation` so it runs as `principal`.
    fn run_as_principal(&self, invocation: Invocation, principal: &Principal)
        -> Result<Invocation>;
}

/// The real adapter for `kind`.
pub fn for_kind(kind: PlatformKind) -> Box<dyn PlatformAdapter> {
    match kind {
        PlatformKind::Linux => Box::new(LinuxAdapter::new()),
        PlatformKind::Windows => Box::new(WindowsAdapter::new()),
    }
}

/// Run an administrative command, mapping failure onto the error taxonomy.
pub(crate) fn admin_command(invocation: &Invocation) -> Result<String> {
    tracing::debug!("Running {}", invocation.program_name());
    let result = crate::shell::execute_quiet(invocation)?;
    if result.success {
        return Ok(result.stdout);
    }
    let stderr = result.stderr.trim();
    tracing::warn!("{} failed: {}", invocation.program_name(), stderr);
    Err(classify_failure(invocation.program_name(), stderr, result.exit_code))
}

/// Error for a failed administrative command, judged by what it printed.
fn classify_failure(program: String, stderr: &str, code: Option<i32>) -> ProvisionError {
    const REFUSED: [&str; 4] = [
        "permission denied",
        "not permitted",
        "access is denied",
        "only root",
    ];
    const PASSWORD_POLICY: [&str; 5] = [
        "bad password",
        "password does not meet",
        "password policy",
        "pam_chauthtok",
        "authentication token manipulation",
    ];

    let lower = stderr.to_lowercase();
    if PASSWORD_POLICY.iter().any(|p| lower.contains(p)) {
        return ProvisionError::validation(format!(
            "{} rejected the password: {}",
            program, stderr
        ));
    }
    if REFUSED.iter().any(|p| lower.contains(p)) {
        return ProvisionError::permission(format!("{}: {}", program, stderr));
    }
    ProvisionError::ProcessFailed { program, code }
}

/// Variable names accepted by every supported environment store.
pub fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_policy_rejections_are_validation_errors() {
        let linux = classify_failure(
            "chpasswd".into(),
            "chpasswd: (user oracle) pam_chauthtok() failed, error:\nAuthentication token manipulation error",
            Some(1),
        );
        assert!(matches!(linux, ProvisionError::Validation { .. }));

        let windows = classify_failure(
            "net".into(),
            "The password does not meet the password policy requirements.",
            Some(2),
        );
        assert!(matches!(windows, ProvisionError::Validation { .. }));
    }

    #[test]
    fn refusals_and_other_failures_keep_their_kind() {
        let refused = classify_failure("useradd".into(), "useradd: Permission denied.", Some(1));
        assert!(matches!(refused, ProvisionError::Permission { .. }));

        let other = classify_failure("useradd".into(), "useradd: user 'oracle' already exists", Some(9));
        assert!(matches!(
            other,
            ProvisionError::ProcessFailed { code: Some(9), .. }
        ));
    }

    #[test]
    fn host_matches_target_os() {
        let host = PlatformKind::host();
        if cfg!(windows) {
            assert_eq!(host, PlatformKind::Windows);
        } else {
            assert_eq!(host, PlatformKind::Linux);
        }
    }

    #[test]
    fn platform_kind_serializes_lowercase() {
        let json = serde_json::to_string(&PlatformKind::Windows).unwrap();
        assert_eq!(json, "\"windows\"");
        assert_eq!(PlatformKind::Linux.to_string(), "linux");
    }

    #[test]
    fn for_kind_returns_matching_adapter() {
        assert_eq!(for_kind(PlatformKind::Linux).kind(), PlatformKind::Linux);
        assert_eq!(for_kind(PlatformKind::Windows).kind(), PlatformKind::Windows);
        assert!(!for_kind(PlatformKind::Linux).host_agnostic());
    }

    #[test]
    fn principal_primary_group_is_first() {
        let p = Principal::new("oracle").with_groups(vec!["oinstall".into(), "dba".into()]);
        assert_eq!(p.primary_group(), Some("oinstall"));
        assert_eq!(Principal::new("x").primary_group(), None);
    }

    #[test]
    fn access_grant_builder() {
        let grant = AccessGrant::owner("oracle").group("oinstall").mode(0o775);
        assert_eq!(grant.group.as_deref(), Some("oinstall"));
        assert_eq!(grant.mode, Some(0o775));
        assert!(grant.recursive);
    }

    #[test]
    fn env_name_validation() {
        assert!(is_valid_env_name("ORACLE_HOME"));
        assert!(is_valid_env_name("_X1"));
        assert!(!is_valid_env_name("1ABC"));
        assert!(!is_valid_env_name("A-B"));
        assert!(!is_valid_env_name(""));
    }
}
