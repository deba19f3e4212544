//! Idempotent provisioning steps.
//!
//! A [`Step`] pairs a read-only precondition check with a mutation. The
//! runner calls `apply` only when `check` reports the target state is not
//! already in place, so a sequence can be re-run safely after a partial
//! failure.
//!
//! Builtin steps:
//!
//! - [`EnsureUser`] - service account and its groups
//! - [`EnsureDirectory`] - directory tree
//! - [`SetPermissions`] - ownership and access on a path
//! - [`ExtractArchive`] - staged unpacking of install media
//! - [`RenderTemplate`] - response files and config fragments
//! - [`RunExternalProcess`] - installer, assistants and root scripts
//! - [`SetPersistentEnvVar`] - machine or account environment
//! - [`RegisterService`] - auto-start at boot
//!
//! # Example
//!
//! ```
//! use provision::steps::{EnsureDirectory, Step, StepContext};
//! use provision::platform::MockPlatform;
//! # use provision::config::parse_config;
//! # let config = parse_config(r#"
//! # oracle_base: /u01/app/oracle
//! # oracle_home: /u01/app/oracle/product/19.0.0/dbhome_1
//! # inventory: /u01/app/oraInventory
//! # source: { location: /mnt, archive: db.zip }
//! # database: { sid: ORCL }
//! # account: { name: oracle }
//! # "#, std::path::Path::new("provision.yml")).unwrap();
//!
//! let temp = tempfile::TempDir::new().unwrap();
//! let step = EnsureDirectory::new(vec![temp.path().join("a"), temp.path().join("a/b")]);
//! let platform = MockPlatform::new();
//! let ctx = StepContext::new(&config, &platform);
//!
//! assert!(!step.check(&ctx).complete);
//! step.apply(&ctx).unwrap();
//! assert!(step.check(&ctx).complete);
//! ```

pub mod archive;
pub mod check;
pub mod context;
pub mod directory;
pub mod env_var;
pub mod permissions;
pub mod process;
pub mod result;
pub mod service;
pub mod template;
pub mod user;

pub use archive::{ExtractArchive, DEFAULT_MARKER};
pub use check::CheckResult;
pub use context::StepContext;
pub use directory::EnsureDirectory;
pub use env_var::SetPersistentEnvVar;
pub use permissions::SetPermissions;
pub use process::RunExternalProcess;
pub use result::{Applied, StepFailure, StepResult, StepStatus};
pub use service::RegisterService;
pub use template::RenderTemplate;
pub use user::EnsureUser;

use crate::error::Result;

/// One named, idempotent unit of provisioning work.
pub trait Step: Send {
    /// Name shown in progress output and reports.
    fn name(&self) -> &str;

    /// One-line description of what `apply` would do.
    fn describe(&self) -> String;

    /// Whether the target state already holds. Must not mutate anything.
    fn check(&self, ctx: &StepContext<'_>) -> CheckResult;

    /// Bring the system into the target state.
    fn apply(&self, ctx: &StepContext<'_>) -> Result<Applied>;
}
