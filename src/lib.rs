//! Provision - Unattended database software installation.
//!
//! Provision installs database software and creates a database on a fresh
//! Linux or Windows host without an operator at the keyboard. The install
//! is a list of idempotent steps; each step checks whether its target state
//! already holds and only acts when it does not, so a run can be repeated
//! safely after a failure.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, validation, and templates
//! - [`error`] - Error types and result aliases
//! - [`plan`] - The install sequence for each platform
//! - [`platform`] - OS-specific operations behind one trait
//! - [`runner`] - Sequential, fail-fast step execution and reports
//! - [`secrets`] - Output masking for passwords
//! - [`shell`] - External process execution
//! - [`steps`] - The builtin step kinds
//! - [`ui`] - Interactive prompts, spinners, and terminal output
//!
//! # Example
//!
//! ```
//! use provision::platform::MockPlatform;
//! use provision::runner::Runner;
//! use provision::steps::{EnsureUser, Step};
//! # use provision::config::parse_config;
//! # use std::path::Path;
//! # let config = parse_config(r#"
//! # oracle_base: /u01/app/oracle
//! # oracle_home: /u01/app/oracle/product/19.0.0/dbhome_1
//! # inventory: /u01/app/oraInventory
//! # source: { location: /mnt/media, archive: db_home.zip }
//! # database: { sid: ORCL }
//! # account: { name: oracle }
//! # "#, Path::new("provision.yml")).unwrap();
//!
//! let platform = MockPlatform::new();
//! let steps: Vec<Box<dyn Step>> = vec![Box::new(EnsureUser::new("oracle", None, vec![]))];
//! let runner = Runner::new(&config, &platform).unwrap();
//!
//! assert!(runner.run(&steps).success());
//! // A second run finds the account and skips the step.
//! assert_eq!(runner.run(&steps).results[0].status, provision::steps::StepStatus::Skipped);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod plan;
pub mod platform;
pub mod runner;
pub mod secrets;
pub mod shell;
pub mod steps;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ProvisionError, Result};
