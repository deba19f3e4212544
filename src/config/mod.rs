//! Configuration loading, validation, and template rendering.
//!
//! This module handles all aspects of configuration:
//! - Schema definitions in [`schema`]
//! - File loading and env secret overlay in [`loader`]
//! - Validation in [`validator`]
//! - Placeholder rendering in [`template`]
//! - Response-file templates and format checks in [`response`]
//!
//! # Example
//!
//! ```
//! use provision::config::{parse_config, validate};
//! use std::path::Path;
//!
//! let yaml = r#"
//! oracle_base: /u01/app/oracle
//! oracle_home: /u01/app/oracle/product/19.0.0/dbhome_1
//! inventory: /u01/app/oraInventory
//! source: { location: /mnt/media, archive: db_home.zip }
//! database: { sid: ORCL }
//! account: { name: oracle, password: Welcome1x }
//! credentials: { sys_password: SysPass1x, system_password: SysPass2x }
//! "#;
//!
//! let config = parse_config(yaml, Path::new("provision.yml")).unwrap();
//! # #[cfg(unix)]
//! validate(&config).unwrap();
//! assert_eq!(config.database.sid, "ORCL");
//! ```

pub mod loader;
pub mod response;
pub mod schema;
pub mod template;
pub mod validator;

pub use loader::{
    apply_env_secrets, load_config, load_config_file, parse_config, resolve_config_path,
    DEFAULT_CONFIG_FILE,
};
pub use response::{builtin_template, load_template, validate_response_format};
pub use schema::{
    AccountConfig, Credentials, DatabaseConfig, Edition, InstallConfig, ServiceConfig,
    SourceConfig, TemplateOverrides, Timeouts,
};
pub use template::{parse_template, placeholders, render, Segment};
pub use validator::{validate, validate_config, validate_password, ValidationIssue};
