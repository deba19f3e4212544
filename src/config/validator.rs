//! Configuration validation rules.
//!
//! This module validates an [`InstallConfig`] before any step is built:
//! - Paths must be absolute
//! - Database identifiers and character sets must be well formed
//! - Memory percentage must be in range
//! - Passwords must be present and satisfy the password policy
//! - Template overrides and the archive checksum must be usable

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::schema::InstallConfig;
use crate::error::{ProvisionError, Result};

static SID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]{0,11}$").expect("valid regex"));

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid regex"));

static CHARSET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid regex"));

/// Minimum password length accepted by the password policy.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Highest memory share the database may claim.
pub const MAX_MEMORY_PERCENTAGE: u8 = 95;

/// Validation problem with context.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Rule identifier
    pub rule: String,
    /// Config field the issue is about
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationIssue {
    fn new(rule: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a configuration and return all issues.
///
/// Collects every problem rather than stopping at the first one, so an
/// operator can fix a config file in one pass.
pub fn validate_config(config: &InstallConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    issues.extend(validate_paths(config));
    issues.extend(validate_database(config));
    issues.extend(validate_account(config));
    issues.extend(validate_credentials(config));
    issues.extend(validate_source(config));
    issues.extend(validate_templates(config));

    issues
}

fn validate_paths(config: &InstallConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut check = |field: &str, path: &Path| {
        if !is_absolute(path) {
            issues.push(ValidationIssue::new(
                "relative-path",
                field,
                format!("'{}' must be an absolute path: {}", field, path.display()),
            ));
        }
    };

    check("oracle_base", &config.oracle_base);
    check("oracle_home", &config.oracle_home);
    check("inventory", &config.inventory);
    check("data_dir", &config.data_dir());
    check("staging_dir", &config.staging_dir());
    check("source.location", &config.source.location);

    if !config.oracle_home.starts_with(&config.oracle_base) {
        tracing::warn!(
            "oracle_home {} is outside oracle_base {}",
            config.oracle_home.display(),
            config.oracle_base.display()
        );
    }

    issues
}

/// Absolute on the host, or a Windows drive/UNC path when validating a
/// Windows config elsewhere.
fn is_absolute(path: &Path) -> bool {
    if path.is_absolute() {
        return true;
    }
    let text = path.to_string_lossy();
    let bytes = text.as_bytes();
    text.starts_with("\\\\")
        || (bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'\\' || bytes[2] == b'/'))
}

fn validate_database(config: &InstallConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let db = &config.database;

    if !SID_PATTERN.is_match(&db.sid) {
        issues.push(ValidationIssue::new(
            "invalid-sid",
            "database.sid",
            format!(
                "SID '{}' must start with a letter and hold at most 12 letters or digits",
                db.sid
            ),
        ));
    }

    if let Some(pdb) = &db.pdb_name {
        if !NAME_PATTERN.is_match(pdb) {
            issues.push(ValidationIssue::new(
                "invalid-pdb-name",
                "database.pdb_name",
                format!("PDB name '{}' is not a valid identifier", pdb),
            ));
        }
    }

    for (field, value) in [
        ("database.character_set", &db.character_set),
        ("database.national_character_set", &db.national_character_set),
    ] {
        if !CHARSET_PATTERN.is_match(value) {
            issues.push(ValidationIssue::new(
                "invalid-character-set",
                field,
                format!("character set '{}' must be an upper-case identifier", value),
            ));
        }
    }

    if db.memory_percentage == 0 || db.memory_percentage > MAX_MEMORY_PERCENTAGE {
        issues.push(ValidationIssue::new(
            "memory-percentage",
            "database.memory_percentage",
            format!(
                "memory percentage {} must be between 1 and {}",
                db.memory_percentage, MAX_MEMORY_PERCENTAGE
            ),
        ));
    }

    issues
}

fn validate_account(config: &InstallConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if !NAME_PATTERN.is_match(&config.account.name) {
        issues.push(ValidationIssue::new(
            "invalid-account",
            "account.name",
            format!("account name '{}' is not valid", config.account.name),
        ));
    }

    for group in config.account.groups() {
        if !NAME_PATTERN.is_match(&group) {
            issues.push(ValidationIssue::new(
                "invalid-group",
                "account.groups",
                format!("group name '{}' is not valid", group),
            ));
        }
    }

    match &config.account.password {
        None => issues.push(ValidationIssue::new(
            "missing-password",
            "account.password",
            "account password is required (set it in the file or PROVISION_ACCOUNT_PASSWORD)",
        )),
        Some(password) => {
            if let Err(e) = validate_password(password) {
                issues.push(ValidationIssue::new(
                    "weak-password",
                    "account.password",
                    format!("account password: {}", policy_message(&e)),
                ));
            }
        }
    }

    issues
}

fn validate_credentials(config: &InstallConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let creds = &config.credentials;

    for (field, value, env) in [
        (
            "credentials.sys_password",
            creds.sys_password.as_deref(),
            "PROVISION_SYS_PASSWORD",
        ),
        (
            "credentials.system_password",
            creds.system_password.as_deref(),
            "PROVISION_SYSTEM_PASSWORD",
        ),
    ] {
        match value {
            None => issues.push(ValidationIssue::new(
                "missing-password",
                field,
                format!("{} is required (set it in the file or {})", field, env),
            )),
            Some(password) => {
                if let Err(e) = validate_password(password) {
                    issues.push(ValidationIssue::new(
                        "weak-password",
                        field,
                        format!("{}: {}", field, policy_message(&e)),
                    ));
                }
            }
        }
    }

    if let Some(password) = creds.pdb_admin_password.as_deref() {
        if let Err(e) = validate_password(password) {
            issues.push(ValidationIssue::new(
                "weak-password",
                "credentials.pdb_admin_password",
                format!("credentials.pdb_admin_password: {}", policy_message(&e)),
            ));
        }
    }

    issues
}

fn validate_source(config: &InstallConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if config.source.archive.trim().is_empty() {
        issues.push(ValidationIssue::new(
            "missing-archive",
            "source.archive",
            "archive file name must not be empty",
        ));
    }

    if let Some(digest) = &config.source.sha256 {
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            issues.push(ValidationIssue::new(
                "invalid-checksum",
                "source.sha256",
                "sha256 must be 64 hexadecimal characters",
            ));
        }
    }

    issues
}

fn validate_templates(config: &InstallConfig) -> Vec<ValidationIssue> {
    [
        (
            "templates.install_response",
            config.templates.install_response.as_deref(),
        ),
        (
            "templates.dbca_response",
            config.templates.dbca_response.as_deref(),
        ),
    ]
    .into_iter()
    .filter_map(|(field, path)| path.map(|p| (field, p)))
    .filter(|(_, path)| !path.exists())
    .map(|(field, path)| {
        ValidationIssue::new(
            "missing-template",
            field,
            format!("template override not found: {}", path.display()),
        )
    })
    .collect()
}

/// Check a password against the account password policy.
///
/// # Errors
///
/// Returns a validation error if the password is shorter than
/// [`MIN_PASSWORD_LEN`] or lacks an upper-case letter, a lower-case letter,
/// or a digit.
pub fn validate_password(password: &str) -> Result<()> {
    let mut missing = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        missing.push(format!("at least {} characters", MIN_PASSWORD_LEN));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push("an upper-case letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        missing.push("a lower-case letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProvisionError::validation(format!(
            "password must contain {}",
            missing.join(", ")
        )))
    }
}

fn policy_message(err: &ProvisionError) -> String {
    match err {
        ProvisionError::Validation { message } => message.clone(),
        other => other.to_string(),
    }
}

/// Validate configuration, returning a single error with all issues.
pub fn validate(config: &InstallConfig) -> Result<()> {
    let issues = validate_config(config);

    if issues.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = issues.iter().map(|e| e.message.clone()).collect();
        Err(ProvisionError::validation(messages.join("; ")))
    }
}
