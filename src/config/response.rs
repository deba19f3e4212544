//! Response-file templates and format checks.
//!
//! Silent installs are driven by INI-like response files: `[section]`
//! headers, `key=value` lines, blank lines and `#` comments. Default
//! templates ship inside the binary; callers can point the config at their
//! own files instead.

use std::path::Path;

use include_dir::{include_dir, Dir};

use crate::error::{ProvisionError, Result};

static TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Software-only install response file.
pub const INSTALL_RESPONSE: &str = "db_install.rsp";
/// Software-only install response file for Windows hosts.
pub const WINDOWS_INSTALL_RESPONSE: &str = "db_install_windows.rsp";
/// Database creation response file.
pub const DBCA_RESPONSE: &str = "dbca.rsp";
/// Shell limits fragment for the software owner.
pub const LIMITS_CONF: &str = "limits.conf";
/// Kernel parameter fragment.
pub const SYSCTL_CONF: &str = "sysctl.conf";

/// Look up an embedded template by file name.
pub fn builtin_template(name: &str) -> Option<&'static str> {
    TEMPLATES.get_file(name).and_then(|f| f.contents_utf8())
}

/// Names of all embedded templates.
pub fn builtin_template_names() -> Vec<&'static str> {
    let mut names: Vec<_> = TEMPLATES
        .files()
        .filter_map(|f| f.path().file_name())
        .filter_map(|n| n.to_str())
        .collect();
    names.sort_unstable();
    names
}

/// Load template text from an override path, or the embedded default.
pub fn load_template(override_path: Option<&Path>, builtin: &str) -> Result<String> {
    match override_path {
        Some(path) => {
            if !path.exists() {
                return Err(ProvisionError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            std::fs::read_to_string(path).map_err(|e| ProvisionError::io(path, e))
        }
        None => builtin_template(builtin)
            .map(str::to_string)
            .ok_or_else(|| {
                ProvisionError::configuration(format!("no built-in template named '{}'", builtin))
            }),
    }
}

/// Check that text follows the response-file line format.
///
/// # Errors
///
/// Returns a configuration error naming the first offending line.
pub fn validate_response_format(text: &str) -> Result<()> {
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            if line.ends_with(']') && line.len() > 2 {
                continue;
            }
            return Err(malformed(index, raw, "section header must be '[name]'"));
        }
        match line.split_once('=') {
            Some((key, _)) if !key.trim().is_empty() => {}
            Some(_) => return Err(malformed(index, raw, "empty key")),
            None => return Err(malformed(index, raw, "expected 'key=value'")),
        }
    }
    Ok(())
}

fn malformed(index: usize, line: &str, reason: &str) -> ProvisionError {
    ProvisionError::configuration(format!(
        "malformed response file at line {}: {} ('{}')",
        index + 1,
        reason,
        line.trim()
    ))
}

/// Parse `key=value` lines into pairs, ignoring comments and sections.
pub fn parse_response(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with(';'))
        .filter(|l| !l.starts_with('['))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}
