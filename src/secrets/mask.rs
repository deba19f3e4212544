//! Masking of credential values in log lines and messages.

use crate::config::InstallConfig;
use crate::shell::Invocation;

/// Replaces registered secret values with a fixed mask.
///
/// Longer secrets are replaced first so a secret that contains another one
/// is never left half-visible.
///
/// # Example
///
/// ```
/// use provision::secrets::OutputMasker;
///
/// let mut masker = OutputMasker::new();
/// masker.add_secret("Welcome1x");
///
/// let output = masker.mask("chpasswd oracle:Welcome1x");
/// assert_eq!(output, "chpasswd oracle:********");
/// ```
#[derive(Debug, Clone)]
pub struct OutputMasker {
    secrets: Vec<String>,
    mask: String,
}

impl OutputMasker {
    /// Create a masker with the default mask string.
    pub fn new() -> Self {
        Self::with_mask("********")
    }

    /// Create a masker with a custom mask string.
    pub fn with_mask(mask: impl Into<String>) -> Self {
        Self {
            secrets: Vec::new(),
            mask: mask.into(),
        }
    }

    /// Create a masker that knows every password in `config`.
    pub fn from_config(config: &InstallConfig) -> Self {
        let mut masker = Self::new();
        masker.add_secrets(config.secrets());
        masker
    }

    /// Register a secret value. Empty strings and duplicates are ignored.
    pub fn add_secret(&mut self, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() || self.secrets.contains(&value) {
            return;
        }
        self.secrets.push(value);
        self.secrets.sort_by(|a, b| b.len().cmp(&a.len()));
    }

    /// Register multiple secret values.
    pub fn add_secrets(&mut self, values: impl IntoIterator<Item = impl Into<String>>) {
        for value in values {
            self.add_secret(value);
        }
    }

    /// Mask any secret values in `input`.
    pub fn mask(&self, input: &str) -> String {
        self.secrets
            .iter()
            .fold(input.to_string(), |acc, secret| acc.replace(secret, &self.mask))
    }

    /// Render an invocation for logging with secrets masked, stdin omitted.
    pub fn mask_invocation(&self, invocation: &Invocation) -> String {
        self.mask(&invocation.to_string())
    }

    /// Number of registered secrets.
    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }
}

impl Default for OutputMasker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_every_occurrence() {
        let mut masker = OutputMasker::new();
        masker.add_secret("Sys123abc");

        let output = masker.mask("sys=Sys123abc system=Sys123abc");
        assert_eq!(output, "sys=******** system=********");
    }

    #[test]
    fn longer_secret_masked_before_its_prefix() {
        let mut masker = OutputMasker::with_mask("#");
        masker.add_secret("Pass1");
        masker.add_secret("Pass1word");

        assert_eq!(masker.mask("Pass1word Pass1"), "# #");
    }

    #[test]
    fn ignores_empty_and_duplicate_secrets() {
        let mut masker = OutputMasker::new();
        masker.add_secrets(["", "abc12345", "abc12345"]);
        assert_eq!(masker.secret_count(), 1);
    }

    #[test]
    fn masks_invocation_arguments() {
        let mut masker = OutputMasker::new();
        masker.add_secret("Secret99x");
        let inv = Invocation::new("setup.exe")
            .arg("-silent")
            .arg("oracle.install.OracleHomeUserPassword=Secret99x");

        let line = masker.mask_invocation(&inv);
        assert!(line.contains("-silent"));
        assert!(!line.contains("Secret99x"));
    }

    #[test]
    fn no_masking_without_secrets() {
        let masker = OutputMasker::default();
        assert_eq!(masker.mask("plain text"), "plain text");
    }
}
