//! Rendering of response files and config fragments.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{render, validate_response_format};
use crate::error::{ProvisionError, Result};
use crate::platform::AccessGrant;
use crate::steps::{Applied, CheckResult, Step, StepContext};

/// Render a `${name}` template to a file, atomically.
#[derive(Debug, Clone)]
pub struct RenderTemplate {
    name: String,
    template: String,
    bindings: BTreeMap<String, String>,
    output: PathBuf,
    secret: bool,
    owner: Option<String>,
    response_file: bool,
}

impl RenderTemplate {
    pub fn new(
        template: impl Into<String>,
        bindings: BTreeMap<String, String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        let output = output.into();
        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            name: format!("render {}", file_name),
            template: template.into(),
            bindings,
            output,
            secret: false,
            owner: None,
            response_file: false,
        }
    }

    /// The rendered file holds credentials: owner-only access.
    pub fn secret(mut self, secret: bool) -> Self {
        self.secret = secret;
        self
    }

    /// Account that must be able to read the output.
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Check the rendering against the response-file line format.
    pub fn response_file(mut self, check: bool) -> Self {
        self.response_file = check;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// The text this step writes.
    pub fn render(&self) -> Result<String> {
        let text = render(&self.template, &self.bindings)?;
        if self.response_file {
            validate_response_format(&text)?;
        }
        Ok(text)
    }
}

impl Step for RenderTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        let mut text = format!("Write {}", self.output.display());
        if self.secret {
            text.push_str(" (owner-only)");
        }
        text
    }

    fn check(&self, _ctx: &StepContext<'_>) -> CheckResult {
        let rendered = match self.render() {
            Ok(text) => text,
            Err(e) => return CheckResult::unknown("Rendering template", &e),
        };
        match fs::read_to_string(&self.output) {
            Ok(existing) if existing == rendered => {
                CheckResult::complete(format!("File up to date: {}", self.output.display()))
            }
            Ok(_) => CheckResult::incomplete(
                format!("File differs: {}", self.output.display()),
                "Will be rewritten",
            ),
            Err(_) => CheckResult::incomplete(
                format!("File missing: {}", self.output.display()),
                "Will be written",
            ),
        }
    }

    fn apply(&self, ctx: &StepContext<'_>) -> Result<Applied> {
        let text = self.render()?;

        let dir = self
            .output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| ProvisionError::io(dir, e))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ProvisionError::io(dir, e))?;
        set_mode(temp.path(), if self.secret { 0o600 } else { 0o644 })?;
        temp.write_all(text.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| ProvisionError::io(temp.path(), e))?;
        temp.persist(&self.output)
            .map_err(|e| ProvisionError::io(&self.output, e.error))?;

        if self.secret {
            ctx.platform
                .restrict_file(&self.output, self.owner.as_deref())?;
        } else if let Some(owner) = &self.owner {
            let grant = AccessGrant::owner(owner.clone()).recursive(false);
            ctx.platform.set_owner_and_mode(&self.output, &grant)?;
        }

        tracing::debug!("Wrote {}", self.output.display());
        Ok(Applied::detail(format!("wrote {}", self.output.display())))
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| ProvisionError::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
