//! Error types for provisioning operations.
//!
//! This module defines [`ProvisionError`], the primary error type used
//! throughout the crate, the serializable [`ErrorKind`] discriminant that
//! step results carry, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Each step's `apply` returns a `ProvisionError`; the runner turns it into
//!   a failed step result and stops the run
//! - Use `ProvisionError::Other` (via `anyhow`) only for unexpected errors
//! - Messages name the thing that failed so they can be shown to operators

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Bad input parameter (config value, password policy, checksum).
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The caller lacks the rights for the requested OS mutation.
    #[error("Permission denied: {message}")]
    Permission { message: String },

    /// A prerequisite file or path does not exist.
    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    /// Filesystem operation failed on a known path.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error without path context.
    #[error("IO error: {0}")]
    IoRaw(#[from] std::io::Error),

    /// A template placeholder could not be resolved or parsed.
    #[error("Template error: {message}")]
    Template { message: String },

    /// Platform/adapter mismatch or malformed response-file schema.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An external process exceeded its allotted time.
    #[error("'{program}' timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },

    /// An external process exited unsuccessfully.
    #[error("'{program}' failed with exit code {code:?}")]
    ProcessFailed { program: String, code: Option<i32> },

    /// The run was cancelled by the operator.
    #[error("Cancelled")]
    Cancelled,

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProvisionError {
    /// Build an [`ProvisionError::Io`] that remembers the path involved.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a permission error.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a template error.
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Permission { .. } => ErrorKind::Permission,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Io { source, .. } | Self::IoRaw(source) => match source.kind() {
                std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
                std::io::ErrorKind::NotFound => ErrorKind::NotFound,
                _ => ErrorKind::Io,
            },
            Self::Template { .. } => ErrorKind::Template,
            Self::Configuration { .. }
            | Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. } => ErrorKind::Configuration,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ProcessFailed { .. } => ErrorKind::ProcessFailed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Exit code carried by a failed process, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ProcessFailed { code, .. } => *code,
            _ => None,
        }
    }
}

/// Serializable error category recorded in step results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Permission,
    NotFound,
    Io,
    Template,
    Configuration,
    Timeout,
    ProcessFailed,
    Cancelled,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Permission => "PermissionError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Io => "IOError",
            ErrorKind::Template => "TemplateError",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::ProcessFailed => "ProcessError",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Other => "Error",
        };
        write!(f, "{}", s)
    }
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
