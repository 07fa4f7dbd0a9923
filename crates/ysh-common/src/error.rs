//! Error types for yaysh.
//!
//! A single unified error enum with category classification, so callers can
//! group failures (config vs filesystem vs process) without matching on every
//! variant. Errors originating from command execution never cross the
//! dispatcher boundary as faults; they are converted to result values there.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for yaysh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Config directory resolution and identity file errors.
    Config,
    /// `cd`/`ls` style filesystem failures.
    Filesystem,
    /// External command could not start.
    Spawn,
    /// External command exceeded its deadline.
    Timeout,
    /// Credential backend failures.
    Persistence,
    /// Other file I/O errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Filesystem => write!(f, "filesystem"),
            ErrorCategory::Spawn => write!(f, "spawn"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Persistence => write!(f, "persistence"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for yaysh.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no usable config directory (set YAYSH_CONFIG_DIR or HOME)")]
    ConfigDirUnavailable,

    #[error("failed to read identity file {path}: {source}")]
    IdentityRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write identity file {path}: {source}")]
    IdentityWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{op} failed for {path}: {source}")]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to spawn command: {0}")]
    Spawn(String),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("credential backend failed: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ConfigDirUnavailable
            | Error::IdentityRead { .. }
            | Error::IdentityWrite { .. } => ErrorCategory::Config,
            Error::Filesystem { .. } => ErrorCategory::Filesystem,
            Error::Spawn(_) => ErrorCategory::Spawn,
            Error::Timeout(_) => ErrorCategory::Timeout,
            Error::Persistence(_) => ErrorCategory::Persistence,
            Error::Io(_) => ErrorCategory::Io,
        }
    }
}
