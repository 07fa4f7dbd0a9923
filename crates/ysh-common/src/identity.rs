//! Identity persistence and first-run detection.
//!
//! The username and hostname live in two plain text files under the config
//! directory, written once during first-run setup and read back to build
//! prompts. A sentinel file marks setup as complete; its absence is the sole
//! first-run signal.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths::ConfigDir;

const DEFAULT_USERNAME: &str = "User";
const DEFAULT_HOSTNAME: &str = "localhost";

/// Console identity used for prompt rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub hostname: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            hostname: DEFAULT_HOSTNAME.to_string(),
        }
    }
}

impl Identity {
    pub fn new(username: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            hostname: hostname.into(),
        }
    }

    /// Load the identity from the config directory.
    ///
    /// Missing or unreadable files fall back to the defaults per field, so
    /// this never fails; a console with no identity still gets a prompt.
    pub fn load(dir: &ConfigDir) -> Self {
        let read = |path: std::path::PathBuf, default: &str| -> String {
            match std::fs::read_to_string(&path) {
                Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
                Ok(_) => default.to_string(),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "identity file unreadable, using default");
                    default.to_string()
                }
            }
        };

        Self {
            username: read(dir.user_file(), DEFAULT_USERNAME),
            hostname: read(dir.hostname_file(), DEFAULT_HOSTNAME),
        }
    }

    /// Write both identity files (first-run setup path).
    pub fn store(&self, dir: &ConfigDir) -> Result<()> {
        for (path, value) in [
            (dir.user_file(), &self.username),
            (dir.hostname_file(), &self.hostname),
        ] {
            std::fs::write(&path, value).map_err(|source| Error::IdentityWrite {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Outcome recorded in the sentinel file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    Completed,
    Skipped,
}

impl SetupOutcome {
    fn as_str(self) -> &'static str {
        match self {
            SetupOutcome::Completed => "initialized",
            SetupOutcome::Skipped => "skipped",
        }
    }
}

/// Whether first-run setup has not yet completed.
pub fn is_first_run(dir: &ConfigDir) -> bool {
    !dir.sentinel_file().exists()
}

/// Write the sentinel marking setup as complete.
pub fn mark_setup_complete(dir: &ConfigDir, outcome: SetupOutcome) -> Result<()> {
    let path = dir.sentinel_file();
    std::fs::write(&path, outcome.as_str()).map_err(|source| Error::Filesystem {
        op: "write sentinel",
        path,
        source,
    })
}
