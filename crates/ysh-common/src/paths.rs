//! Config directory resolution and well-known file names.
//!
//! Resolution order: CLI argument → environment variable → XDG config
//! directory → home-relative fallback. The surrounding application owns the
//! directory; this module only locates (and creates) it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the config directory.
pub const ENV_CONFIG_DIR: &str = "YAYSH_CONFIG_DIR";

/// Application name for XDG directories.
const APP_NAME: &str = "yaysh";

/// Identity file holding the username.
pub const USER_FILE: &str = "user";

/// Identity file holding the hostname.
pub const HOSTNAME_FILE: &str = "hostname";

/// Sentinel file whose presence marks first-run setup as complete.
/// Name preserved from the original application.
pub const SENTINEL_FILE: &str = "dontdeletethis.file";

/// Where the config directory was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via YAYSH_CONFIG_DIR.
    Environment,

    /// XDG config directory (~/.config/yaysh).
    #[default]
    XdgConfig,

    /// ~/.yaysh when no XDG config directory exists.
    HomeFallback,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::HomeFallback => write!(f, "home fallback"),
        }
    }
}

/// Resolved config directory plus its provenance, for diagnostics.
#[derive(Debug, Clone)]
pub struct ConfigDir {
    path: PathBuf,
    source: ConfigSource,
}

impl ConfigDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> ConfigSource {
        self.source
    }

    pub fn user_file(&self) -> PathBuf {
        self.path.join(USER_FILE)
    }

    pub fn hostname_file(&self) -> PathBuf {
        self.path.join(HOSTNAME_FILE)
    }

    pub fn sentinel_file(&self) -> PathBuf {
        self.path.join(SENTINEL_FILE)
    }
}

/// Resolve the config directory and make sure it exists.
///
/// Resolution order:
/// 1. Explicit CLI path (if provided)
/// 2. YAYSH_CONFIG_DIR environment variable
/// 3. XDG config directory (~/.config/yaysh)
/// 4. ~/.yaysh
pub fn resolve_config_dir(cli: Option<&Path>) -> Result<ConfigDir> {
    let (path, source) = if let Some(p) = cli {
        (p.to_path_buf(), ConfigSource::CliArgument)
    } else if let Some(p) = std::env::var_os(ENV_CONFIG_DIR).filter(|v| !v.is_empty()) {
        (PathBuf::from(p), ConfigSource::Environment)
    } else if let Some(base) = dirs::config_dir() {
        (base.join(APP_NAME), ConfigSource::XdgConfig)
    } else if let Some(home) = dirs::home_dir() {
        (home.join(format!(".{APP_NAME}")), ConfigSource::HomeFallback)
    } else {
        return Err(Error::ConfigDirUnavailable);
    };

    std::fs::create_dir_all(&path).map_err(|source| Error::Filesystem {
        op: "create config directory",
        path: path.clone(),
        source,
    })?;

    tracing::debug!(path = %path.display(), source = %source, "resolved config directory");
    Ok(ConfigDir { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cfg");
        let resolved = resolve_config_dir(Some(&target)).unwrap();
        assert_eq!(resolved.path(), target.as_path());
        assert_eq!(resolved.source(), ConfigSource::CliArgument);
        assert!(target.is_dir(), "directory should have been created");
    }

    #[test]
    fn well_known_files_live_under_the_dir() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_config_dir(Some(dir.path())).unwrap();
        assert_eq!(resolved.user_file(), dir.path().join("user"));
        assert_eq!(resolved.hostname_file(), dir.path().join("hostname"));
        assert_eq!(
            resolved.sentinel_file(),
            dir.path().join("dontdeletethis.file")
        );
    }

    #[test]
    fn source_display_is_human_readable() {
        assert_eq!(ConfigSource::Environment.to_string(), "environment variable");
        assert_eq!(ConfigSource::XdgConfig.to_string(), "XDG config");
    }
}
