//! Elevation helper detection.
//!
//! Checks a fixed list of well-known helper locations; first hit wins. Pure
//! and cheap enough to call per request, so no caching.

use std::path::{Path, PathBuf};

/// Default helper locations, preserved from the original console.
const DEFAULT_HELPER_PATHS: &[&str] = &[
    "/system/xbin/su",
    "/system/bin/su",
    "/sbin/su",
    "/vendor/bin/su",
];

/// Probe for a privilege-elevation helper on this host.
#[derive(Debug, Clone)]
pub struct PrivilegeProbe {
    paths: Vec<PathBuf>,
}

impl Default for PrivilegeProbe {
    fn default() -> Self {
        Self {
            paths: DEFAULT_HELPER_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl PrivilegeProbe {
    /// Probe a custom list of helper paths (tests, unusual layouts).
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// First helper path that exists, if any.
    pub fn helper(&self) -> Option<&Path> {
        self.paths.iter().map(PathBuf::as_path).find(|p| p.exists())
    }

    /// Whether any elevation helper is installed.
    pub fn elevation_available(&self) -> bool {
        self.helper().is_some()
    }
}
