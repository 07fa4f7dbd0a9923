//! yaysh common types, errors, and persistence foundations.
//!
//! This crate provides the pieces shared across yaysh crates:
//! - Unified error type with category classification
//! - Config directory resolution (CLI → env → XDG → home fallback)
//! - Identity persistence and first-run sentinel handling

pub mod error;
pub mod identity;
pub mod paths;

pub use error::{Error, ErrorCategory, Result};
pub use identity::{is_first_run, mark_setup_complete, Identity, SetupOutcome};
pub use paths::{resolve_config_dir, ConfigDir, ConfigSource};
