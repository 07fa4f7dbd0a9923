//! yaysh command console engine.
//!
//! This crate implements the console core behind the yaysh shell:
//! - Session state (working directory, identity, transcript)
//! - Builtin/delegated command dispatch
//! - External command execution with elevation and timeouts
//! - A single-writer worker keeping the foreground loop responsive

pub mod dispatch;
pub mod probe;
pub mod runner;
pub mod session;
pub mod worker;

pub use dispatch::{Builtin, CommandDispatcher, CommandResult, FailureKind};
pub use probe::PrivilegeProbe;
pub use runner::{ElevationFallback, ProcessRunner, RunnerConfig};
pub use session::Session;
pub use worker::{Console, ConsoleEvent, SubmitError};
