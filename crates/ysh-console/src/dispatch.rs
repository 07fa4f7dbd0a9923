//! Command classification and dispatch.
//!
//! A line of input is either a builtin (executed synchronously against the
//! session) or a delegated command handed to the process runner. There is no
//! "unknown command" class: anything that is not a builtin goes to the host
//! shell. Every failure on this path is converted to a [`CommandResult`];
//! nothing escapes the dispatcher as a fault.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::runner::ProcessRunner;
use crate::session::Session;

/// Distinguishes how a command failed, so callers can tell "never ran" from
/// "ran too long" from "builtin filesystem error".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Filesystem,
    Spawn,
    Timeout,
}

/// Result of dispatching one input line.
///
/// `output` always carries the display text; on failure it holds the error
/// message and `failure` names the kind. Delegated commands that print
/// nothing carry the `(no output)` sentinel, never an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub exit_succeeded: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Set by the `exit` builtin: the caller should end the session. The
    /// dispatcher itself never terminates the process.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exit_requested: bool,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_succeeded: true,
            output: output.into(),
            failure: None,
            exit_requested: false,
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            exit_succeeded: false,
            output: message.into(),
            failure: Some(kind),
            exit_requested: false,
        }
    }

    /// No-op result for empty input.
    pub fn empty() -> Self {
        Self::success("")
    }
}

/// The fixed builtin table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Ls,
    Cd(String),
    Help,
    WhoamiYay,
    Source,
    Exit,
}

impl Builtin {
    /// Classify a trimmed input line against the builtin table.
    ///
    /// Only the `"cd "` prefix takes an argument; a bare `cd` is not in the
    /// table and is delegated to the host shell like any other input.
    pub fn classify(line: &str) -> Option<Builtin> {
        match line {
            "ls" => Some(Builtin::Ls),
            "help" => Some(Builtin::Help),
            "whoamiyay" => Some(Builtin::WhoamiYay),
            "source" => Some(Builtin::Source),
            "exit" => Some(Builtin::Exit),
            _ => line
                .strip_prefix("cd ")
                .map(|rest| Builtin::Cd(rest.trim().to_string())),
        }
    }
}

/// Project link printed by the `source` builtin.
const SOURCE_URL: &str = "https://github.com/hyuuwu/yaylinux";

/// Fixed usage text returned by `help`, independent of session state.
pub fn help_text() -> String {
    format!(
        "yaysh {}\nLIST OF COMMANDS:\nhelp, ls, cd <dir>, exit, source, whoamiyay\n\
         Other commands are forwarded to the host shell.\n\
         Elevation is controlled by the 'run as root' toggle.",
        env!("CARGO_PKG_VERSION")
    )
}

/// Classifies and executes commands against a session.
///
/// Sole mutator of [`Session`]; the runner and store are stateless services.
pub struct CommandDispatcher {
    runner: ProcessRunner,
}

impl CommandDispatcher {
    pub fn new(runner: ProcessRunner) -> Self {
        Self { runner }
    }

    pub fn with_defaults() -> Self {
        Self::new(ProcessRunner::with_defaults())
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    /// Dispatch one input line synchronously.
    ///
    /// Trims the line, executes the builtin or delegated command, appends the
    /// echoed line, the output, and a fresh prompt to the transcript, and
    /// returns the result. Empty input is a no-op with no transcript
    /// mutation.
    pub fn dispatch(&self, line: &str, session: &mut Session, elevated: bool) -> CommandResult {
        let line = line.trim();
        if line.is_empty() {
            return CommandResult::empty();
        }

        let result = match Builtin::classify(line) {
            Some(builtin) => self.execute_builtin(&builtin, session),
            None => self.delegate(line, elevated, session.working_dir()),
        };

        self.record(line, &result, session);
        result
    }

    /// Execute a builtin against the session. Filesystem failures come back
    /// as result values with the session untouched.
    pub fn execute_builtin(&self, builtin: &Builtin, session: &mut Session) -> CommandResult {
        match builtin {
            Builtin::Ls => builtin_ls(session),
            Builtin::Cd(arg) => builtin_cd(session, arg),
            Builtin::Help => CommandResult::success(help_text()),
            Builtin::WhoamiYay => CommandResult::success(session.identity().username.clone()),
            Builtin::Source => CommandResult::success(format!("Open {SOURCE_URL} in a browser.")),
            Builtin::Exit => {
                let mut result = CommandResult::success("Exiting console...");
                result.exit_requested = true;
                result
            }
        }
    }

    /// Forward a non-builtin line verbatim to the runner with the default
    /// timeout, executing in the session's working directory.
    pub fn delegate(&self, line: &str, elevated: bool, cwd: &Path) -> CommandResult {
        debug!(command = line, elevated, cwd = %cwd.display(), "delegating to host shell");
        self.runner
            .run(line, elevated, self.runner.config().default_timeout, cwd)
    }

    /// Append the transcript protocol for one completed line: echoed input,
    /// output (or error text), then a freshly rendered prompt. Returns the
    /// appended block for event consumers.
    pub fn record(&self, line: &str, result: &CommandResult, session: &mut Session) -> String {
        let block = format!("{line}\n{}\n{}", result.output, session.prompt());
        session.push_transcript(block.clone());
        block
    }
}

fn builtin_ls(session: &Session) -> CommandResult {
    let dir = session.working_dir();
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let mut lines = vec![dir.display().to_string()];
            for entry in entries.flatten() {
                lines.push(entry.file_name().to_string_lossy().into_owned());
            }
            CommandResult::success(lines.join("\n"))
        }
        Err(e) => CommandResult::failure(
            FailureKind::Filesystem,
            format!("Error listing directory: {e}"),
        ),
    }
}

fn builtin_cd(session: &mut Session, arg: &str) -> CommandResult {
    let requested = Path::new(arg);
    let candidate: PathBuf = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        session.working_dir().join(requested)
    };

    let resolved = match candidate.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            return CommandResult::failure(
                FailureKind::Filesystem,
                format!("Error changing directory: {e}"),
            );
        }
    };

    if !resolved.is_dir() {
        return CommandResult::failure(
            FailureKind::Filesystem,
            format!("Error changing directory: {} is not a directory", resolved.display()),
        );
    }

    session.set_working_dir(resolved.clone());
    CommandResult::success(format!("Directory changed to: {}", resolved.display()))
}
