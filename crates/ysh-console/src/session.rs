//! Console session state.
//!
//! Holds the working directory, identity, and the append-only transcript.
//! The dispatcher is the sole mutator; everything else reads.

use std::path::{Path, PathBuf};

use ysh_common::Identity;

/// Mutable console session.
///
/// Invariant: `working_dir` always names a directory that existed at the last
/// successful `cd` (or at construction). A failed `cd` leaves it unchanged.
#[derive(Debug, Clone)]
pub struct Session {
    working_dir: PathBuf,
    identity: Identity,
    transcript: Vec<String>,
}

impl Session {
    pub fn new(working_dir: impl Into<PathBuf>, identity: Identity) -> Self {
        Self {
            working_dir: working_dir.into(),
            identity,
            transcript: Vec::new(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Transcript chunks in append order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Render the prompt.
    ///
    /// The trailing path segment is static, preserved from the original
    /// console; the live working directory is intentionally not shown.
    pub fn prompt(&self) -> String {
        format!(
            "{}@{} $ ~/ ",
            self.identity.username, self.identity.hostname
        )
    }

    pub(crate) fn push_transcript(&mut self, chunk: impl Into<String>) {
        self.transcript.push(chunk.into());
    }

    pub(crate) fn set_working_dir(&mut self, dir: PathBuf) {
        self.working_dir = dir;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_uses_identity_and_static_path() {
        let session = Session::new("/tmp", Identity::new("yay", "droid"));
        assert_eq!(session.prompt(), "yay@droid $ ~/ ");
    }

    #[test]
    fn transcript_preserves_append_order() {
        let mut session = Session::new("/tmp", Identity::default());
        session.push_transcript("first");
        session.push_transcript("second");
        assert_eq!(session.transcript(), ["first", "second"]);
    }
}
