//! Single-writer console worker.
//!
//! The foreground loop submits lines into a bounded queue; one worker thread
//! executes them strictly in submission order and applies all session
//! mutations. Delegated commands run without the session lock held, so a
//! blocked child never prevents a concurrent prompt render.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::debug;

use crate::dispatch::{Builtin, CommandDispatcher, CommandResult};
use crate::session::Session;

/// Default submission queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 16;

/// Events delivered to the foreground loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// A transcript block was appended (echoed line, output, prompt).
    Line(String),
    /// The `exit` builtin ran; the session is over.
    Exited,
}

/// Why a submission was not accepted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("command queue is full, try again once the running command finishes")]
    QueueFull,
    #[error("console worker has shut down")]
    Closed,
}

/// Handle to a running console: submission queue, shared session, worker.
pub struct Console {
    session: Arc<Mutex<Session>>,
    elevated: Arc<AtomicBool>,
    tx: Option<SyncSender<String>>,
    handle: Option<JoinHandle<()>>,
}

impl Console {
    /// Start a console worker over `session`.
    ///
    /// Returns the handle and the event receiver for transcript updates.
    pub fn spawn(dispatcher: CommandDispatcher, session: Session) -> (Self, Receiver<ConsoleEvent>) {
        Self::spawn_with_queue_depth(dispatcher, session, DEFAULT_QUEUE_DEPTH)
    }

    pub fn spawn_with_queue_depth(
        dispatcher: CommandDispatcher,
        session: Session,
        queue_depth: usize,
    ) -> (Self, Receiver<ConsoleEvent>) {
        let session = Arc::new(Mutex::new(session));
        let elevated = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::sync_channel::<String>(queue_depth);
        let (event_tx, event_rx) = mpsc::channel();

        let worker_session = Arc::clone(&session);
        let worker_elevated = Arc::clone(&elevated);
        let handle = std::thread::spawn(move || {
            debug!("console worker started");
            for line in rx {
                let line = line.trim().to_string();
                let elevated = worker_elevated.load(Ordering::Relaxed);
                let result = Self::execute(&dispatcher, &worker_session, &line, elevated);

                let block = {
                    let mut session = worker_session.lock().expect("session lock poisoned");
                    dispatcher.record(&line, &result, &mut session)
                };
                if event_tx.send(ConsoleEvent::Line(block)).is_err() {
                    break;
                }
                if result.exit_requested {
                    let _ = event_tx.send(ConsoleEvent::Exited);
                    break;
                }
            }
            debug!("console worker stopped");
        });

        (
            Self {
                session,
                elevated,
                tx: Some(tx),
                handle: Some(handle),
            },
            event_rx,
        )
    }

    /// Execute one (trimmed) line. Builtins hold the session lock only for
    /// their own (fast, filesystem-local) duration; delegated commands run
    /// with no lock held at all, against a snapshot of the working directory.
    fn execute(
        dispatcher: &CommandDispatcher,
        session: &Arc<Mutex<Session>>,
        line: &str,
        elevated: bool,
    ) -> CommandResult {
        match Builtin::classify(line) {
            Some(builtin) => {
                let mut session = session.lock().expect("session lock poisoned");
                dispatcher.execute_builtin(&builtin, &mut session)
            }
            None => {
                let cwd = {
                    let session = session.lock().expect("session lock poisoned");
                    session.working_dir().to_path_buf()
                };
                dispatcher.delegate(line, elevated, &cwd)
            }
        }
    }

    /// Queue a line for execution.
    ///
    /// Lines run in submission order. When the bounded queue is full the
    /// caller is told immediately via [`SubmitError::QueueFull`]; nothing is
    /// dropped silently.
    pub fn submit(&self, line: impl Into<String>) -> Result<(), SubmitError> {
        let line = line.into();
        if line.trim().is_empty() {
            return Ok(());
        }
        match self.tx.as_ref().ok_or(SubmitError::Closed)?.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SubmitError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::Closed),
        }
    }

    /// Persistent elevation toggle consulted per delegated command.
    pub fn set_elevated(&self, elevated: bool) {
        self.elevated.store(elevated, Ordering::Relaxed);
    }

    /// Render the current prompt. Locks the session only long enough to
    /// format the string.
    pub fn prompt(&self) -> String {
        self.session.lock().expect("session lock poisoned").prompt()
    }

    /// Snapshot of the current working directory.
    pub fn working_dir(&self) -> std::path::PathBuf {
        self.session
            .lock()
            .expect("session lock poisoned")
            .working_dir()
            .to_path_buf()
    }

    /// Close the queue and wait for in-flight work to finish.
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
