//! External command execution with elevation, timeout, and output capture.
//!
//! Commands are handed to a shell interpreter (`sh -c`, or the elevation
//! helper's `-c` when elevated). Stdout and stderr are merged into one stream
//! and read incrementally with non-blocking pipes, so output can be surfaced
//! progressively; on timeout the child is terminated with SIGTERM, then
//! SIGKILL after a grace period. A hung child never blocks the caller past
//! the deadline.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::dispatch::{CommandResult, FailureKind};
use crate::probe::PrivilegeProbe;

/// Default timeout per command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default maximum captured output size in bytes (10MB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Grace period between SIGTERM and SIGKILL.
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Sentinel returned when a command produces no output at all.
pub const NO_OUTPUT_SENTINEL: &str = "(no output)";

/// What to do when elevation is requested but no helper is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElevationFallback {
    /// Run the command unprivileged instead (original console behavior).
    #[default]
    Degrade,
    /// Fail the request with a spawn-kind error.
    Fail,
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout applied when the caller does not supply one.
    pub default_timeout: Duration,
    /// Grace period after SIGTERM before escalating to SIGKILL.
    pub term_grace: Duration,
    /// Cap on captured output; the remainder is discarded.
    pub max_output_bytes: usize,
    /// Behavior when elevation is requested without a helper present.
    pub elevation_fallback: ElevationFallback,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            term_grace: TERM_GRACE,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            elevation_fallback: ElevationFallback::Degrade,
        }
    }
}

/// Stateless external command runner.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    config: RunnerConfig,
    probe: PrivilegeProbe,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig, probe: PrivilegeProbe) -> Self {
        Self { config, probe }
    }

    pub fn with_defaults() -> Self {
        Self::new(RunnerConfig::default(), PrivilegeProbe::default())
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `command` to completion in `cwd`, draining all output.
    pub fn run(
        &self,
        command: &str,
        elevated: bool,
        timeout: Duration,
        cwd: &Path,
    ) -> CommandResult {
        self.run_with_sink(command, elevated, timeout, cwd, &mut |_| {})
    }

    /// Run `command`, feeding each captured chunk to `sink` as it arrives.
    ///
    /// The child inherits `cwd` as its working directory (the session's, when
    /// dispatched), so delegated commands see the directory `cd` produced.
    /// The sink sees the same merged stdout+stderr stream the final result is
    /// built from, so live UIs and the synchronous contract share one path.
    pub fn run_with_sink(
        &self,
        command: &str,
        elevated: bool,
        timeout: Duration,
        cwd: &Path,
        sink: &mut dyn FnMut(&str),
    ) -> CommandResult {
        let mut cmd = match self.build_command(command, elevated, cwd) {
            Ok(cmd) => cmd,
            Err(result) => return result,
        };

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(command, error = %e, "spawn failed");
                return CommandResult::failure(
                    FailureKind::Spawn,
                    format!("Error running command: {e}"),
                );
            }
        };

        match self.capture(&mut child, timeout, sink) {
            Capture::Completed { output, status_ok } => {
                let text = if output.is_empty() {
                    NO_OUTPUT_SENTINEL.to_string()
                } else {
                    output
                };
                CommandResult {
                    exit_succeeded: status_ok,
                    output: text,
                    failure: None,
                    exit_requested: false,
                }
            }
            Capture::TimedOut => CommandResult::failure(
                FailureKind::Timeout,
                format!("Error: command timed out after {}s", timeout.as_secs()),
            ),
            Capture::Io(e) => {
                CommandResult::failure(FailureKind::Spawn, format!("Error running command: {e}"))
            }
        }
    }

    /// Build the shell invocation, consulting the probe when elevated.
    fn build_command(
        &self,
        command: &str,
        elevated: bool,
        cwd: &Path,
    ) -> Result<Command, CommandResult> {
        let mut cmd = if elevated {
            match self.probe.helper() {
                Some(helper) => {
                    debug!(helper = %helper.display(), "running elevated");
                    Command::new(helper)
                }
                None => match self.config.elevation_fallback {
                    ElevationFallback::Degrade => {
                        warn!(command, "elevation requested but no helper found, degrading");
                        Command::new("sh")
                    }
                    ElevationFallback::Fail => {
                        return Err(CommandResult::failure(
                            FailureKind::Spawn,
                            "Error: elevation requested but no elevation helper is available"
                                .to_string(),
                        ));
                    }
                },
            }
        } else {
            Command::new("sh")
        };

        cmd.arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Ok(cmd)
    }

    /// Read merged output until exit or deadline.
    fn capture(
        &self,
        child: &mut Child,
        timeout: Duration,
        sink: &mut dyn FnMut(&str),
    ) -> Capture {
        let deadline = Instant::now() + timeout;
        let max_output = self.config.max_output_bytes;
        let mut merged = Vec::with_capacity(max_output.min(65536));

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let mut chunk = vec![0u8; 8192];

        loop {
            if Instant::now() >= deadline {
                warn!("command deadline elapsed, terminating child");
                self.kill_with_grace(child);
                return Capture::TimedOut;
            }

            let mut did_read = false;

            if let Some(ref mut out) = stdout {
                if let Ok(n) = try_read_nonblocking(out, &mut chunk) {
                    if n > 0 {
                        did_read = true;
                        append_capped(&mut merged, &chunk[..n], max_output, sink);
                    }
                }
            }

            if let Some(ref mut err) = stderr {
                if let Ok(n) = try_read_nonblocking(err, &mut chunk) {
                    if n > 0 {
                        did_read = true;
                        append_capped(&mut merged, &chunk[..n], max_output, sink);
                    }
                }
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    // Child exited; drain whatever is immediately available
                    // without blocking on grandchildren holding the pipes.
                    if let Some(ref mut out) = stdout {
                        drain_available(out, &mut merged, max_output, sink);
                    }
                    if let Some(ref mut err) = stderr {
                        drain_available(err, &mut merged, max_output, sink);
                    }
                    trace!(exit_code = ?status.code(), "child exited");
                    let output = String::from_utf8_lossy(&merged).trim_end().to_string();
                    return Capture::Completed {
                        output,
                        status_ok: status.success(),
                    };
                }
                Ok(None) => {
                    if !did_read {
                        std::thread::sleep(Duration::from_millis(10));
                    }
                }
                Err(e) => {
                    debug!(error = %e, "failed to wait for child");
                    self.kill_with_grace(child);
                    return Capture::Io(e);
                }
            }
        }
    }

    /// Kill the child with SIGTERM, escalating to SIGKILL after the grace
    /// period.
    #[cfg(unix)]
    fn kill_with_grace(&self, child: &mut Child) {
        let pid = child.id() as i32;

        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
        debug!(pid, "sent SIGTERM");

        std::thread::sleep(self.config.term_grace);

        match child.try_wait() {
            Ok(Some(_)) => {
                trace!(pid, "child exited after SIGTERM");
            }
            Ok(None) => {
                warn!(pid, "child survived SIGTERM, sending SIGKILL");
                unsafe {
                    libc::kill(pid, libc::SIGKILL);
                }
                let _ = child.wait();
            }
            Err(e) => {
                debug!(pid, error = %e, "failed to check child status");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill_with_grace(&self, child: &mut Child) {
        let _ = child.kill();
        let _ = child.wait();
    }
}

enum Capture {
    Completed { output: String, status_ok: bool },
    TimedOut,
    Io(std::io::Error),
}

/// Append a chunk to the merged buffer, respecting the output cap, and feed
/// the sink with what was kept.
fn append_capped(merged: &mut Vec<u8>, chunk: &[u8], max: usize, sink: &mut dyn FnMut(&str)) {
    let space = max.saturating_sub(merged.len());
    if space == 0 {
        return;
    }
    let kept = &chunk[..chunk.len().min(space)];
    merged.extend_from_slice(kept);
    let text = String::from_utf8_lossy(kept);
    if !text.is_empty() {
        sink(&text);
    }
}

/// Drain whatever a pipe has buffered without blocking.
fn drain_available(
    pipe: &mut (impl std::io::Read + PipeFd),
    merged: &mut Vec<u8>,
    max: usize,
    sink: &mut dyn FnMut(&str),
) {
    let mut chunk = vec![0u8; 8192];
    loop {
        match try_read_nonblocking(pipe, &mut chunk) {
            Ok(0) => break,
            Ok(n) => append_capped(merged, &chunk[..n], max, sink),
            Err(_) => break,
        }
    }
}

#[cfg(unix)]
pub(crate) trait PipeFd: std::os::unix::io::AsRawFd {}
#[cfg(unix)]
impl<T: std::os::unix::io::AsRawFd> PipeFd for T {}

#[cfg(not(unix))]
pub(crate) trait PipeFd {}
#[cfg(not(unix))]
impl<T> PipeFd for T {}

/// Try to read from a pipe without blocking.
///
/// Sets O_NONBLOCK via fcntl for the read, restoring the original flags.
/// Returns Ok(0) when no data is available (EAGAIN/EWOULDBLOCK).
#[cfg(unix)]
fn try_read_nonblocking(
    stream: &mut (impl std::io::Read + PipeFd),
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let fd = stream.as_raw_fd();

    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let was_nonblocking = (flags & libc::O_NONBLOCK) != 0;
    if !was_nonblocking {
        let result = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if result < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    let result = match stream.read(buf) {
        Ok(n) => Ok(n),
        Err(e)
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.raw_os_error() == Some(libc::EAGAIN) =>
        {
            Ok(0)
        }
        Err(e) => Err(e),
    };

    if !was_nonblocking {
        unsafe {
            libc::fcntl(fd, libc::F_SETFL, flags);
        }
    }

    result
}

#[cfg(not(unix))]
fn try_read_nonblocking(
    stream: &mut (impl std::io::Read + PipeFd),
    buf: &mut [u8],
) -> std::io::Result<usize> {
    stream.read(buf)
}
