//! External process transport.
//!
//! Every remote step in a run is a local `smbclient` or `winexe` process.
//! [`ProcessTransport`] runs one such process under a time budget and reports
//! its exit code, captured output, and whether the budget expired. Non-zero
//! exits and timeouts are data; only a failure to start or wait for the
//! process is an error.

use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::pin::{Pin, pin};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Exit code reported for a process killed because its budget expired.
pub const TIMEOUT_EXIT_CODE: i32 = -9;

/// Exit code recorded when a transport could not start at all.
pub const NOT_STARTED_EXIT_CODE: i32 = -1;

/// Maximum bytes captured per stream; further output is drained and dropped.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// How long output pipes may stay open after the process has exited.
/// Background children that inherited the pipes would otherwise hold the
/// run open until its budget expires.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A single external command with its time budget.
#[derive(Clone, Eq, PartialEq)]
pub struct Invocation {
    /// Program to execute, resolved through `PATH` when not absolute.
    pub program: String,
    /// Arguments passed verbatim, without a shell.
    pub args: Vec<OsString>,
    /// Time allowed before the process is killed.
    pub timeout: Duration,
}

impl Invocation {
    /// Creates an invocation for `program` with `args` and `timeout`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<OsString>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

// Arguments carry credentials, so Debug output only reports their count.
impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &format_args!("[{} redacted]", self.args.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Outcome of one transport call. Never mutated after creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhaseOutcome {
    /// Exit code reported by the process, [`TIMEOUT_EXIT_CODE`] when killed
    /// for exceeding its budget, or a negated signal number.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the time budget expired before the process exited.
    pub timed_out: bool,
}

impl PhaseOutcome {
    /// Returns `true` when the process exited with code zero in time.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Folds a transport error into an outcome so callers can treat it as a
    /// failed step.
    #[must_use]
    pub fn not_started(err: &TransportError) -> Self {
        Self {
            exit_code: NOT_STARTED_EXIT_CODE,
            stdout: String::new(),
            stderr: err.to_string(),
            timed_out: false,
        }
    }
}

/// Errors raised when a process cannot be run at all.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    /// Raised when the command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when waiting on a running command fails.
    #[error("failed to wait for {program}: {message}")]
    Wait {
        /// Command being awaited.
        program: String,
        /// Operating system error string.
        message: String,
    },
}

/// Future returned by transport calls.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PhaseOutcome, TransportError>> + Send + 'a>>;

/// Abstraction over process execution to support fakes in tests.
pub trait ProcessTransport {
    /// Runs `invocation`, capturing stdout and stderr, and resolves once the
    /// process exits or its budget expires.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the process cannot be started or
    /// awaited. Non-zero exits and timeouts are reported in the outcome.
    fn run<'a>(&'a self, invocation: &'a Invocation) -> TransportFuture<'a>;
}

/// Real transport that spawns processes on the tokio runtime.
#[derive(Clone, Debug, Default)]
pub struct TokioProcessTransport;

impl ProcessTransport for TokioProcessTransport {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> TransportFuture<'a> {
        Box::pin(run_process(invocation))
    }
}

async fn run_process(invocation: &Invocation) -> Result<PhaseOutcome, TransportError> {
    debug!(
        program = %invocation.program,
        timeout_secs = invocation.timeout.as_secs(),
        "spawning transport process"
    );

    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| TransportError::Spawn {
            program: invocation.program.clone(),
            message: err.to_string(),
        })?;

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    // Buffers live outside the timed future so output read before a kill
    // survives cancellation.
    let waited = timeout(invocation.timeout, async {
        let mut output = pin!(async {
            tokio::join!(
                drain(stdout_pipe.as_mut(), &mut stdout, &invocation.program, "stdout"),
                drain(stderr_pipe.as_mut(), &mut stderr, &invocation.program, "stderr"),
            )
        });
        let mut exited = pin!(child.wait());
        tokio::select! {
            _ = &mut output => exited.await,
            status = &mut exited => {
                if timeout(EXIT_DRAIN_GRACE, output).await.is_err() {
                    debug!(
                        program = %invocation.program,
                        "output still open after exit; keeping what was read"
                    );
                }
                status
            }
        }
    })
    .await;

    let (exit_code, timed_out) = match waited {
        Ok(Ok(status)) => (exit_code_of(status), false),
        Ok(Err(err)) => {
            return Err(TransportError::Wait {
                program: invocation.program.clone(),
                message: err.to_string(),
            });
        }
        Err(_elapsed) => {
            if let Err(err) = child.kill().await {
                debug!(program = %invocation.program, error = %err, "kill after timeout failed");
            }
            (TIMEOUT_EXIT_CODE, true)
        }
    };

    debug!(
        program = %invocation.program,
        exit_code,
        timed_out,
        "transport process finished"
    );

    Ok(PhaseOutcome {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        timed_out,
    })
}

/// Reads `reader` to EOF, appending at most [`MAX_OUTPUT_BYTES`] to `buf`.
/// Returns whether anything was dropped. Read errors end the capture; the
/// exit status still decides the outcome.
async fn drain<R: AsyncRead + Unpin>(
    reader: Option<&mut R>,
    buf: &mut Vec<u8>,
    program: &str,
    stream: &str,
) -> bool {
    let Some(pipe) = reader else {
        return false;
    };
    let mut truncated = false;
    let mut chunk = [0_u8; READ_CHUNK_BYTES];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => return truncated,
            Ok(read) => {
                let room = MAX_OUTPUT_BYTES.saturating_sub(buf.len());
                let keep = read.min(room);
                if let Some(bytes) = chunk.get(..keep) {
                    buf.extend_from_slice(bytes);
                }
                if keep < read && !truncated {
                    truncated = true;
                    warn!(
                        program,
                        stream,
                        limit_bytes = MAX_OUTPUT_BYTES,
                        "transport output exceeded capture limit; truncating"
                    );
                }
            }
            Err(err) => {
                debug!(program, stream, error = %err, "stopped reading transport output");
                return truncated;
            }
        }
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return signal.saturating_neg();
        }
    }
    NOT_STARTED_EXIT_CODE
}
