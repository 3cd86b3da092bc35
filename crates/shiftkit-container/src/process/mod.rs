//! Captured, optionally time-bounded child process execution.
//!
//! Both the host execution target and the CLI container engine run their
//! commands through [`run_captured`], so stdout/stderr capture, exit-code
//! handling and timeout enforcement behave identically everywhere.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Tracing target for process operations.
const PROCESS_TARGET: &str = "shiftkit_container::process";

/// Interval between exit polls while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit code reported when a process was terminated by a signal.
pub const SIGNALLED_EXIT_CODE: i32 = -1;

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

impl ExecOutput {
    /// Creates an output record.
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Returns captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        self.stdout.as_str()
    }

    /// Returns captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        self.stderr.as_str()
    }

    /// Returns the exit code, [`SIGNALLED_EXIT_CODE`] when killed by a signal.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns `true` for a zero exit code.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns stdout followed by stderr.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        combined.push_str(&self.stderr);
        combined
    }
}

/// Errors raised while running a child process.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that was launched.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Waiting on or reading from the child failed.
    #[error("I/O error while running '{program}': {source}")]
    Io {
        /// Program that was running.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The child exceeded its time budget and was killed.
    #[error("'{program}' timed out after {timeout_secs}s")]
    Timeout {
        /// Program that was killed.
        program: String,
        /// Budget in seconds.
        timeout_secs: u64,
    },
}

/// Spawns `command`, captures both output streams and waits for exit.
///
/// Stdin is closed. With a `timeout`, the child is killed once the budget is
/// spent and [`ProcessError::Timeout`] is returned; without one the call
/// blocks until the child exits.
///
/// # Errors
///
/// Returns [`ProcessError`] when the program cannot be spawned, its pipes
/// fail, or the timeout elapses. A non-zero exit is not an error.
pub fn run_captured(
    mut command: Command,
    timeout: Option<Duration>,
) -> Result<ExecOutput, ProcessError> {
    let program = display_program(command.get_program());
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(
        target: PROCESS_TARGET,
        program = %program,
        args = ?command.get_args().collect::<Vec<_>>(),
        "spawning process"
    );

    let mut child = command.spawn().map_err(|err| ProcessError::Spawn {
        program: program.clone(),
        source: Arc::new(err),
    })?;

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let status = match timeout {
        Some(budget) => wait_with_timeout(&program, &mut child, budget)?,
        None => child.wait().map_err(|err| ProcessError::Io {
            program: program.clone(),
            source: Arc::new(err),
        })?,
    };

    let stdout = collect(stdout_reader);
    let stderr = collect(stderr_reader);
    let exit_code = status.code().unwrap_or(SIGNALLED_EXIT_CODE);

    debug!(
        target: PROCESS_TARGET,
        program = %program,
        exit_code,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "process exited"
    );

    Ok(ExecOutput {
        stdout,
        stderr,
        exit_code,
    })
}

fn display_program(program: &std::ffi::OsStr) -> String {
    Path::new(program).display().to_string()
}

/// Drains a pipe on its own thread so the child never blocks on a full buffer.
fn spawn_reader<R>(pipe: Option<R>) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            if reader.read_to_end(&mut bytes).is_err() {
                bytes.clear();
            }
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn collect(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn wait_with_timeout(
    program: &str,
    child: &mut Child,
    timeout: Duration,
) -> Result<ExitStatus, ProcessError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    warn!(
                        target: PROCESS_TARGET,
                        program,
                        timeout_secs = timeout.as_secs(),
                        "process timed out, killing"
                    );
                    drop(child.kill());
                    drop(child.wait());
                    return Err(ProcessError::Timeout {
                        program: program.to_owned(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                return Err(ProcessError::Io {
                    program: program.to_owned(),
                    source: Arc::new(err),
                });
            }
        }
    }
}
