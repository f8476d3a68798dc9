//! Launching the target executable under a timeout.
//!
//! The [`Invoker`] trait is the seam between the suite driver and the OS:
//! [`ProcessRunner`] spawns real processes, tests substitute scripted fakes.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{BenchError, Result};
use crate::schema::{duration_ms, FailureReason};

/// Exit polling granularity.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How an invocation ended. Timing is attached by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Success,
    Failure(FailureReason),
}

/// Runs the target once with `args`, giving up after `timeout`.
///
/// Implementations never retry. `Err` is reserved for conditions that make
/// every further invocation pointless (the executable cannot be started).
pub trait Invoker {
    fn invoke(&self, args: &[String], timeout: Duration) -> Result<Completion>;
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    executable: PathBuf,
    leading_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            leading_args: Vec::new(),
            working_dir: None,
        }
    }

    /// Arguments placed before every invocation's own arguments.
    #[must_use]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Directory the target is started in.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn wait_error(&self, source: io::Error) -> BenchError {
        BenchError::Wait {
            executable: self.executable.clone(),
            source,
        }
    }
}

impl Invoker for ProcessRunner {
    fn invoke(&self, args: &[String], timeout: Duration) -> Result<Completion> {
        let mut child = self
            .command(args)
            .spawn()
            .map_err(|source| BenchError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;

        let deadline = Instant::now() + timeout;
        // Drain both pipes so a chatty target never blocks on a full buffer.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_until(&mut child, deadline).map_err(|e| self.wait_error(e))?;
        let status = match status {
            Some(status) => status,
            None => {
                debug!(pid = child.id(), ?timeout, "terminating target");
                child.kill().map_err(|e| self.wait_error(e))?;
                child.wait().map_err(|e| self.wait_error(e))?;
                return Ok(timed_out(timeout));
            }
        };

        // A descendant that inherited the pipes can keep them open after the
        // target exits; output collection shares the trial deadline.
        let (Some(out), Some(err)) = (collect(stdout, deadline), collect(stderr, deadline)) else {
            debug!(?timeout, "target exited but its output pipes stayed open");
            return Ok(timed_out(timeout));
        };
        if !out.is_empty() {
            trace!(stdout = %out.trim_end(), "target output");
        }
        if status.success() {
            Ok(Completion::Success)
        } else {
            Ok(Completion::Failure(FailureReason::NonZeroExit {
                code: status.code(),
                stderr: err,
            }))
        }
    }
}

fn timed_out(timeout: Duration) -> Completion {
    Completion::Failure(FailureReason::Timeout {
        timeout_ms: duration_ms(timeout),
    })
}

fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Reads `stream` to EOF on a detached thread; the text arrives on the returned channel.
fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<Receiver<String>> {
    stream.map(|mut s| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = s.read_to_end(&mut buf);
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
        rx
    })
}

/// Output of a drain thread, or `None` if the pipe is still open at `deadline`.
fn collect(rx: Option<Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(rx) = rx else {
        return Some(String::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}
