//! Child process execution with a hard wall-clock bound.
//!
//! rclone can hang on a dead network or an expired token, so every
//! invocation gets a deadline. On expiry the child is killed and reaped.

use std::ffi::OsStr;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Output of a child that ran to completion (successfully or not).
#[derive(Debug, Clone)]
pub struct Captured {
    /// Whether the exit status was success
    pub success: bool,
    /// Exit code, `None` if killed by a signal
    pub code: Option<i32>,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl Captured {
    /// Trimmed stderr, or a placeholder when the tool printed nothing.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            match self.code {
                Some(code) => format!("Unknown error (exit code {code})"),
                None => "Unknown error".to_string(),
            }
        } else {
            stderr.to_string()
        }
    }
}

/// Reasons a child produced no [`Captured`] output.
#[derive(Debug, Error)]
pub enum RunError {
    /// The program does not exist
    #[error("program not found: {0}")]
    NotFound(String),

    /// The deadline passed; the child was killed
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// Spawning or waiting failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run `program args...`, capturing output, killing it after `timeout`.
pub fn run<S: AsRef<OsStr>>(
    program: &OsStr,
    args: &[S],
    timeout: Duration,
) -> Result<Captured, RunError> {
    log::debug!(
        "Running {} {} (timeout {}s)",
        program.to_string_lossy(),
        args.iter()
            .map(|a| a.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" "),
        timeout.as_secs_f32()
    );

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RunError::NotFound(program.to_string_lossy().to_string())
            } else {
                RunError::Io(e)
            }
        })?;

    // Drain both pipes concurrently so a chatty child never blocks on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    // No deadline when the bound is too large to represent
    let deadline = Instant::now().checked_add(timeout);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RunError::Io(e));
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            let _ = child.kill();
            let _ = child.wait();
            log::debug!(
                "Killed {} after {}s",
                program.to_string_lossy(),
                timeout.as_secs_f32()
            );
            // Reader threads finish once the pipes close; they are not joined
            // because a grandchild may still hold them open.
            return Err(RunError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Captured {
        success: status.success(),
        code: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default()
}
