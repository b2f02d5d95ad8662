//! rclone CLI backend.
//!
//! Every operation is one short-lived `rclone` process:
//!
//! - `rclone listremotes` - configured remotes, one `name:` per line
//! - `rclone about name: --json` - capacity numbers for one remote
//! - `rclone version` - availability check

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::parse;
use crate::process::{self, Captured, RunError};
use crate::types::{DriveStatus, FetchError, RemoteName};

use super::Backend;

/// Default bound for `listremotes`
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound for the `version` check
const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend implementation shelling out to the rclone binary.
#[derive(Debug, Clone)]
pub struct RcloneBackend {
    binary: PathBuf,
    config_file: Option<PathBuf>,
    extra_args: Vec<String>,
    list_timeout: Duration,
}

impl Default for RcloneBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RcloneBackend {
    /// Backend using `rclone` from PATH and its default config file.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("rclone"),
            config_file: None,
            extra_args: Vec::new(),
            list_timeout: DEFAULT_LIST_TIMEOUT,
        }
    }

    /// Use a specific rclone binary
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Pass `--config <path>` to every invocation
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Arguments placed before the subcommand (global rclone flags)
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Bound for `listremotes`
    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    /// Build the argument list: global flags, subcommand args, config flag.
    fn args(&self, subcommand: &[&str]) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.extra_args.iter().map(OsString::from).collect();
        args.extend(subcommand.iter().map(OsString::from));
        if let Some(config) = &self.config_file {
            args.push(OsString::from("--config"));
            args.push(config.clone().into_os_string());
        }
        args
    }

    fn run(&self, subcommand: &[&str], timeout: Duration) -> std::result::Result<Captured, RunError> {
        process::run(self.binary.as_os_str(), &self.args(subcommand), timeout)
    }

    fn program(&self) -> String {
        self.binary.display().to_string()
    }

    /// Map runner failures for the synchronous (non-fetch) commands.
    fn run_error(&self, err: RunError, subcommand: &str) -> Error {
        match err {
            RunError::NotFound(_) => Error::ToolNotFound {
                program: self.program(),
            },
            RunError::TimedOut(after) => Error::Timeout {
                command: format!("{} {subcommand}", self.program()),
                after,
            },
            RunError::Io(e) => Error::Io(e),
        }
    }
}

impl Backend for RcloneBackend {
    fn list_remotes(&self) -> Result<Vec<RemoteName>> {
        let captured = match self.run(&["listremotes"], self.list_timeout) {
            Ok(captured) => captured,
            Err(RunError::TimedOut(after)) => {
                return Err(Error::Enumeration {
                    stderr: format!("rclone listremotes timed out after {}s", after.as_secs()),
                });
            }
            Err(e) => return Err(self.run_error(e, "listremotes")),
        };

        if !captured.success {
            return Err(Error::Enumeration {
                stderr: captured.diagnostic(),
            });
        }

        parse::parse_remote_list(&captured.stdout).map_err(|line| {
            let stderr = captured.stderr.trim();
            Error::Enumeration {
                stderr: if stderr.is_empty() {
                    format!("unexpected line in listremotes output: {line}")
                } else {
                    stderr.to_string()
                },
            }
        })
    }

    fn about(&self, remote: &RemoteName, timeout: Duration) -> DriveStatus {
        let target = remote.target();
        let outcome = match self.run(&["about", &target, "--json"], timeout) {
            Ok(captured) if captured.success => parse::parse_about(&captured.stdout)
                .map_err(|diagnostic| FetchError::CommandFailed { diagnostic }),
            Ok(captured) => Err(FetchError::CommandFailed {
                diagnostic: captured.diagnostic(),
            }),
            Err(RunError::TimedOut(after)) => Err(FetchError::Timeout {
                after_secs: after.as_secs(),
            }),
            Err(RunError::NotFound(_)) => Err(FetchError::CommandFailed {
                diagnostic: format!("`{}` not found on PATH", self.program()),
            }),
            Err(RunError::Io(e)) => Err(FetchError::CommandFailed {
                diagnostic: e.to_string(),
            }),
        };

        match &outcome {
            Ok(_) => log::debug!("Fetched usage for {remote}"),
            Err(e) => log::debug!("Fetch for {remote} failed: {e}"),
        }

        DriveStatus::at(remote.clone(), chrono::Utc::now(), outcome)
    }

    fn version(&self) -> Result<String> {
        let captured = self
            .run(&["version"], VERSION_TIMEOUT)
            .map_err(|e| self.run_error(e, "version"))?;

        if !captured.success {
            return Err(Error::Io(std::io::Error::other(captured.diagnostic())));
        }

        Ok(captured
            .stdout
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}
