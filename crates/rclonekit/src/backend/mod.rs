use std::time::Duration;

use crate::error::Result;
use crate::types::{DriveStatus, RemoteName};

pub mod rclone;

/// Backend trait for remote queries
///
/// This trait abstracts the underlying implementation, allowing us to:
/// - Shell out to the rclone CLI
/// - Later talk to a running `rclone rcd` instead
/// - Mock for testing
///
/// Implementations are shared across worker threads.
pub trait Backend: Send + Sync {
    /// List the remotes rclone knows about, in the order it prints them.
    ///
    /// An empty list is not an error: it is the normal first-run state.
    fn list_remotes(&self) -> Result<Vec<RemoteName>>;

    /// Query capacity for one remote, giving up after `timeout`.
    ///
    /// Never fails: errors are reported inside the returned status.
    fn about(&self, remote: &RemoteName, timeout: Duration) -> DriveStatus;

    /// Version line of the underlying tool; doubles as an availability check.
    fn version(&self) -> Result<String>;
}
