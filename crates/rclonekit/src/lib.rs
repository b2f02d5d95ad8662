//! # rclonekit
//!
//! A Rust library for asking rclone about configured cloud-storage remotes.
//!
//! ## What it does
//!
//! - **List remotes**: `rclone listremotes`, parsed into [`RemoteName`]s
//! - **Fetch usage**: `rclone about <remote>:`, parsed into a [`DriveStatus`]
//! - **Probe**: `rclone version`, to tell "not installed" from "misconfigured"
//!
//! Every call is a separate child process with a hard deadline; a remote
//! that hangs is killed and reported as [`FetchError::Timeout`].
//!
//! ## Read-only
//!
//! Nothing here writes to a remote or to rclone's config. The crate trusts
//! whatever rclone prints and normalizes it in [`parse`].
//!
//! ## Example
//!
//! ```no_run
//! use rclonekit::Client;
//! use std::time::Duration;
//!
//! let client = Client::new();
//!
//! for remote in client.list_remotes().expect("Failed to list remotes") {
//!     let status = client.fetch_status(&remote, Duration::from_secs(30));
//!     match status.usage() {
//!         Some(usage) => println!("{remote}: {:?} bytes free", usage.free),
//!         None => println!("{remote}: {}", status.error().unwrap()),
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

/// Backend implementations for remote queries.
pub mod backend;
/// Error types for rclone operations.
pub mod error;
/// Parsers for rclone output.
pub mod parse;
/// Child process execution with timeouts.
pub mod process;
/// Common types for remotes and their status.
pub mod types;

pub use backend::Backend;
pub use backend::rclone::RcloneBackend;
pub use error::{Error, Result};
pub use types::{DriveStatus, DriveType, FetchError, RemoteName, Usage};

use std::sync::Arc;
use std::time::Duration;

/// Default bound for one `about` fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound for the `about` call used to validate a typed-in remote
const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// High-level client for rclone queries.
///
/// Cheap to clone; the backend is shared, so one client can feed many
/// worker threads.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Client for `rclone` on PATH with its default config.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(RcloneBackend::new()))
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The shared backend, for handing to worker threads
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    /// List configured remotes.
    ///
    /// No remotes configured yields an empty list, not an error.
    pub fn list_remotes(&self) -> Result<Vec<RemoteName>> {
        self.backend.list_remotes()
    }

    /// Fetch usage for one remote within `timeout`.
    ///
    /// Always returns a status; failures are inside it.
    pub fn fetch_status(&self, remote: &RemoteName, timeout: Duration) -> DriveStatus {
        self.backend.about(remote, timeout)
    }

    /// rclone version line, or why rclone can't be run
    pub fn version(&self) -> Result<String> {
        self.backend.version()
    }

    /// Check that a remote typed by the user actually answers `about`.
    pub fn validate_remote(&self, remote: &RemoteName) -> Result<()> {
        let status = self.backend.about(remote, VALIDATE_TIMEOUT);
        match status.error() {
            None => Ok(()),
            Some(e) => Err(Error::InvalidRemote {
                remote: remote.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
