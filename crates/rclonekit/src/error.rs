use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to rclone.
///
/// Fetching a remote's usage never produces this type: those failures are
/// carried inside [`DriveStatus`](crate::DriveStatus) as a
/// [`FetchError`](crate::FetchError) so every card gets a value.
#[derive(Debug, Error)]
pub enum Error {
    /// The rclone binary could not be started
    #[error("`{program}` not found - install rclone from https://rclone.org/install/")]
    ToolNotFound {
        /// Program that was looked up
        program: String,
    },

    /// `rclone listremotes` failed or printed something we do not understand
    #[error("listing remotes failed: {stderr}")]
    Enumeration {
        /// Raw diagnostic text from the tool
        stderr: String,
    },

    /// A remote typed by the user could not be queried
    #[error("remote `{remote}` is not usable: {reason}")]
    InvalidRemote {
        /// Remote as typed
        remote: String,
        /// Diagnostic from the validation fetch
        reason: String,
    },

    /// A synchronous command ran past its deadline
    #[error("`{command}` timed out after {}s", .after.as_secs())]
    Timeout {
        /// Command line that was running
        command: String,
        /// Wait bound that expired
        after: Duration,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if rclone itself is missing, as opposed to misbehaving
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, Error::ToolNotFound { .. })
    }
}

/// Result type for rclone operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let missing = Error::ToolNotFound {
            program: "rclone".to_string(),
        };
        assert!(missing.is_tool_missing());
        assert!(missing.to_string().contains("rclone.org/install"));

        let listing = Error::Enumeration {
            stderr: "config file not found".to_string(),
        };
        assert!(!listing.is_tool_missing());
        assert_eq!(
            listing.to_string(),
            "listing remotes failed: config file not found"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::Timeout {
            command: "rclone version".to_string(),
            after: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "`rclone version` timed out after 5s");
    }
}
