use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Name of a remote as configured in rclone.
///
/// Stored without the trailing colon rclone prints in `listremotes`;
/// [`RemoteName::target`] adds it back when passing the remote to a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteName(String);

impl RemoteName {
    /// Normalize user or tool input into a remote name.
    ///
    /// Strips surrounding whitespace and trailing colons. Returns `None` when
    /// nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let name = raw.trim().trim_end_matches(':').trim();
        if name.is_empty() {
            None
        } else {
            Some(Self(name.to_string()))
        }
    }

    /// The bare remote name (no colon)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `name:` form rclone expects as a command argument
    pub fn target(&self) -> String {
        format!("{}:", self.0)
    }
}

impl fmt::Display for RemoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RemoteName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value).ok_or_else(|| format!("invalid remote name: {value:?}"))
    }
}

impl From<RemoteName> for String {
    fn from(value: RemoteName) -> Self {
        value.0
    }
}

/// Storage provider behind a remote, guessed from its name.
///
/// This is a display hint only. rclone knows the real backend type, but
/// asking would cost another process per remote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveType {
    /// Google Drive
    GoogleDrive,
    /// Microsoft OneDrive
    OneDrive,
    /// Dropbox
    Dropbox,
    /// Proton Drive
    ProtonDrive,
    /// Box
    Box,
    /// MEGA
    Mega,
    /// pCloud
    PCloud,
    /// Amazon S3 or a compatible store
    S3,
    /// No known pattern matched
    #[default]
    #[serde(other)]
    Unknown,
}

/// Name fragments and the drive type they suggest.
const DRIVE_TYPE_PATTERNS: &[(&str, DriveType)] = &[
    ("googledrive", DriveType::GoogleDrive),
    ("gdrive", DriveType::GoogleDrive),
    ("google", DriveType::GoogleDrive),
    ("onedrive", DriveType::OneDrive),
    ("dropbox", DriveType::Dropbox),
    ("protondrive", DriveType::ProtonDrive),
    ("proton", DriveType::ProtonDrive),
    ("pcloud", DriveType::PCloud),
    ("mega", DriveType::Mega),
    ("box", DriveType::Box),
    ("s3", DriveType::S3),
];

impl DriveType {
    /// Guess the drive type from a remote name.
    ///
    /// Case-insensitive substring match; the longest matching pattern wins,
    /// and ties go to the earlier table entry.
    pub fn infer(remote: &str) -> Self {
        let lower = remote.to_lowercase();
        let mut best: Option<(usize, DriveType)> = None;

        for (pattern, kind) in DRIVE_TYPE_PATTERNS {
            if lower.contains(pattern) && best.is_none_or(|(len, _)| pattern.len() > len) {
                best = Some((pattern.len(), *kind));
            }
        }

        best.map_or(DriveType::Unknown, |(_, kind)| kind)
    }

    /// Human-readable provider name
    pub fn label(&self) -> &'static str {
        match self {
            Self::GoogleDrive => "Google Drive",
            Self::OneDrive => "OneDrive",
            Self::Dropbox => "Dropbox",
            Self::ProtonDrive => "Proton Drive",
            Self::Box => "Box",
            Self::Mega => "MEGA",
            Self::PCloud => "pCloud",
            Self::S3 => "S3",
            Self::Unknown => "Unknown",
        }
    }
}

/// Capacity numbers reported by `rclone about`.
///
/// Every field is optional because providers report different subsets;
/// object count, trash and other usage are often missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Total capacity in bytes
    pub total: Option<u64>,
    /// Bytes in use
    pub used: Option<u64>,
    /// Bytes available
    pub free: Option<u64>,
    /// Bytes sitting in the trash
    pub trashed: Option<u64>,
    /// Bytes used by other services sharing the quota
    pub other: Option<u64>,
    /// Number of objects stored
    pub objects: Option<u64>,
}

impl Usage {
    /// True if no field was reported at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check `used + free <= total` when all three are known.
    ///
    /// Equality is allowed since "other" usage may be folded into total.
    pub fn is_consistent(&self) -> bool {
        match (self.total, self.used, self.free) {
            (Some(total), Some(used), Some(free)) => {
                used.checked_add(free).is_some_and(|sum| sum <= total)
            }
            _ => true,
        }
    }

    /// Fraction of total capacity in use, if both are known
    pub fn used_fraction(&self) -> Option<f64> {
        match (self.total, self.used) {
            (Some(total), Some(used)) if total > 0 => Some((used as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}

/// Why a fetch did not produce usage numbers.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    /// rclone did not finish within the allowed time and was killed
    #[error("timed out after {after_secs}s")]
    Timeout {
        /// Seconds waited before giving up
        after_secs: u64,
    },
    /// rclone failed, could not start, or printed nothing usable
    #[error("{diagnostic}")]
    CommandFailed {
        /// Captured stderr or parser diagnostic
        diagnostic: String,
    },
}

impl FetchError {
    /// Short label for UI badges
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "Timeout",
            Self::CommandFailed { .. } => "Error",
        }
    }
}

/// Result of one fetch for one remote.
///
/// Either usage numbers or an error, never both: the outcome is a `Result`.
/// A status is never mutated; the next fetch replaces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveStatus {
    remote: RemoteName,
    fetched_at: DateTime<Utc>,
    outcome: Result<Usage, FetchError>,
}

impl DriveStatus {
    /// Successful fetch, stamped now
    pub fn succeeded(remote: RemoteName, usage: Usage) -> Self {
        Self::at(remote, Utc::now(), Ok(usage))
    }

    /// Failed fetch, stamped now
    pub fn failed(remote: RemoteName, error: FetchError) -> Self {
        Self::at(remote, Utc::now(), Err(error))
    }

    /// Status with an explicit timestamp
    pub fn at(
        remote: RemoteName,
        fetched_at: DateTime<Utc>,
        outcome: Result<Usage, FetchError>,
    ) -> Self {
        Self {
            remote,
            fetched_at,
            outcome,
        }
    }

    /// Remote this status belongs to
    pub fn remote(&self) -> &RemoteName {
        &self.remote
    }

    /// When the fetch completed
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Usage numbers or the failure
    pub fn outcome(&self) -> Result<&Usage, &FetchError> {
        self.outcome.as_ref()
    }

    /// Usage numbers, if the fetch succeeded
    pub fn usage(&self) -> Option<&Usage> {
        self.outcome.as_ref().ok()
    }

    /// The failure, if the fetch failed
    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }

    /// True if the fetch produced usage numbers
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}
