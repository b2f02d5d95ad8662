//! Application configuration: the drive list, refresh settings and window state.
//!
//! Stored as TOML. [`ConfigStore::save`] writes to a temp file next to the
//! target and renames it into place, so a crash mid-write leaves the
//! previous file intact.

use rclonekit::{Client, DriveType, RcloneBackend, RemoteName};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Refresh interval used when none (or zero) is configured
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = rclonekit::DEFAULT_FETCH_TIMEOUT.as_secs();
const DEFAULT_LIST_TIMEOUT_SECS: u64 = rclonekit::backend::rclone::DEFAULT_LIST_TIMEOUT.as_secs();
const DEFAULT_WORKERS: usize = 4;

/// Upper bound for any configured rclone timeout
const MAX_TIMEOUT_SECS: u64 = 3600;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write config file {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("refresh interval must be a positive number of seconds")]
    InvalidInterval,

    #[error("drive `{0}` is not configured")]
    UnknownDrive(String),
}

// ============================================================================
// Config Structures
// ============================================================================

/// Last known window position and size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// One monitored drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveConfig {
    #[serde(alias = "remote_name")]
    pub remote: RemoteName,

    /// Name shown on the card; independent of the remote name
    #[serde(default)]
    pub display_name: String,

    /// Position on the dashboard (0 = first)
    #[serde(default)]
    pub order: u32,

    /// Cached provider guess, used for the card's badge
    #[serde(default)]
    pub drive_type: DriveType,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl DriveConfig {
    /// New drive with a guessed display name and drive type
    pub fn new(remote: RemoteName) -> Self {
        Self {
            display_name: guess_display_name(remote.as_str()),
            drive_type: DriveType::infer(remote.as_str()),
            order: 0,
            enabled: true,
            remote,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }
}

/// How driveglance invokes rclone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcloneSettings {
    /// rclone binary (name on PATH or absolute path)
    pub binary: PathBuf,

    /// Alternate rclone config file, passed as `--config`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,

    /// Global flags placed before every subcommand
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,

    pub fetch_timeout_secs: u64,
    pub list_timeout_secs: u64,

    /// Maximum number of concurrent `rclone about` processes
    pub workers: usize,
}

impl Default for RcloneSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("rclone"),
            config_file: None,
            extra_args: Vec::new(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            list_timeout_secs: DEFAULT_LIST_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl RcloneSettings {
    /// Backend configured from these settings
    pub fn backend(&self) -> RcloneBackend {
        let mut backend = RcloneBackend::new()
            .with_binary(&self.binary)
            .with_extra_args(self.extra_args.clone())
            .with_list_timeout(self.list_timeout());
        if let Some(config_file) = &self.config_file {
            backend = backend.with_config_file(crate::paths::expand(&config_file.to_string_lossy()));
        }
        backend
    }

    pub fn client(&self) -> Client {
        Client::with_backend(Arc::new(self.backend()))
    }

    /// Bound for one `about` fetch, clamped to 1s..=1h
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.clamp(1, MAX_TIMEOUT_SECS))
    }

    /// Bound for `listremotes`, clamped to 1s..=1h
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs.clamp(1, MAX_TIMEOUT_SECS))
    }

    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }
}

/// Everything driveglance persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stay_on_top: bool,

    /// Whether the timer refresh runs at all
    pub auto_refresh: bool,

    #[serde(alias = "auto_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Stored only; installing a login item is left to the platform
    pub run_at_startup: bool,

    /// Order from older config files, folded into `DriveConfig::order` on load
    #[serde(skip_serializing)]
    drive_order: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_geometry: Option<WindowGeometry>,

    pub rclone: RcloneSettings,

    /// Kept sorted by `order`, with orders renumbered 0..n
    pub drives: Vec<DriveConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stay_on_top: false,
            auto_refresh: true,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            run_at_startup: false,
            drive_order: Vec::new(),
            window_geometry: None,
            rclone: RcloneSettings::default(),
            drives: Vec::new(),
        }
    }
}

// ============================================================================
// AppConfig Implementation
// ============================================================================

impl AppConfig {
    /// Parse TOML text and normalize it
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: AppConfig = toml::from_str(content)?;
        config.normalize();
        Ok(config)
    }

    /// Repair values older or hand-edited files may contain.
    fn normalize(&mut self) {
        if self.refresh_interval_secs == 0 {
            log::warn!(
                "Refresh interval of 0s means auto-refresh is off; using {DEFAULT_REFRESH_INTERVAL_SECS}s when re-enabled"
            );
            self.auto_refresh = false;
            self.refresh_interval_secs = DEFAULT_REFRESH_INTERVAL_SECS;
        }

        if self
            .window_geometry
            .is_some_and(|g| g.width == 0 || g.height == 0)
        {
            self.window_geometry = None;
        }

        if !self.drive_order.is_empty() {
            let legacy = std::mem::take(&mut self.drive_order);
            let unlisted = legacy.len();
            for (index, drive) in self.drives.iter_mut().enumerate() {
                let position = legacy
                    .iter()
                    .position(|name| RemoteName::new(name).as_ref() == Some(&drive.remote))
                    .unwrap_or(unlisted + index);
                drive.order = u32::try_from(position).unwrap_or(u32::MAX);
            }
        }

        let mut seen: Vec<RemoteName> = Vec::new();
        self.drives.retain(|d| {
            if seen.contains(&d.remote) {
                log::warn!("Ignoring duplicate drive entry for {}", d.remote);
                false
            } else {
                seen.push(d.remote.clone());
                true
            }
        });

        for drive in &mut self.drives {
            if drive.drive_type == DriveType::Unknown {
                drive.drive_type = DriveType::infer(drive.remote.as_str());
            }
            if drive.display_name.trim().is_empty() {
                drive.display_name = guess_display_name(drive.remote.as_str());
            }
        }

        self.renumber();
    }

    /// Sort by order and renumber 0..n
    fn renumber(&mut self) {
        self.drives.sort_by_key(|d| d.order);
        for (index, drive) in self.drives.iter_mut().enumerate() {
            drive.order = u32::try_from(index).unwrap_or(u32::MAX);
        }
    }

    fn position(&self, remote: &RemoteName) -> Option<usize> {
        self.drives.iter().position(|d| &d.remote == remote)
    }

    /// Find a drive by remote
    pub fn find(&self, remote: &RemoteName) -> Option<&DriveConfig> {
        self.drives.iter().find(|d| &d.remote == remote)
    }

    /// Enabled drives in display order; what the coordinator monitors
    pub fn ordered_drives(&self) -> Vec<DriveConfig> {
        self.drives.iter().filter(|d| d.enabled).cloned().collect()
    }

    /// Add a drive at the end. Returns false if the remote is already configured.
    pub fn add_drive(&mut self, mut drive: DriveConfig) -> bool {
        if self.position(&drive.remote).is_some() {
            return false;
        }
        drive.order = u32::try_from(self.drives.len()).unwrap_or(u32::MAX);
        self.drives.push(drive);
        self.renumber();
        true
    }

    /// Remove a drive, returning it if it was configured
    pub fn remove_drive(&mut self, remote: &RemoteName) -> Option<DriveConfig> {
        let index = self.position(remote)?;
        let removed = self.drives.remove(index);
        self.renumber();
        Some(removed)
    }

    pub fn rename_drive(&mut self, remote: &RemoteName, name: &str) -> Result<(), ConfigError> {
        let index = self
            .position(remote)
            .ok_or_else(|| ConfigError::UnknownDrive(remote.to_string()))?;
        self.drives[index].display_name = name.trim().to_string();
        Ok(())
    }

    pub fn set_enabled(&mut self, remote: &RemoteName, enabled: bool) -> Result<(), ConfigError> {
        let index = self
            .position(remote)
            .ok_or_else(|| ConfigError::UnknownDrive(remote.to_string()))?;
        self.drives[index].enabled = enabled;
        Ok(())
    }

    /// Move `dragged` onto `target`, as when dropping one card on another.
    ///
    /// Moving down lands after the target, moving up lands before it.
    /// Returns false (and changes nothing) for the same or an unknown remote.
    pub fn move_drive(&mut self, dragged: &RemoteName, target: &RemoteName) -> bool {
        if dragged == target {
            return false;
        }
        let (Some(from), Some(to)) = (self.position(dragged), self.position(target)) else {
            return false;
        };

        // After removal the target shifts up by one when moving down, so
        // inserting at its original index lands after it; moving up, before it.
        let drive = self.drives.remove(from);
        self.drives.insert(to, drive);
        for (index, drive) in self.drives.iter_mut().enumerate() {
            drive.order = u32::try_from(index).unwrap_or(u32::MAX);
        }
        true
    }

    pub fn set_refresh_interval(&mut self, secs: u64) -> Result<(), ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        self.refresh_interval_secs = secs;
        Ok(())
    }

    /// Timer period, or `None` when auto-refresh is off
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.auto_refresh
            .then(|| Duration::from_secs(self.refresh_interval_secs.max(1)))
    }
}

// ============================================================================
// Store
// ============================================================================

/// Reads and writes the config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config. A missing file is the default config.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.path.exists() {
            log::debug!(
                "Config file {} does not exist, using defaults",
                self.path.display()
            );
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;

        let config = AppConfig::from_toml(&content).map_err(|source| ConfigError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        log::debug!("Loaded config from {}", self.path.display());
        Ok(config)
    }

    /// Load the config, falling back to defaults so startup is never blocked.
    ///
    /// The error, if any, is returned alongside so it can be shown once.
    pub fn load_or_default(&self) -> (AppConfig, Option<ConfigError>) {
        match self.load() {
            Ok(config) => (config, None),
            Err(e) => {
                log::warn!("{e}; starting with an empty configuration");
                (AppConfig::default(), Some(e))
            }
        }
    }

    /// Write the config atomically (temp file + rename).
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let write_failed = |source| ConfigError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_failed)?;

        let content = toml::to_string_pretty(config)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_failed)?;
        tmp.write_all(content.as_bytes()).map_err(write_failed)?;
        tmp.as_file().sync_all().map_err(write_failed)?;
        tmp.persist(&self.path)
            .map_err(|e| write_failed(e.error))?;

        log::debug!("Saved config to {}", self.path.display());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Guess a friendly display name from a remote name.
///
/// `work-onedrive` → `Work`, `family_photos` → `Family Photos`.
pub fn guess_display_name(remote: &str) -> String {
    let stripped = remote
        .replace("-onedrive", "")
        .replace("-gdrive", "")
        .replace("-drive", "")
        .replace(':', "");

    let words: Vec<String> = stripped
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        remote.to_string()
    } else {
        words.join(" ")
    }
}
