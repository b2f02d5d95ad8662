//! Centralized path resolution for driveglance
//!
//! # Environment Variables
//!
//! - `DRIVEGLANCE_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/driveglance`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `DRIVEGLANCE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/driveglance` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\driveglance`
//!    - macOS: `~/Library/Application Support/driveglance`
//!    - Linux: `~/.config/driveglance`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "DRIVEGLANCE_CONFIG_DIR";

/// Name of the config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

const APP_DIR_NAME: &str = "driveglance";

/// Get the driveglance config directory path
pub fn config_dir() -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR_NAME);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Platform default
    if let Some(config) = dirs::config_dir() {
        let path = config.join(APP_DIR_NAME);
        log::debug!("Using platform config dir: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR_NAME);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the config file path, honoring an explicit `--config` override
pub fn config_file(override_path: Option<&str>) -> Result<PathBuf> {
    match override_path {
        Some(path) => Ok(expand(path)),
        None => Ok(config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
