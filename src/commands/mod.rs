pub mod config;
pub mod drives;
pub mod remotes;
pub mod status;
pub mod watch;

use anyhow::{Context as _, Result, anyhow};
use rclonekit::RemoteName;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::Context;
use crate::config::{AppConfig, ConfigError, ConfigStore};
use crate::monitor::{self, Coordinator, Event};
use crate::paths;
use crate::ui;

/// Parse a remote name as typed, with or without the trailing ':'
pub(crate) fn parse_remote(raw: &str) -> Result<RemoteName> {
    RemoteName::new(raw).ok_or_else(|| anyhow!("`{raw}` is not a valid remote name"))
}

pub(crate) fn open_store(ctx: &Context) -> Result<ConfigStore> {
    let path = paths::config_file(ctx.config_path.as_deref())?;
    Ok(ConfigStore::new(path))
}

/// Load for read-only use: a corrupt file is reported and replaced by defaults.
pub(crate) fn load_config(ctx: &Context) -> Result<(ConfigStore, AppConfig, Option<ConfigError>)> {
    let store = open_store(ctx)?;
    let (config, warning) = store.load_or_default();
    if let Some(e) = &warning {
        ui::warn(&format!("{e}"));
        ui::dim("Continuing with an empty configuration.");
    }
    Ok((store, config, warning))
}

/// Load for commands that save afterwards; refuses to overwrite a corrupt file.
pub(crate) fn load_config_for_update(ctx: &Context) -> Result<(ConfigStore, AppConfig)> {
    let store = open_store(ctx)?;
    let config = store
        .load()
        .with_context(|| format!("Refusing to modify {}", store.path().display()))?;
    Ok((store, config))
}

/// Coordinator for the monitored drives in `config`, plus its event stream.
pub(crate) fn start_coordinator(config: &AppConfig) -> Result<(Coordinator, Receiver<Event>)> {
    let (sink, rx) = monitor::channel();
    let coordinator = Coordinator::new(
        config.rclone.client(),
        Arc::new(sink),
        config.rclone.workers(),
        config.rclone.fetch_timeout(),
    )?;
    coordinator.set_drives(config.ordered_drives());
    Ok((coordinator, rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx_for(path: &std::path::Path) -> Context {
        Context {
            verbose: 0,
            quiet: true,
            config_path: Some(path.display().to_string()),
        }
    }

    #[test]
    fn test_parse_remote() {
        assert_eq!(parse_remote("gdrive:").unwrap().as_str(), "gdrive");
        assert!(parse_remote("  ").is_err());
    }

    #[test]
    fn test_update_refuses_corrupt_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[drives]\n").unwrap();
        let ctx = ctx_for(&path);

        assert!(load_config_for_update(&ctx).is_err());

        let (_, config, warning) = load_config(&ctx).unwrap();
        assert!(config.drives.is_empty());
        assert!(warning.is_some());
        // Still the user's bytes on disk
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[[drives]\n");
    }

    #[test]
    fn test_start_coordinator_monitors_enabled_drives() {
        let mut config = AppConfig::default();
        config.add_drive(crate::config::DriveConfig::new(parse_remote("gdrive").unwrap()));
        config.add_drive(crate::config::DriveConfig::new(parse_remote("onedrive").unwrap()));
        config
            .set_enabled(&parse_remote("onedrive").unwrap(), false)
            .unwrap();

        let (coordinator, rx) = start_coordinator(&config).unwrap();
        assert_eq!(coordinator.drives().len(), 1);
        assert!(matches!(rx.try_recv().unwrap(), Event::RemoteListChanged(ref d) if d.len() == 1));
    }
}
