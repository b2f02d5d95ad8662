//! Commands that edit the monitored drive list.

use anyhow::{Context as _, Result, bail};
use colored::Colorize;

use crate::Context;
use crate::cli::AddArgs;
use crate::config::{AppConfig, ConfigStore, DriveConfig};
use crate::progress;
use crate::ui;

pub fn add(ctx: &Context, args: AddArgs) -> Result<()> {
    if args.name.is_some() && args.remotes.len() > 1 {
        bail!("--name can only be used when adding a single remote");
    }

    let (store, mut config) = super::load_config_for_update(ctx)?;
    let client = config.rclone.client();

    let mut added = 0;
    let mut rejected = 0;

    for raw in &args.remotes {
        let remote = super::parse_remote(raw)?;

        if config.find(&remote).is_some() {
            ui::warn(&format!("{} is already monitored", remote.target()));
            continue;
        }

        if !args.no_verify {
            let pb = progress::spinner(&format!("Checking {}...", remote.target()));
            let checked = client.validate_remote(&remote);
            pb.finish_and_clear();

            if let Err(e) = checked {
                ui::error(&e.to_string());
                rejected += 1;
                continue;
            }
        }

        let mut drive = DriveConfig::new(remote);
        if let Some(name) = &args.name {
            drive = drive.with_display_name(name.trim());
        }
        ui::success(&format!(
            "Added {} as \"{}\"",
            drive.remote.target(),
            drive.display_name
        ));
        config.add_drive(drive);
        added += 1;
    }

    if added > 0 {
        save(&store, &config)?;
    }

    if rejected > 0 {
        bail!("{rejected} remote(s) could not be added");
    }
    Ok(())
}

pub fn remove(ctx: &Context, raw: &str) -> Result<()> {
    let (store, mut config) = super::load_config_for_update(ctx)?;
    let remote = super::parse_remote(raw)?;

    let Some(removed) = config.remove_drive(&remote) else {
        bail!("{} is not monitored", remote.target());
    };

    save(&store, &config)?;
    ui::success(&format!("Removed \"{}\"", removed.display_name));
    Ok(())
}

pub fn rename(ctx: &Context, raw: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Display name cannot be empty");
    }

    let (store, mut config) = super::load_config_for_update(ctx)?;
    let remote = super::parse_remote(raw)?;
    config.rename_drive(&remote, name)?;

    save(&store, &config)?;
    ui::success(&format!("{} is now \"{}\"", remote.target(), name.trim()));
    Ok(())
}

pub fn move_to(ctx: &Context, raw: &str, raw_target: &str) -> Result<()> {
    let (store, mut config) = super::load_config_for_update(ctx)?;
    let remote = super::parse_remote(raw)?;
    let target = super::parse_remote(raw_target)?;

    for r in [&remote, &target] {
        if config.find(r).is_none() {
            bail!("{} is not monitored", r.target());
        }
    }

    if !config.move_drive(&remote, &target) {
        ui::info("Nothing to move");
        return Ok(());
    }

    save(&store, &config)?;
    ui::success("New order:");
    print_order(&config);
    Ok(())
}

pub fn set_enabled(ctx: &Context, raw: &str, enabled: bool) -> Result<()> {
    let (store, mut config) = super::load_config_for_update(ctx)?;
    let remote = super::parse_remote(raw)?;
    config.set_enabled(&remote, enabled)?;

    save(&store, &config)?;
    let state = if enabled { "enabled" } else { "disabled" };
    ui::success(&format!("{} {state}", remote.target()));
    Ok(())
}

fn save(store: &ConfigStore, config: &AppConfig) -> Result<()> {
    store
        .save(config)
        .with_context(|| format!("Failed to save {}", store.path().display()))
}

fn print_order(config: &AppConfig) {
    for drive in &config.drives {
        let line = format!(
            "{:>2}. {} ({})",
            drive.order + 1,
            drive.display_name,
            drive.remote.target()
        );
        if drive.enabled {
            println!("  {line}");
        } else {
            println!("  {}", line.dimmed());
        }
    }
}
