use anyhow::{Context as _, Result};

use crate::Context;
use crate::cli::{ConfigCommand, Toggle};
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => {
            println!("{}", super::open_store(ctx)?.path().display());
            Ok(())
        }
        ConfigCommand::SetInterval { secs } => set_interval(ctx, secs),
        ConfigCommand::AutoRefresh { state } => auto_refresh(ctx, state),
        ConfigCommand::StayOnTop { state } => stay_on_top(ctx, state),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let (store, config, _) = super::load_config(ctx)?;

    ui::header("Settings");
    println!();
    ui::kv("Config file", &store.path().display().to_string());
    ui::kv(
        "Auto-refresh",
        &format!(
            "{} (every {}s)",
            ui::on_off(config.auto_refresh),
            config.refresh_interval_secs
        ),
    );
    ui::kv("Stay on top", &ui::on_off(config.stay_on_top).to_string());
    ui::kv("Run at startup", &ui::on_off(config.run_at_startup).to_string());
    if let Some(g) = config.window_geometry {
        ui::kv(
            "Window",
            &format!("{}x{} at ({}, {})", g.width, g.height, g.x, g.y),
        );
    }

    ui::header("rclone");
    println!();
    ui::kv("Binary", &config.rclone.binary.display().to_string());
    if let Some(path) = &config.rclone.config_file {
        ui::kv("Config", &path.display().to_string());
    }
    if !config.rclone.extra_args.is_empty() {
        ui::kv("Extra args", &config.rclone.extra_args.join(" "));
    }
    ui::kv(
        "Fetch timeout",
        &format!("{}s", config.rclone.fetch_timeout().as_secs()),
    );
    ui::kv("Workers", &config.rclone.workers().to_string());

    ui::header("Drives");
    println!();
    if config.drives.is_empty() {
        ui::dim("None. Add one with 'driveglance add <remote>'.");
    }
    for drive in &config.drives {
        let state = if drive.enabled { "" } else { " (disabled)" };
        ui::kv(
            &format!("{:>2}. {}", drive.order + 1, drive.remote.target()),
            &format!(
                "{} [{}]{state}",
                drive.display_name,
                drive.drive_type.label()
            ),
        );
    }

    Ok(())
}

fn set_interval(ctx: &Context, secs: u64) -> Result<()> {
    let (store, mut config) = super::load_config_for_update(ctx)?;
    config.set_refresh_interval(secs)?;
    store.save(&config).context("Failed to save config")?;

    ui::success(&format!("Refreshing every {secs}s"));
    if !config.auto_refresh {
        ui::dim("Auto-refresh is off; enable it with 'driveglance config auto-refresh on'.");
    }
    Ok(())
}

fn auto_refresh(ctx: &Context, state: Toggle) -> Result<()> {
    let (store, mut config) = super::load_config_for_update(ctx)?;
    config.auto_refresh = state.enabled();
    store.save(&config).context("Failed to save config")?;

    ui::success(&format!("Auto-refresh {}", ui::on_off(config.auto_refresh)));
    Ok(())
}

fn stay_on_top(ctx: &Context, state: Toggle) -> Result<()> {
    let (store, mut config) = super::load_config_for_update(ctx)?;
    config.stay_on_top = state.enabled();
    store.save(&config).context("Failed to save config")?;

    ui::success(&format!("Stay on top {}", ui::on_off(config.stay_on_top)));
    Ok(())
}
