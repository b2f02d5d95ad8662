use anyhow::{Context as _, Result};
use colored::Colorize;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let (_, config, _) = super::load_config(ctx)?;
    let client = config.rclone.client();

    if ctx.verbose > 0 {
        match client.version() {
            Ok(version) => ui::kv("rclone", &version),
            Err(e) => ui::warn(&e.to_string()),
        }
    }

    let remotes = client
        .list_remotes()
        .context("Could not list rclone remotes")?;

    ui::header("rclone Remotes");

    if remotes.is_empty() {
        println!();
        ui::info("rclone has no remotes configured.");
        ui::dim("Run 'rclone config' to add one.");
        return Ok(());
    }

    println!();
    for remote in &remotes {
        match config.find(remote) {
            Some(drive) if drive.enabled => println!(
                "  {} {:<24} {}",
                "●".green(),
                remote.target(),
                drive.display_name
            ),
            Some(drive) => println!(
                "  {} {:<24} {}",
                "◌".yellow(),
                remote.target(),
                format!("{} (disabled)", drive.display_name).dimmed()
            ),
            None => println!("  {} {}", "○".dimmed(), remote.target()),
        }
    }

    let unmonitored = remotes.iter().filter(|r| config.find(r).is_none()).count();
    if unmonitored > 0 && !ctx.quiet {
        println!();
        ui::dim("Start monitoring with 'driveglance add <remote>'.");
    }

    Ok(())
}
