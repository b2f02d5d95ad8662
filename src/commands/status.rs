use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use rclonekit::{DriveStatus, FetchError, Usage};
use serde::Serialize;
use std::time::Duration;

use crate::Context;
use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::progress;
use crate::ui;

/// Slack on top of the per-fetch timeout before giving up on the pool
const WAIT_SLACK: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct StatusJson<'a> {
    remote: &'a str,
    display_name: &'a str,
    fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<&'a Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a FetchError>,
}

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let (_, config, _) = super::load_config(ctx)?;
    let (coordinator, events) = super::start_coordinator(&config)?;
    let drives = coordinator.drives();

    if drives.is_empty() {
        if json {
            println!("[]");
        } else {
            ui::info("No drives configured.");
            ui::dim("Run 'driveglance remotes' to see what rclone knows about.");
        }
        return Ok(());
    }

    let pb = (!json && !ctx.quiet)
        .then(|| progress::spinner(&format!("Fetching {} drive(s)...", drives.len())));

    coordinator.refresh_all();
    let finished = coordinator.wait_idle(wait_bound(&config, drives.len()));

    let statuses = coordinator.published();
    let failed = statuses.iter().filter(|s| !s.is_ok()).count();

    if let Some(pb) = &pb {
        if !finished {
            progress::finish_warn(pb, "Some drives did not answer in time");
        } else if failed > 0 {
            progress::finish_warn(pb, &format!("{failed} of {} drive(s) failed", drives.len()));
        } else {
            progress::finish_success(pb, &format!("Fetched {} drive(s)", drives.len()));
        }
    }

    if json {
        let rows: Vec<StatusJson<'_>> = statuses
            .iter()
            .map(|status| to_json(status, &config))
            .collect();
        let out = serde_json::to_string_pretty(&rows).context("Failed to serialize statuses")?;
        println!("{out}");
        return Ok(());
    }

    let mut dashboard = Dashboard::default();
    for event in events.try_iter() {
        dashboard.apply(event);
    }
    for remote in coordinator.in_flight() {
        dashboard.mark_loading(&remote);
    }
    println!();
    print!("{}", dashboard.render(Utc::now()));

    Ok(())
}

/// Long enough for every queued fetch to hit its own timeout.
fn wait_bound(config: &AppConfig, drives: usize) -> Duration {
    let rounds = drives.div_ceil(config.rclone.workers());
    config
        .rclone
        .fetch_timeout()
        .saturating_mul(u32::try_from(rounds).unwrap_or(u32::MAX))
        .saturating_add(WAIT_SLACK)
}

fn to_json<'a>(status: &'a DriveStatus, config: &'a AppConfig) -> StatusJson<'a> {
    let display_name = config
        .find(status.remote())
        .map_or(status.remote().as_str(), |d| d.display_name.as_str());

    StatusJson {
        remote: status.remote().as_str(),
        display_name,
        fetched_at: status.fetched_at(),
        usage: status.usage(),
        error: status.error(),
    }
}
