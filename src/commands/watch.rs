//! Live dashboard.
//!
//! The main thread owns the view and the config. Coordinator events and
//! lines typed on stdin arrive over channels; a reader thread feeds the
//! latter. Commands:
//!
//! - `r` refresh every drive, `r N` refresh card N
//! - `m A B` move card A onto card B
//! - `q` quit

use anyhow::{Context as _, Result, bail};
use chrono::Utc;
use colored::Colorize;
use console::Term;
use dialoguer::MultiSelect;
use rclonekit::{Client, DriveType};
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::Context;
use crate::config::{AppConfig, ConfigStore, DriveConfig};
use crate::dashboard::Dashboard;
use crate::monitor::{Coordinator, Event, Scheduler};
use crate::ui;

const POLL: Duration = Duration::from_millis(200);

/// Redraw this often even without events, so "Updated ..." stays current
const IDLE_REDRAW: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Eq)]
enum Input {
    RefreshAll,
    RefreshOne(usize),
    Move(usize, usize),
    Quit,
    Nothing,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let words: Vec<&str> = line.split_whitespace().collect();
    let number = |s: &str| s.parse::<usize>().ok();

    match words.as_slice() {
        [] => Input::Nothing,
        ["q" | "quit" | "exit"] => Input::Quit,
        ["r" | "refresh"] => Input::RefreshAll,
        ["r" | "refresh", n] => match number(n) {
            Some(n) => Input::RefreshOne(n),
            None => Input::Unknown(line.trim().to_string()),
        },
        ["m" | "move", a, b] => match (number(a), number(b)) {
            (Some(a), Some(b)) => Input::Move(a, b),
            _ => Input::Unknown(line.trim().to_string()),
        },
        _ => Input::Unknown(line.trim().to_string()),
    }
}

pub fn run(ctx: &Context) -> Result<()> {
    let (store, mut config, warning) = super::load_config(ctx)?;

    let (coordinator, events) = super::start_coordinator(&config)?;

    if config.drives.is_empty() && warning.is_none() {
        first_run(&config.rclone.client(), &coordinator, &store, &mut config)?;
        coordinator.set_drives(config.ordered_drives());
    }

    let _scheduler = config
        .refresh_interval()
        .map(|interval| Scheduler::start(coordinator.clone(), interval));

    let input = spawn_input_reader();
    let term = Term::stdout();

    let mut dashboard = Dashboard::default();
    if let Some(e) = &warning {
        dashboard.set_notice(e.to_string());
    }
    absorb(&mut dashboard, &events);

    coordinator.refresh_all();
    dashboard.mark_all_loading();
    redraw(&term, &dashboard);
    let mut last_draw = Instant::now();

    loop {
        let mut dirty = match events.recv_timeout(POLL) {
            Ok(event) => {
                dashboard.apply(event);
                absorb(&mut dashboard, &events);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match input.try_recv() {
            Ok(line) => match parse_input(&line) {
                Input::Quit => break,
                command => {
                    handle(command, &coordinator, &mut dashboard, &store, &mut config);
                    absorb(&mut dashboard, &events);
                    dirty = true;
                }
            },
            Err(TryRecvError::Empty) => {}
            // stdin closed
            Err(TryRecvError::Disconnected) => break,
        }

        if dirty || last_draw.elapsed() >= IDLE_REDRAW {
            sync_loading(&mut dashboard, &coordinator);
            redraw(&term, &dashboard);
            last_draw = Instant::now();
        }
    }

    log::debug!("Leaving watch; {} fetch(es) still running", coordinator.in_flight().len());
    Ok(())
}

fn handle(
    command: Input,
    coordinator: &Coordinator,
    dashboard: &mut Dashboard,
    store: &ConfigStore,
    config: &mut AppConfig,
) {
    dashboard.clear_notice();
    match command {
        Input::RefreshAll => {
            if dashboard.is_empty() {
                dashboard.set_notice("No drives to refresh");
            } else if coordinator.refresh_all() == 0 {
                dashboard.set_notice("Refresh already in progress");
            }
            dashboard.mark_all_loading();
        }
        Input::RefreshOne(n) => match dashboard.remote_at(n).cloned() {
            Some(remote) => {
                if coordinator.refresh_one(&remote) {
                    dashboard.mark_loading(&remote);
                } else {
                    dashboard.set_notice(format!("{} is already refreshing", remote.target()));
                }
            }
            None => dashboard.set_notice(format!("No card {n}")),
        },
        Input::Move(a, b) => {
            let (Some(dragged), Some(target)) =
                (dashboard.remote_at(a).cloned(), dashboard.remote_at(b).cloned())
            else {
                if dashboard.is_empty() {
                    dashboard.set_notice("No cards to move");
                } else {
                    dashboard.set_notice(format!("Cards are numbered 1 to {}", dashboard.len()));
                }
                return;
            };
            if config.move_drive(&dragged, &target) {
                if let Err(e) = store.save(config) {
                    dashboard.set_notice(e.to_string());
                }
                coordinator.set_drives(config.ordered_drives());
            }
        }
        Input::Unknown(text) => {
            dashboard.set_notice(format!("Unknown command '{text}'"));
        }
        Input::Nothing | Input::Quit => {}
    }
}

/// Apply every event already queued
fn absorb(dashboard: &mut Dashboard, events: &Receiver<Event>) {
    for event in events.try_iter() {
        dashboard.apply(event);
    }
}

/// Show every fetch the coordinator is running, timer ones included
fn sync_loading(dashboard: &mut Dashboard, coordinator: &Coordinator) {
    for remote in coordinator.in_flight() {
        dashboard.mark_loading(&remote);
    }
}

fn redraw(term: &Term, dashboard: &Dashboard) {
    if term.is_term() {
        let _ = term.clear_screen();
    }
    println!("{}", "driveglance".bold());
    println!();
    print!("{}", dashboard.render(Utc::now()));
    println!(
        "{}",
        "r refresh · r N refresh card · m A B move card · q quit".dimmed()
    );
}

fn spawn_input_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Offer the remotes rclone knows about when nothing is configured yet.
fn first_run(
    client: &Client,
    coordinator: &Coordinator,
    store: &ConfigStore,
    config: &mut AppConfig,
) -> Result<()> {
    ui::header("Welcome to driveglance");
    println!();

    match client.version() {
        Ok(version) => ui::dim(&version),
        Err(e) if e.is_tool_missing() => bail!("{e}"),
        Err(e) => ui::warn(&e.to_string()),
    }

    let remotes = match coordinator.enumerate() {
        Ok(remotes) => remotes,
        Err(e) => {
            ui::error(&e.to_string());
            return Ok(());
        }
    };

    if remotes.is_empty() {
        ui::info("rclone has no remotes configured yet.");
        ui::dim("Run 'rclone config' to add one, then start driveglance again.");
        return Ok(());
    }

    if !console::user_attended() {
        ui::dim("Add drives with 'driveglance add <remote>'.");
        return Ok(());
    }

    let labels: Vec<String> = remotes
        .iter()
        .map(|r| format!("{} ({})", r.target(), DriveType::infer(r.as_str()).label()))
        .collect();
    let defaults = vec![true; labels.len()];

    let selected = MultiSelect::new()
        .with_prompt("Select drives to monitor")
        .items(&labels)
        .defaults(&defaults)
        .interact()
        .context("Failed to read drive selection")?;

    for index in selected {
        config.add_drive(DriveConfig::new(remotes[index].clone()));
    }

    if !config.drives.is_empty() {
        store
            .save(config)
            .with_context(|| format!("Failed to save {}", store.path().display()))?;
        ui::success(&format!("Monitoring {} drive(s)", config.drives.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("r"), Input::RefreshAll);
        assert_eq!(parse_input("  r 2 "), Input::RefreshOne(2));
        assert_eq!(parse_input("refresh 1"), Input::RefreshOne(1));
        assert_eq!(parse_input("m 3 1"), Input::Move(3, 1));
        assert_eq!(parse_input("q"), Input::Quit);
        assert_eq!(parse_input(""), Input::Nothing);
        assert_eq!(parse_input("r x"), Input::Unknown("r x".to_string()));
        assert_eq!(parse_input("m 1"), Input::Unknown("m 1".to_string()));
        assert_eq!(parse_input("hello"), Input::Unknown("hello".to_string()));
    }

    #[test]
    fn test_move_updates_config_and_view() {
        use crate::monitor::testing::{MockBackend, coordinator_with, drive};
        use std::sync::Arc;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.toml"));
        let mut config = AppConfig::default();
        for name in ["gdrive", "onedrive", "dropbox"] {
            config.add_drive(drive(name));
        }

        let (coordinator, events) = coordinator_with(Arc::new(MockBackend::default()));
        coordinator.set_drives(config.ordered_drives());
        let mut dashboard = Dashboard::default();
        absorb(&mut dashboard, &events);

        handle(Input::Move(3, 1), &coordinator, &mut dashboard, &store, &mut config);
        absorb(&mut dashboard, &events);

        let order: Vec<&str> = config.drives.iter().map(|d| d.remote.as_str()).collect();
        assert_eq!(order, ["dropbox", "gdrive", "onedrive"]);
        assert_eq!(dashboard.remote_at(1).map(|r| r.as_str()), Some("dropbox"));
        assert_eq!(store.load().unwrap().drives[0].remote.as_str(), "dropbox");
    }

    #[test]
    fn test_refresh_unknown_card_sets_notice() {
        use crate::monitor::testing::{MockBackend, coordinator_with};
        use std::sync::Arc;
        use tempfile::TempDir;

        colored::control::set_override(false);
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.toml"));
        let mut config = AppConfig::default();
        let (coordinator, _events) = coordinator_with(Arc::new(MockBackend::default()));
        let mut dashboard = Dashboard::default();

        handle(Input::RefreshOne(4), &coordinator, &mut dashboard, &store, &mut config);
        assert!(dashboard.render(Utc::now()).contains("No card 4"));
    }

    #[test]
    fn test_refresh_all_without_drives() {
        use crate::monitor::testing::{MockBackend, coordinator_with};
        use std::sync::Arc;
        use tempfile::TempDir;

        colored::control::set_override(false);
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.toml"));
        let mut config = AppConfig::default();
        let (coordinator, _events) = coordinator_with(Arc::new(MockBackend::default()));
        let mut dashboard = Dashboard::default();

        handle(Input::RefreshAll, &coordinator, &mut dashboard, &store, &mut config);
        let out = dashboard.render(Utc::now());
        assert!(out.contains("No drives to refresh"));
        assert!(!out.contains("already in progress"));
    }

    #[test]
    fn test_timer_refresh_shows_loading() {
        use crate::monitor::testing::{MockBackend, coordinator_with, drive};
        use std::sync::Arc;

        colored::control::set_override(false);
        let backend = Arc::new(MockBackend::default());
        let (coordinator, events) = coordinator_with(backend.clone());
        coordinator.set_drives(vec![drive("gdrive")]);
        let mut dashboard = Dashboard::default();
        absorb(&mut dashboard, &events);

        backend.hold("gdrive");
        assert_eq!(coordinator.tick(), 1);
        sync_loading(&mut dashboard, &coordinator);
        assert!(dashboard.render(Utc::now()).contains("Loading…"));

        backend.release("gdrive");
        assert!(coordinator.wait_idle(Duration::from_secs(5)));
        absorb(&mut dashboard, &events);
        sync_loading(&mut dashboard, &coordinator);
        assert!(!dashboard.render(Utc::now()).contains("Loading…"));
    }
}
