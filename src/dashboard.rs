//! Terminal dashboard: one card per monitored drive.
//!
//! Holds only snapshots delivered by coordinator events and renders them to
//! a string, so the same view serves `watch` redraws and one-shot `status`.

use chrono::{DateTime, Utc};
use colored::Colorize;
use rclonekit::{DriveStatus, FetchError, RemoteName, Usage};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::config::DriveConfig;
use crate::monitor::Event;
use crate::ui;

const BAR_WIDTH: usize = 24;
const NAME_WIDTH: usize = 28;

#[derive(Debug, Default)]
pub struct Dashboard {
    drives: Vec<DriveConfig>,
    statuses: HashMap<RemoteName, DriveStatus>,
    loading: HashSet<RemoteName>,
    notice: Option<String>,
}

impl Dashboard {
    pub fn new(drives: Vec<DriveConfig>) -> Self {
        Self {
            drives,
            ..Self::default()
        }
    }

    /// Fold one event into the view
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::StatusPublished { remote, status } => {
                self.loading.remove(&remote);
                self.statuses.insert(remote, status);
            }
            Event::RemoteListChanged(drives) => {
                self.statuses
                    .retain(|remote, _| drives.iter().any(|d| &d.remote == remote));
                self.loading
                    .retain(|remote| drives.iter().any(|d| &d.remote == remote));
                self.drives = drives;
            }
            Event::EnumerationFailed(message) => {
                self.notice = Some(format!("Could not list remotes: {message}"));
            }
        }
    }

    /// Show a card as loading until its next status arrives
    pub fn mark_loading(&mut self, remote: &RemoteName) {
        if self.drives.iter().any(|d| &d.remote == remote) {
            self.loading.insert(remote.clone());
        }
    }

    pub fn mark_all_loading(&mut self) {
        self.loading = self.drives.iter().map(|d| d.remote.clone()).collect();
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Remote shown on card `number` (1-based, as printed)
    pub fn remote_at(&self, number: usize) -> Option<&RemoteName> {
        number
            .checked_sub(1)
            .and_then(|i| self.drives.get(i))
            .map(|d| &d.remote)
    }

    pub fn len(&self) -> usize {
        self.drives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut out = String::new();

        if let Some(notice) = &self.notice {
            let _ = writeln!(out, "{} {}", "⚠".yellow(), notice);
            out.push('\n');
        }

        if self.drives.is_empty() {
            let _ = writeln!(
                out,
                "No drives configured. Add one with {}.",
                "driveglance add <remote>".cyan()
            );
            return out;
        }

        for (index, drive) in self.drives.iter().enumerate() {
            let status = self.statuses.get(&drive.remote);
            let loading = self.loading.contains(&drive.remote);
            out.push_str(&render_card(index + 1, drive, status, loading, now));
            out.push('\n');
        }
        out
    }
}

/// One card: title line, then usage or the failure, then freshness.
pub fn render_card(
    number: usize,
    drive: &DriveConfig,
    status: Option<&DriveStatus>,
    loading: bool,
    now: DateTime<Utc>,
) -> String {
    let mut card = String::new();
    let name = ui::truncate(&drive.display_name, NAME_WIDTH);
    let _ = writeln!(
        card,
        "{:>2}. {}  {}  {}",
        number,
        name.bold(),
        format!("[{}]", drive.drive_type.label()).dimmed(),
        drive.remote.target().dimmed()
    );

    match status.map(DriveStatus::outcome) {
        None if loading => {
            let _ = writeln!(card, "    {}", "Loading…".dimmed());
        }
        None => {
            let _ = writeln!(card, "    {}", "Not fetched yet".dimmed());
        }
        Some(Ok(usage)) => write_usage(&mut card, usage),
        Some(Err(error)) => write_error(&mut card, error),
    }

    if let Some(status) = status {
        let updated = ui::relative_time(status.fetched_at(), now);
        let suffix = if loading { " (refreshing…)" } else { "" };
        let _ = writeln!(card, "    {}", format!("Updated {updated}{suffix}").dimmed());
    }
    card
}

fn write_usage(card: &mut String, usage: &Usage) {
    if let Some(fraction) = usage.used_fraction() {
        let _ = writeln!(
            card,
            "    {} {:>5.1}%",
            ui::usage_bar(fraction, BAR_WIDTH),
            fraction * 100.0
        );
    }

    let _ = writeln!(
        card,
        "    Used {} of {} · Free {}",
        ui::format_size_opt(usage.used),
        ui::format_size_opt(usage.total),
        ui::format_size_opt(usage.free)
    );

    let mut extras = Vec::new();
    if let Some(trashed) = usage.trashed {
        extras.push(format!("Trash {}", ui::format_size(trashed)));
    }
    if let Some(other) = usage.other {
        extras.push(format!("Other {}", ui::format_size(other)));
    }
    if let Some(objects) = usage.objects {
        extras.push(format!("Objects {objects}"));
    }
    if !extras.is_empty() {
        let _ = writeln!(card, "    {}", extras.join(" · ").dimmed());
    }
}

fn write_error(card: &mut String, error: &FetchError) {
    let label = match error {
        FetchError::Timeout { .. } => error.label().yellow(),
        FetchError::CommandFailed { .. } => error.label().red(),
    };
    let first_line = error.to_string();
    let first_line = first_line.lines().next().unwrap_or_default();
    let _ = writeln!(card, "    {}: {}", label.bold(), ui::truncate(first_line, 72));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const GB: u64 = 1024 * 1024 * 1024;

    fn remote(name: &str) -> RemoteName {
        RemoteName::new(name).unwrap()
    }

    fn drives() -> Vec<DriveConfig> {
        vec![
            DriveConfig::new(remote("gdrive")).with_display_name("Personal"),
            DriveConfig::new(remote("onedrive")).with_display_name("Work"),
        ]
    }

    fn gdrive_status(at: DateTime<Utc>) -> DriveStatus {
        DriveStatus::at(
            remote("gdrive"),
            at,
            Ok(Usage {
                total: Some(100 * GB),
                used: Some(40 * GB),
                free: Some(60 * GB),
                ..Usage::default()
            }),
        )
    }

    #[test]
    fn test_render_usage_and_timeout_cards() {
        colored::control::set_override(false);
        let now = Utc::now();
        let mut dashboard = Dashboard::new(drives());
        dashboard.apply(Event::StatusPublished {
            remote: remote("gdrive"),
            status: gdrive_status(now - Duration::minutes(3)),
        });
        dashboard.apply(Event::StatusPublished {
            remote: remote("onedrive"),
            status: DriveStatus::at(
                remote("onedrive"),
                now,
                Err(FetchError::Timeout { after_secs: 30 }),
            ),
        });

        let out = dashboard.render(now);
        assert!(out.contains(" 1. Personal  [Google Drive]  gdrive:"));
        assert!(out.contains(" 40.0%"));
        assert!(out.contains("Used 40.0 GB of 100.0 GB · Free 60.0 GB"));
        assert!(out.contains("Updated 3 minutes ago"));
        assert!(out.contains(" 2. Work  [OneDrive]  onedrive:"));
        assert!(out.contains("Timeout: timed out after 30s"));
    }

    #[test]
    fn test_unknown_fields_render_as_unknown() {
        colored::control::set_override(false);
        let now = Utc::now();
        let drive = DriveConfig::new(remote("gdrive"));
        let status = DriveStatus::at(
            remote("gdrive"),
            now,
            Ok(Usage {
                used: Some(GB),
                objects: Some(1234),
                ..Usage::default()
            }),
        );

        let card = render_card(1, &drive, Some(&status), false, now);
        assert!(card.contains("Used 1.0 GB of Unknown · Free Unknown"));
        assert!(card.contains("Objects 1234"));
        assert!(!card.contains('%'));
    }

    #[test]
    fn test_loading_and_unfetched_cards() {
        colored::control::set_override(false);
        let now = Utc::now();
        let mut dashboard = Dashboard::new(drives());
        dashboard.mark_loading(&remote("gdrive"));

        let out = dashboard.render(now);
        assert!(out.contains("Loading…"));
        assert!(out.contains("Not fetched yet"));

        dashboard.apply(Event::StatusPublished {
            remote: remote("gdrive"),
            status: gdrive_status(now),
        });
        dashboard.mark_all_loading();
        assert!(dashboard.render(now).contains("(refreshing…)"));
    }

    #[test]
    fn test_remote_list_change_drops_cards() {
        let now = Utc::now();
        let mut dashboard = Dashboard::new(drives());
        dashboard.apply(Event::StatusPublished {
            remote: remote("gdrive"),
            status: gdrive_status(now),
        });
        dashboard.apply(Event::RemoteListChanged(vec![
            DriveConfig::new(remote("onedrive")),
        ]));

        assert_eq!(dashboard.len(), 1);
        assert_eq!(dashboard.remote_at(1), Some(&remote("onedrive")));
        assert!(dashboard.remote_at(0).is_none());
        assert!(dashboard.remote_at(2).is_none());
        assert!(!dashboard.statuses.contains_key(&remote("gdrive")));
    }

    #[test]
    fn test_enumeration_failure_shows_notice() {
        colored::control::set_override(false);
        let mut dashboard = Dashboard::default();
        dashboard.apply(Event::EnumerationFailed("config file is corrupt".to_string()));

        let out = dashboard.render(Utc::now());
        assert!(out.contains("Could not list remotes: config file is corrupt"));
        assert!(out.contains("No drives configured"));
    }
}
