use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

pub fn on_off(flag: bool) -> ColoredString {
    if flag { "on".green() } else { "off".dimmed() }
}

// ============================================================================
// Size Formatting
// ============================================================================

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format an optional size, "Unknown" when missing
pub fn format_size_opt(bytes: Option<u64>) -> String {
    bytes.map_or_else(|| "Unknown".to_string(), format_size)
}

// ============================================================================
// Time Formatting
// ============================================================================

/// "2 hours, 5 minutes ago", or "just now" under a minute
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs < 60 {
        return "just now".to_string();
    }

    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| {
            if n == 1 {
                format!("1 {unit}")
            } else {
                format!("{n} {unit}s")
            }
        })
        .collect();

    format!("{} ago", parts.join(", "))
}

// ============================================================================
// Bars and Text
// ============================================================================

/// Number of filled cells for a fraction of `width`
pub fn filled_cells(fraction: f64, width: usize) -> usize {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    ((fraction * width as f64).round() as usize).min(width)
}

/// Usage bar colored by how full the drive is
pub fn usage_bar(fraction: f64, width: usize) -> String {
    let filled = filled_cells(fraction, width);
    let bar = "█".repeat(filled);
    let rest = "░".repeat(width - filled);

    let bar = if fraction >= 0.9 {
        bar.red()
    } else if fraction >= 0.75 {
        bar.yellow()
    } else {
        bar.green()
    };
    format!("{bar}{}", rest.dimmed())
}

/// Truncate to `max_len` characters, keeping the start
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len == 0 {
        return String::new();
    }
    let kept: String = text.chars().take(max_len - 1).collect();
    format!("{kept}…")
}

// ============================================================================
// Tests
// ============================================================================
