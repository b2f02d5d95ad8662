//! Parsers for rclone's output.
//!
//! All knowledge of what rclone prints lives here, so a change in the
//! tool's output format only touches this module.
//!
//! `rclone about` prints either JSON (with `--json`):
//!
//! ```text
//! {"total":16106127360,"used":8053063680,"free":7516192768,"trashed":104857600}
//! ```
//!
//! or aligned `Key: value` lines with human-readable sizes:
//!
//! ```text
//! Total:   15 GiB
//! Used:    7.500 GiB (8053063680 Byte)
//! Free:    7 GiB
//! Trashed: 100 MiB
//! Objects: 1.234k
//! ```
//!
//! Both are accepted, fields may be missing, unknown keys are ignored.

use serde_json::{Map, Value};

use crate::types::{RemoteName, Usage};

const KIB: f64 = 1024.0;

/// Parse `rclone listremotes` output into remote names.
///
/// One `name:` per line; blank lines are skipped and duplicates dropped
/// (first occurrence wins). Returns the offending line for anything that
/// does not look like a remote.
pub fn parse_remote_list(output: &str) -> Result<Vec<RemoteName>, String> {
    let mut remotes: Vec<RemoteName> = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if !line.ends_with(':') {
            return Err(line.to_string());
        }

        let remote = RemoteName::new(line).ok_or_else(|| line.to_string())?;
        if !remotes.contains(&remote) {
            remotes.push(remote);
        }
    }

    Ok(remotes)
}

/// Parse `rclone about` output (JSON or line-oriented) into usage numbers.
///
/// Fails with a diagnostic if nothing recognizable was found or the numbers
/// contradict each other (`used + free > total`).
pub fn parse_about(output: &str) -> Result<Usage, String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err("rclone about printed nothing".to_string());
    }

    let usage = if trimmed.starts_with('{') {
        parse_about_json(trimmed)?
    } else {
        parse_about_lines(trimmed)
    };

    if usage.is_empty() {
        return Err(format!(
            "no usage fields in rclone about output: {}",
            first_line(trimmed)
        ));
    }

    if !usage.is_consistent() {
        return Err(format!(
            "inconsistent usage report: used {} + free {} exceeds total {}",
            usage.used.unwrap_or(0),
            usage.free.unwrap_or(0),
            usage.total.unwrap_or(0)
        ));
    }

    Ok(usage)
}

fn parse_about_json(text: &str) -> Result<Usage, String> {
    let map: Map<String, Value> =
        serde_json::from_str(text).map_err(|e| format!("invalid JSON from rclone about: {e}"))?;

    let mut usage = Usage::default();
    for (key, value) in &map {
        let Some(slot) = field_slot(&mut usage, key) else {
            log::trace!("Ignoring about field {key}");
            continue;
        };
        *slot = json_number(value, key == "objects");
    }

    Ok(usage)
}

fn parse_about_lines(text: &str) -> Usage {
    let mut usage = Usage::default();

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let is_count = key == "objects";
        let Some(slot) = field_slot(&mut usage, &key) else {
            continue;
        };

        let value = value.trim();
        *slot = if is_count {
            parse_count(value)
        } else {
            parse_size(value)
        };
    }

    usage
}

/// Map an about key to the usage field it fills.
fn field_slot<'a>(usage: &'a mut Usage, key: &str) -> Option<&'a mut Option<u64>> {
    match key.to_lowercase().as_str() {
        "total" => Some(&mut usage.total),
        "used" => Some(&mut usage.used),
        "free" => Some(&mut usage.free),
        "trashed" | "trash" => Some(&mut usage.trashed),
        "other" => Some(&mut usage.other),
        "objects" => Some(&mut usage.objects),
        _ => None,
    }
}

fn json_number(value: &Value, is_count: bool) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) if is_count => parse_count(s),
        Value::String(s) => parse_size(s),
        _ => None,
    }
}

/// Parse a size as printed by rclone.
///
/// Prefers an exact `(N Byte)` annotation when present, otherwise accepts a
/// plain byte count or a decimal number with a binary suffix
/// (`B`, `K`/`KiB`/`KB`, `M`, `G`, `T`, `P`, any case).
pub fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim();

    if let Some((_, annotated)) = value.split_once('(') {
        let exact = annotated
            .trim_end_matches(')')
            .trim()
            .trim_end_matches("Bytes")
            .trim_end_matches("Byte")
            .trim();
        if let Ok(bytes) = exact.parse::<u64>() {
            return Some(bytes);
        }
    }

    let (number, suffix) = split_number(value)?;
    let exponent = match suffix.to_uppercase().as_str() {
        "" | "B" | "BYTE" | "BYTES" => 0,
        "K" | "KI" | "KB" | "KIB" => 1,
        "M" | "MI" | "MB" | "MIB" => 2,
        "G" | "GI" | "GB" | "GIB" => 3,
        "T" | "TI" | "TB" | "TIB" => 4,
        "P" | "PI" | "PB" | "PIB" => 5,
        _ => return None,
    };

    Some((number * KIB.powi(exponent)).round() as u64)
}

/// Parse an object count, allowing rclone's decimal `k`/`M`/`G` suffixes.
pub fn parse_count(value: &str) -> Option<u64> {
    let (number, suffix) = split_number(value.trim())?;
    let multiplier = match suffix {
        "" => 1.0,
        "k" | "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        _ => return None,
    };

    Some((number * multiplier).round() as u64)
}

/// Split `"7.5 GiB"` into `(7.5, "GiB")`.
fn split_number(value: &str) -> Option<(f64, &str)> {
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let number = value[..end].parse::<f64>().ok()?;
    Some((number, value[end..].trim()))
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_parse_remote_list() {
        let remotes = parse_remote_list("gdrive:\nonedrive:\n").unwrap();
        let names: Vec<&str> = remotes.iter().map(RemoteName::as_str).collect();
        assert_eq!(names, ["gdrive", "onedrive"]);
    }

    #[test]
    fn test_parse_remote_list_empty() {
        assert!(parse_remote_list("").unwrap().is_empty());
        assert!(parse_remote_list("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_remote_list_skips_duplicates_and_whitespace() {
        let remotes = parse_remote_list("  gdrive:  \r\ngdrive:\nwork box:\n").unwrap();
        let names: Vec<&str> = remotes.iter().map(RemoteName::as_str).collect();
        assert_eq!(names, ["gdrive", "work box"]);
    }

    #[test]
    fn test_parse_remote_list_rejects_garbage() {
        assert_eq!(
            parse_remote_list("gdrive:\nfoo\nonedrive:\n"),
            Err("foo".to_string())
        );
        assert_eq!(parse_remote_list(":\n"), Err(":".to_string()));
    }

    #[test]
    fn test_parse_remote_list_rejects_notice_line() {
        // First malformed line is reported, even if later lines are also bad
        assert_eq!(
            parse_remote_list("gdrive:\nNOTICE: config file not found\nfoo\n"),
            Err("NOTICE: config file not found".to_string())
        );
    }

    #[test]
    fn test_parse_about_json() {
        let usage = parse_about(
            r#"{"total":16106127360,"used":8053063680,"free":7516192768,"trashed":104857600,"other":0,"objects":1234}"#,
        )
        .unwrap();
        assert_eq!(usage.total, Some(15 * GIB));
        assert_eq!(usage.used, Some(8_053_063_680));
        assert_eq!(usage.free, Some(7 * GIB));
        assert_eq!(usage.trashed, Some(104_857_600));
        assert_eq!(usage.other, Some(0));
        assert_eq!(usage.objects, Some(1234));
    }

    #[test]
    fn test_parse_about_json_missing_optional_fields() {
        let usage = parse_about(r#"{"total":100,"used":40,"free":60}"#).unwrap();
        assert_eq!(usage.trashed, None);
        assert_eq!(usage.other, None);
        assert_eq!(usage.objects, None);
    }

    #[test]
    fn test_parse_about_lines() {
        let output = "Total:   15 GiB\nUsed:    7.500 GiB (8053063680 Byte)\nFree:    7 GiB\nTrashed: 100 MiB\nOther:   0 B\nObjects: 1.234k\n";
        let usage = parse_about(output).unwrap();
        assert_eq!(usage.total, Some(15 * GIB));
        assert_eq!(usage.used, Some(8_053_063_680));
        assert_eq!(usage.free, Some(7 * GIB));
        assert_eq!(usage.trashed, Some(100 * 1024 * 1024));
        assert_eq!(usage.other, Some(0));
        assert_eq!(usage.objects, Some(1234));
    }

    #[test]
    fn test_parse_about_lines_used_only() {
        // Some backends only know how much is used
        let usage = parse_about("Used: 12.5 MiB\nsome banner line\n").unwrap();
        assert_eq!(usage.used, Some(13_107_200));
        assert_eq!(usage.total, None);
    }

    #[test]
    fn test_parse_about_rejects_unusable_output() {
        assert!(parse_about("").is_err());
        assert!(parse_about("nothing to see here").is_err());
        assert!(parse_about("{not json").is_err());
        assert!(parse_about(r#"{"unrelated": 1}"#).is_err());
    }

    #[test]
    fn test_parse_about_rejects_inconsistent_numbers() {
        let err = parse_about(r#"{"total":100,"used":60,"free":60}"#).unwrap_err();
        assert!(err.contains("inconsistent"));
    }

    #[test]
    fn test_parse_about_accepts_full_disk() {
        let usage = parse_about(r#"{"total":100,"used":100,"free":0}"#).unwrap();
        assert!(usage.is_consistent());
    }

    #[test]
    fn test_parse_size_variants() {
        assert_eq!(parse_size("0 B"), Some(0));
        assert_eq!(parse_size("512"), Some(512));
        assert_eq!(parse_size("1 KiB"), Some(1024));
        assert_eq!(parse_size("1.5Ki"), Some(1536));
        assert_eq!(parse_size("2 GB"), Some(2 * GIB));
        assert_eq!(parse_size("1 TiB"), Some(1024 * GIB));
        assert_eq!(parse_size("15 GiB (16106127360 Byte)"), Some(16_106_127_360));
        assert_eq!(parse_size("unknown"), None);
        assert_eq!(parse_size("-1"), None);
        assert_eq!(parse_size("3 parsecs"), None);
    }

    #[test]
    fn test_parse_count_variants() {
        assert_eq!(parse_count("42"), Some(42));
        assert_eq!(parse_count("1.234k"), Some(1234));
        assert_eq!(parse_count("2M"), Some(2_000_000));
        assert_eq!(parse_count("many"), None);
    }
}
