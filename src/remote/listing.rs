//! Parser for long-format (`ls -la`) directory listings.
//!
//! Works on the raw text of an `ls -la` run through ssh or an sftp batch
//! session. Lines it does not understand are skipped, never reported.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};

use crate::models::{join_remote_path, sort_entries, DirectoryEntry};

const MIN_TOKENS: usize = 9;

/// Parse a listing of `base` using the current year for `Mon D HH:MM` dates.
pub fn parse_listing(base: &str, text: &str) -> Vec<DirectoryEntry> {
    parse_listing_with_year(base, text, Local::now().year())
}

pub fn parse_listing_with_year(base: &str, text: &str, year: i32) -> Vec<DirectoryEntry> {
    let mut entries: Vec<DirectoryEntry> = text
        .lines()
        .filter_map(|line| parse_line(base, line, year))
        .collect();
    sort_entries(&mut entries);
    entries
}

fn parse_line(base: &str, line: &str, year: i32) -> Option<DirectoryEntry> {
    let line = line.trim();
    if line.is_empty() || is_noise(line) {
        return None;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return None;
    }

    let name = tokens[8..].join(" ");
    if name.starts_with('.') {
        return None;
    }

    let is_directory = tokens[0].starts_with('d');
    let size_bytes = if is_directory {
        0
    } else {
        tokens[4].parse::<i64>().unwrap_or(0)
    };

    Some(DirectoryEntry {
        full_path: join_remote_path(base, &name),
        name,
        is_directory,
        size_bytes,
        modified_at: parse_date(tokens[5], tokens[6], tokens[7], year),
    })
}

/// Prompts, `total N` summaries and the `.`/`..` self entries.
fn is_noise(line: &str) -> bool {
    if line.starts_with("sftp>") {
        return true;
    }
    if let Some(rest) = line.strip_prefix("total ") {
        if rest.trim().chars().all(|c| c.is_ascii_digit() || c == '.' || c.is_ascii_alphabetic()) {
            return true;
        }
    }
    matches!(line.split_whitespace().last(), Some(".") | Some(".."))
}

fn parse_date(month: &str, day: &str, time_or_year: &str, year: i32) -> Option<NaiveDateTime> {
    if time_or_year.contains(':') {
        let stamp = format!("{} {} {} {}", year, month, day, time_or_year);
        NaiveDateTime::parse_from_str(&stamp, "%Y %b %d %H:%M").ok()
    } else {
        let stamp = format!("{} {} {}", time_or_year, month, day);
        NaiveDate::parse_from_str(&stamp, "%Y %b %d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}
