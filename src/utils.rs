//! Utility functions for naming and small field conversions

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Catalog prefix used for file names and default titles
pub const RELEASE_PREFIX: &str = "FC2-PPV";

/// Characters that are not allowed in file names on common file systems
const INVALID_FILENAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[allow(clippy::expect_used)]
static RUNTIME_MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)分").expect("runtime pattern is valid"));

/// Make a display name safe to use as a directory name
///
/// Replaces characters that Windows (and therefore most media servers on SMB
/// shares) refuses with `_` and trims surrounding whitespace. Empty results
/// become `"unknown"`.
///
/// # Examples
///
/// ```
/// use leak_enricher::utils::clean_filename;
///
/// assert_eq!(clean_filename("a/b:c"), "a_b_c");
/// assert_eq!(clean_filename("   "), "unknown");
/// ```
#[must_use]
pub fn clean_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `FC2-PPV-<id>`
#[must_use]
pub fn release_label(id: &str) -> String {
    format!("{RELEASE_PREFIX}-{id}")
}

/// Minutes from a catalog duration such as `"65分"` or `"1時間5分"`
///
/// Only the minute component is read, matching what the catalog shows for
/// typical releases.
#[must_use]
pub fn runtime_minutes(duration: &str) -> Option<u32> {
    RUNTIME_MINUTES
        .captures(duration)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Year of a release date
///
/// Parses `YYYY-MM-DD` (or `YYYY/MM/DD`) with chrono and falls back to the
/// leading dash-separated component for partial dates like `2023-05`.
#[must_use]
pub fn release_year(date: &str) -> Option<String> {
    let date = date.trim();
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, format) {
            return Some(parsed.year().to_string());
        }
    }
    date.split('-')
        .next()
        .filter(|year| year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}
