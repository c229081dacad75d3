//! Chat-log timestamp parsing
//!
//! SillyTavern writes human-oriented timestamps such as
//! `"December 25, 2023 11:30pm"`. Older logs and some imports carry ISO 8601
//! strings or epoch milliseconds instead, so after the primary grammar a
//! small set of machine formats is tried before giving up.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::types::Instant;

static HUMAN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-z]+)\s+([0-9]+),\s+([0-9]+)\s+([0-9]+):([0-9]+)(am|pm)")
        .expect("valid date pattern")
});

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a chat-log timestamp
///
/// Returns `None` for empty input, an unknown month name in the primary
/// grammar, impossible calendar values, or text no fallback format accepts.
///
/// # Examples
///
/// ```
/// use companion_stats::date_parser::parse_chat_date;
///
/// let instant = parse_chat_date("December 25, 2023 11:30pm").unwrap();
/// assert_eq!(instant.to_string(), "2023-12-25 23:30:00");
/// assert!(parse_chat_date("not a date").is_none());
/// ```
pub fn parse_chat_date(raw: &str) -> Option<Instant> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(caps) = HUMAN_DATE.captures(raw) {
        let Some(month) = month_number(&caps[1]) else {
            tracing::debug!(input = raw, month = &caps[1], "Unknown month name");
            return None;
        };
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        let hour: u32 = caps[4].parse().ok()?;
        let minute: u32 = caps[5].parse().ok()?;
        let Some(hour) = to_24_hour(hour, &caps[6].to_ascii_lowercase()) else {
            tracing::debug!(input = raw, hour, "Hour outside 1-12");
            return None;
        };

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        return Some(date.and_time(time));
    }

    parse_fallback(raw)
}

/// Convert a 12-hour clock reading; `None` unless `hour` is in `1..=12`
fn to_24_hour(hour: u32, meridiem: &str) -> Option<u32> {
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (meridiem, hour) {
        ("pm", 12) => 12,
        ("pm", h) => h + 12,
        ("am", 12) => 0,
        (_, h) => h,
    };
    Some(hour)
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Machine formats: RFC 3339 / RFC 2822 (normalized to UTC), naive ISO-like
/// forms, a bare date, and epoch milliseconds.
fn parse_fallback(raw: &str) -> Option<Instant> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.naive_utc());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if raw.len() >= 11 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let millis: i64 = raw.parse().ok()?;
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc());
    }
    None
}
