//! Timestamps encoded in chat-file names
//!
//! SillyTavern names chat files `<Character> - YYYY-MM-DD@HHhMMmSSs.jsonl`.
//! The date is the session's creation day; the time-of-day component is also
//! summed across files as a rough "time spent" figure.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::Serialize;

use crate::types::Instant;

static FILENAME_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4}-[0-9]{2}-[0-9]{2})@([0-9]{2})h([0-9]{2})m([0-9]{2})s")
        .expect("valid filename pattern")
});

/// Time information extracted from a chat-file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilenameTime {
    /// Date portion, `YYYY-MM-DD`
    pub date: String,
    /// `H*3600 + M*60 + S` of the time portion
    pub elapsed_seconds: u64,
    /// Date and time combined; `None` when they do not form a valid instant
    pub instant: Option<Instant>,
}

/// Extract the `YYYY-MM-DD@HHhMMmSSs` stamp from a file name
///
/// Returns `None` when the name carries no stamp, which is common for
/// imported or renamed chats.
///
/// # Examples
///
/// ```
/// use companion_stats::filename_time::parse_filename_time;
///
/// let t = parse_filename_time("Alice - 2024-03-05@14h30m00s.jsonl").unwrap();
/// assert_eq!(t.date, "2024-03-05");
/// assert_eq!(t.elapsed_seconds, 52_200);
/// ```
pub fn parse_filename_time(file_name: &str) -> Option<FilenameTime> {
    let caps = FILENAME_TIME.captures(file_name)?;
    let hours: u64 = caps[2].parse().ok()?;
    let minutes: u64 = caps[3].parse().ok()?;
    let seconds: u64 = caps[4].parse().ok()?;

    let instant = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
        .ok()
        .zip(NaiveTime::from_hms_opt(hours as u32, minutes as u32, seconds as u32))
        .map(|(date, time)| date.and_time(time));

    Some(FilenameTime {
        date: caps[1].to_string(),
        elapsed_seconds: hours * 3600 + minutes * 60 + seconds,
        instant,
    })
}
