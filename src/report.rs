//! Display-ready statistics
//!
//! [`StatsReport`] turns [`AggregateStats`] into the strings a stats panel
//! shows, plus the share/tip flags. It is also what the CLI prints and what
//! the refresher publishes.

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{AggregateStats, Instant};

/// Placeholder for every value when statistics could not be computed
pub const UNAVAILABLE: &str = "--";

/// First-met text for a character that was never talked to
pub const NOT_YET_INTERACTED: &str = "Not yet interacted";

/// Explains that word counts from listings are estimates
pub const ESTIMATE_TIP: &str =
    "Word counts are estimated from file sizes when chat contents cannot be read.";

/// Formatted statistics for one character
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub character_name: String,
    pub messages: String,
    pub words: String,
    pub first_met: String,
    pub days_together: String,
    pub chat_time: String,
    pub total_size: String,
    pub chat_files: String,
    /// Sharing only makes sense once a conversation happened
    pub share_enabled: bool,
    pub show_tip: bool,
}

impl StatsReport {
    /// Format computed statistics as of `today`
    pub fn from_stats(stats: &AggregateStats, character_name: &str, today: NaiveDate) -> Self {
        let (first_met, days_together) = match stats.first_instant {
            Some(first) => (
                format_first_met(first),
                days_together(first.date(), today).to_string(),
            ),
            None => (NOT_YET_INTERACTED.to_string(), "0".to_string()),
        };

        Self {
            character_name: character_name.to_string(),
            messages: stats.message_count.to_string(),
            words: stats.word_count.to_string(),
            first_met,
            days_together,
            chat_time: format_duration(stats.total_duration_seconds),
            total_size: format_size(stats.total_size_bytes),
            chat_files: stats.chat_file_count.to_string(),
            share_enabled: stats.message_count > 1,
            show_tip: true,
        }
    }

    /// Report shown when the pipeline failed
    pub fn unavailable(character_name: &str) -> Self {
        Self {
            character_name: character_name.to_string(),
            messages: UNAVAILABLE.to_string(),
            words: UNAVAILABLE.to_string(),
            first_met: UNAVAILABLE.to_string(),
            days_together: UNAVAILABLE.to_string(),
            chat_time: UNAVAILABLE.to_string(),
            total_size: UNAVAILABLE.to_string(),
            chat_files: UNAVAILABLE.to_string(),
            share_enabled: false,
            show_tip: false,
        }
    }

    /// Report for a pipeline outcome
    pub fn from_outcome(
        outcome: &crate::error::Result<AggregateStats>,
        character_name: &str,
        today: NaiveDate,
    ) -> Self {
        match outcome {
            Ok(stats) => Self::from_stats(stats, character_name, today),
            Err(e) => {
                tracing::warn!(error = %e, character = character_name, "Statistics unavailable");
                Self::unavailable(character_name)
            }
        }
    }

    /// Multi-line text rendering
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.character_name));
        for (label, value) in [
            ("First met", &self.first_met),
            ("Days together", &self.days_together),
            ("Messages", &self.messages),
            ("Words", &self.words),
            ("Chat time", &self.chat_time),
            ("Memory size", &self.total_size),
            ("Chat files", &self.chat_files),
        ] {
            out.push_str(&format!("  {:<14} {}\n", label, value));
        }
        if self.show_tip {
            out.push_str(&format!("\n{}\n", ESTIMATE_TIP));
        }
        out
    }
}

/// `x.xx MB` from 1 MiB, `x.xx KB` from 1 KiB, otherwise `N B`
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1.0 {
        format!("{:.2} MB", mb)
    } else if kb >= 1.0 {
        format!("{:.2} KB", kb)
    } else {
        format!("{} B", bytes)
    }
}

/// `Hh Mm`, `Mm Ss` or `Ss`
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub fn format_first_met(instant: Instant) -> String {
    instant.format("%Y-%m-%d %H:%M").to_string()
}

/// Calendar days from the first meeting to `today`, counting both ends
pub fn days_together(first: NaiveDate, today: NaiveDate) -> u64 {
    (today - first).num_days().unsigned_abs() + 1
}
