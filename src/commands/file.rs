//! Single chat file command
//!
//! Reads one `.jsonl` chat and prints what the pipeline would count for it,
//! plus the user/character breakdown.

use std::path::Path;

use serde::Serialize;

use super::to_pretty_json;
use crate::chat_file::{parse_chat_content, summarize_chat_content, ConversationBreakdown};
use crate::error::{Result, StatsError};
use crate::filename_time::{parse_filename_time, FilenameTime};
use crate::report::{format_duration, format_first_met, format_size};
use crate::types::FileStatsSummary;

/// Everything known about one chat file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub size_bytes: u64,
    pub started: Option<FilenameTime>,
    pub summary: FileStatsSummary,
    pub breakdown: ConversationBreakdown,
}

impl FileReport {
    /// Analyze chat `content` stored as `file_name`
    pub fn analyze(file_name: &str, content: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            size_bytes: content.len() as u64,
            started: parse_filename_time(file_name),
            summary: summarize_chat_content(content),
            breakdown: ConversationBreakdown::from_records(&parse_chat_content(content)),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("{}\n", self.file_name);
        out.push_str(&format!("  Size           {}\n", format_size(self.size_bytes)));
        if let Some(started) = &self.started {
            out.push_str(&format!("  Started        {}\n", started.date));
            out.push_str(&format!(
                "  Time of day    {}\n",
                format_duration(started.elapsed_seconds)
            ));
        }
        out.push_str(&format!("  Messages       {}\n", self.summary.message_count));
        out.push_str(&format!("  From user      {}\n", self.summary.user_message_count));
        out.push_str(&format!("  Words          {}\n", self.summary.word_count));
        if let Some(first) = self.summary.earliest_user_instant {
            out.push_str(&format!("  First reply    {}\n", format_first_met(first)));
        }
        for (label, side) in [
            ("User", &self.breakdown.user),
            ("Character", &self.breakdown.character),
        ] {
            out.push_str(&format!(
                "  {:<14} {} messages, {} words, {}, CJK {:.0}%, Latin {:.0}%\n",
                label,
                side.count,
                side.words,
                format_size(side.size_bytes),
                side.cjk_ratio * 100.0,
                side.latin_ratio * 100.0
            ));
        }
        out
    }
}

/// Print the report for the chat file at `path`
pub async fn run_file(path: &Path, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(StatsError::Io)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let report = FileReport::analyze(file_name, &content);
    if json {
        println!("{}", to_pretty_json(&report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}
