/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `stats`: Aggregate statistics for a character
- `file`:  Summarize one chat file
- `words`: Filtered word count for a piece of text
- `date`:  Parse a chat timestamp

Handlers build their output as strings so tests can check them without
capturing stdout; the `run_*` functions print.
*/

use crate::error::{Result, StatsError};

// Character statistics
pub mod stats;

// Single chat file summary
pub mod file;

/// Serialize a value into pretty JSON
fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value).map_err(StatsError::Serialization)?)
}

// Word count command handler
pub mod words {
    use super::*;
    use crate::word_count::count_words;
    use std::io::Read;

    /// Count words in `text`, or in stdin when `text` is `None`
    pub fn run_words(text: Option<String>) -> Result<()> {
        let text = match text {
            Some(text) => text,
            None => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .map_err(StatsError::Io)?;
                buffer
            }
        };
        println!("{}", count_report(&text));
        Ok(())
    }

    /// One line with the filtered count
    pub fn count_report(text: &str) -> String {
        count_words(text).to_string()
    }

}

// Timestamp command handler
pub mod date {
    use super::*;
    use crate::date_parser::parse_chat_date;

    /// Parse `text` and print the normalized instant
    pub fn run_date(text: &str) -> Result<()> {
        println!("{}", normalize(text)?);
        Ok(())
    }

    /// `YYYY-MM-DDTHH:MM:SS` for a recognized timestamp
    pub fn normalize(text: &str) -> Result<String> {
        parse_chat_date(text)
            .map(|instant| instant.format("%Y-%m-%dT%H:%M:%S").to_string())
            .ok_or_else(|| {
                StatsError::Parse(format!("unrecognized timestamp: {}", text)).into()
            })
    }

}
