//! Reading a single chat file
//!
//! A chat file is JSONL: a header object (user/character names and chat
//! metadata) followed by one message object per line. Only lines that look
//! like messages (they carry `mes` or `is_user`) are counted; anything else,
//! including lines that are not JSON at all, is skipped without affecting the
//! rest of the file.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::date_parser::parse_chat_date;
use crate::source::{candidate_folders, ChatContentSource};
use crate::types::{CharacterContext, FileStatsSummary};
use crate::word_count::{count_tokens, count_words, is_cjk};

/// One message line of a chat file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Message body (`mes`); empty when absent or not a string
    pub text: String,
    /// `is_user == true`
    pub is_user: bool,
    /// Author name (`name`)
    pub character_name: String,
    /// Raw `send_date`; numeric values are kept as their decimal string
    pub send_date: Option<String>,
}

impl MessageRecord {
    /// Parse one line, returning `None` for anything that is not a message
    pub fn parse_line(line: &str) -> Option<Self> {
        let record: Map<String, Value> = serde_json::from_str(line).ok()?;
        if !record.contains_key("mes") && !record.contains_key("is_user") {
            return None;
        }

        let text = record
            .get("mes")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let is_user = record.get("is_user") == Some(&Value::Bool(true));
        let character_name = record
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let send_date = match record.get("send_date") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Some(Self {
            text,
            is_user,
            character_name,
            send_date,
        })
    }
}

/// Parse every non-blank line of a chat file, skipping non-message lines
pub fn parse_chat_content(content: &str) -> Vec<MessageRecord> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(MessageRecord::parse_line)
        .collect()
}

/// Reduce chat file content to its statistics
///
/// The earliest instant is taken from user-authored messages only.
pub fn summarize_chat_content(content: &str) -> FileStatsSummary {
    parse_chat_content(content)
        .iter()
        .fold(FileStatsSummary::default(), |mut summary, record| {
            summary.word_count += count_words(record.text.as_str());
            summary.message_count += 1;
            if record.is_user {
                summary.user_message_count += 1;
                if let Some(instant) = record.send_date.as_deref().and_then(parse_chat_date) {
                    summary.earliest_user_instant = Some(match summary.earliest_user_instant {
                        Some(current) if current <= instant => current,
                        _ => instant,
                    });
                }
            }
            summary
        })
}

/// Fetches chat files through a [`ChatContentSource`] and summarizes them
#[derive(Clone)]
pub struct ChatFileStatsFetcher {
    source: Arc<dyn ChatContentSource>,
}

impl std::fmt::Debug for ChatFileStatsFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatFileStatsFetcher").finish_non_exhaustive()
    }
}

impl ChatFileStatsFetcher {
    /// Create a fetcher over `source`
    pub fn new(source: Arc<dyn ChatContentSource>) -> Self {
        Self { source }
    }

    /// Fetch the raw content of `file_name`, trying each candidate folder
    ///
    /// Source errors and empty bodies both count as "no content" for that
    /// folder. Returns `None` when no folder produced anything.
    pub async fn fetch_content(&self, file_name: &str, context: &CharacterContext) -> Option<String> {
        for folder in candidate_folders(context.identifier(), file_name) {
            match self.source.fetch_chat(&folder, file_name).await {
                Ok(Some(text)) if !text.is_empty() => return Some(text),
                Ok(_) => {
                    tracing::debug!(folder = %folder, file_name, "No chat content in folder");
                }
                Err(e) => {
                    tracing::debug!(folder = %folder, file_name, error = %e, "Chat fetch failed");
                }
            }
        }
        None
    }

    /// Fetch and summarize `file_name`
    ///
    /// Never fails: an unavailable file yields an all-zero summary.
    pub async fn fetch(&self, file_name: &str, context: &CharacterContext) -> FileStatsSummary {
        match self.fetch_content(file_name, context).await {
            Some(content) => summarize_chat_content(&content),
            None => FileStatsSummary::default(),
        }
    }
}

/// Per-author totals within one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SideStats {
    /// Filtered word count
    pub words: u64,
    /// Approximate stored size in bytes
    pub size_bytes: u64,
    /// Number of messages
    pub count: u64,
    /// Mean share of CJK ideographs among countable characters
    pub cjk_ratio: f64,
    /// Mean share of Latin word runs among countable characters
    pub latin_ratio: f64,
}

/// User vs character breakdown of one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationBreakdown {
    pub user: SideStats,
    pub character: SideStats,
}

impl ConversationBreakdown {
    /// Compute the breakdown for a list of messages
    pub fn from_records(records: &[MessageRecord]) -> Self {
        let mut breakdown = Self::default();
        for record in records {
            let side = if record.is_user {
                &mut breakdown.user
            } else {
                &mut breakdown.character
            };
            side.words += count_words(record.text.as_str());
            side.size_bytes += stored_size(record);
            side.count += 1;

            let ideographs = record
                .text
                .chars()
                .filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c))
                .count() as f64;
            let latin = count_tokens(&record.text.replace(is_cjk, " ")) as f64;
            let total = ideographs + latin;
            if total > 0.0 {
                side.cjk_ratio += ideographs / total;
                side.latin_ratio += latin / total;
            }
        }

        for side in [&mut breakdown.user, &mut breakdown.character] {
            if side.count > 0 {
                side.cjk_ratio /= side.count as f64;
                side.latin_ratio /= side.count as f64;
            }
        }
        breakdown
    }
}

/// Bytes the message would take as a compact JSON line plus line break
fn stored_size(record: &MessageRecord) -> u64 {
    let line = serde_json::json!({
        "content": record.text,
        "is_user": record.is_user,
        "ch_name": record.character_name,
        "send_date": record.send_date.as_deref().unwrap_or_default(),
    });
    line.to_string().len() as u64 + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryChatSource;
    use chrono::NaiveDate;

    const HEADER: &str = r#"{"user_name":"You","character_name":"Alice","create_date":"2024-03-05@14h30m00s","chat_metadata":{}}"#;

    fn chat(lines: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for line in lines {
            out.push('\n');
            out.push_str(line);
        }
        out
    }

    #[test]
    fn test_parse_line_requires_message_fields() {
        assert!(MessageRecord::parse_line(HEADER).is_none());
        assert!(MessageRecord::parse_line("not json").is_none());
        assert!(MessageRecord::parse_line("[1,2,3]").is_none());

        let record = MessageRecord::parse_line(r#"{"is_user":true}"#).unwrap();
        assert!(record.is_user);
        assert_eq!(record.text, "");

        let record = MessageRecord::parse_line(r#"{"mes":null,"name":"Alice"}"#).unwrap();
        assert!(!record.is_user);
        assert_eq!(record.character_name, "Alice");
    }

    #[test]
    fn test_parse_line_is_user_must_be_true_boolean() {
        let record = MessageRecord::parse_line(r#"{"mes":"x","is_user":"true"}"#).unwrap();
        assert!(!record.is_user);
    }

    #[test]
    fn test_parse_line_numeric_send_date() {
        let record =
            MessageRecord::parse_line(r#"{"mes":"x","is_user":true,"send_date":1709649000000}"#)
                .unwrap();
        assert_eq!(record.send_date.as_deref(), Some("1709649000000"));
    }

    #[test]
    fn test_summarize_counts_and_earliest_user_time() {
        let content = chat(&[
            r#"{"name":"Alice","is_user":false,"mes":"Hello traveler","send_date":"March 1, 2024 9:00am"}"#,
            r#"{"name":"You","is_user":true,"mes":"Hi <b>Alice</b>","send_date":"March 5, 2024 2:31pm"}"#,
            "garbage line {",
            "",
            r#"{"name":"You","is_user":true,"mes":"你好","send_date":"March 4, 2024 8:00pm"}"#,
            r#"{"name":"You","is_user":true,"mes":"again","send_date":"Smarch 1, 2024 1:00am"}"#,
        ]);
        let summary = summarize_chat_content(&content);
        assert_eq!(summary.message_count, 4);
        assert_eq!(summary.user_message_count, 3);
        assert_eq!(summary.word_count, 2 + 2 + 2 + 1);
        assert_eq!(
            summary.earliest_user_instant,
            NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(20, 0, 0)
        );
    }

    #[test]
    fn test_summarize_no_user_messages() {
        let content = chat(&[r#"{"name":"Alice","is_user":false,"mes":"Welcome!"}"#]);
        let summary = summarize_chat_content(&content);
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.user_message_count, 0);
        assert_eq!(summary.earliest_user_instant, None);
    }

    #[test]
    fn test_summarize_handles_crlf() {
        let content = format!(
            "{}\r\n{}\r\n",
            HEADER, r#"{"is_user":true,"mes":"one two"}"#
        );
        let summary = summarize_chat_content(&content);
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.word_count, 2);
    }

    #[tokio::test]
    async fn test_fetcher_prefers_avatar_folder() {
        let file = "Alice - 2024-03-05@14h30m00s.jsonl";
        let source = Arc::new(
            InMemoryChatSource::new()
                .with_file("alice_v2", file, chat(&[r#"{"is_user":true,"mes":"a b c"}"#]))
                .with_file("Alice", file, chat(&[r#"{"is_user":true,"mes":"x"}"#])),
        );
        let fetcher = ChatFileStatsFetcher::new(source.clone());
        let summary = fetcher
            .fetch(file, &CharacterContext::for_character("alice_v2.png"))
            .await;
        assert_eq!(summary.word_count, 3);
        assert_eq!(source.fetch_log().len(), 1);
    }

    #[tokio::test]
    async fn test_fetcher_falls_back_to_name_folder() {
        let file = "Alice - 2024-03-05@14h30m00s.jsonl";
        let source = Arc::new(
            InMemoryChatSource::new()
                .with_file("Alice", file, chat(&[r#"{"is_user":true,"mes":"x y"}"#]))
                .with_failing_folder("alice_v2"),
        );
        let fetcher = ChatFileStatsFetcher::new(source.clone());
        let summary = fetcher
            .fetch(file, &CharacterContext::for_character("alice_v2.png"))
            .await;
        assert_eq!(summary.word_count, 2);
        assert_eq!(
            source.fetch_log(),
            vec![
                ("alice_v2".to_string(), file.to_string()),
                ("Alice".to_string(), file.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetcher_empty_content_counts_as_missing() {
        let file = "Alice - x.jsonl";
        let source = Arc::new(
            InMemoryChatSource::new()
                .with_file("avatar", file, "")
                .with_file("Alice", file, chat(&[r#"{"is_user":true,"mes":"ok"}"#])),
        );
        let fetcher = ChatFileStatsFetcher::new(source);
        let summary = fetcher
            .fetch(file, &CharacterContext::for_character("avatar.png"))
            .await;
        assert_eq!(summary.message_count, 1);
    }

    #[tokio::test]
    async fn test_fetcher_nothing_found_is_zero_summary() {
        let fetcher = ChatFileStatsFetcher::new(Arc::new(InMemoryChatSource::new()));
        let summary = fetcher
            .fetch("Ghost - x.jsonl", &CharacterContext::for_character("Ghost.png"))
            .await;
        assert_eq!(summary, FileStatsSummary::default());
    }

    #[test]
    fn test_breakdown_splits_sides() {
        let records = parse_chat_content(&chat(&[
            r#"{"name":"Alice","is_user":false,"mes":"Hello there","send_date":"x"}"#,
            r#"{"name":"You","is_user":true,"mes":"你好"}"#,
            r#"{"name":"You","is_user":true,"mes":"hi 世界"}"#,
        ]));
        let breakdown = ConversationBreakdown::from_records(&records);

        assert_eq!(breakdown.character.count, 1);
        assert_eq!(breakdown.character.words, 2);
        assert_eq!(breakdown.character.latin_ratio, 1.0);
        assert_eq!(breakdown.character.cjk_ratio, 0.0);

        assert_eq!(breakdown.user.count, 2);
        assert_eq!(breakdown.user.words, 2 + 3);
        // (1.0 + 2/3) / 2 and (0.0 + 1/3) / 2
        assert!((breakdown.user.cjk_ratio - (5.0 / 6.0)).abs() < 1e-9);
        assert!((breakdown.user.latin_ratio - (1.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_stored_size_matches_compact_json() {
        let record = MessageRecord {
            text: "hi".to_string(),
            is_user: true,
            character_name: "You".to_string(),
            send_date: None,
        };
        let expected = r#"{"ch_name":"You","content":"hi","is_user":true,"send_date":""}"#.len() as u64 + 2;
        assert_eq!(stored_size(&record), expected);
    }
}
