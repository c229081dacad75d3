//! Shared data types for the statistics pipeline
//!
//! These are the values that cross module boundaries: the chat-file listing
//! entries handed to us by the host, the explicit character context, and the
//! per-file and aggregate results handed back to the presentation layer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// An absolute point in time as written in the chat logs (wall-clock)
pub type Instant = NaiveDateTime;

/// One entry of a character's chat-file listing
///
/// Field names follow the host's listing payload. The host is loose about
/// types (item counts arrive as numbers or strings, sizes as humanized
/// strings or raw byte counts), so every field deserializes leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatFileMetadata {
    /// Chat file name, e.g. `Alice - 2024-03-05@14h30m00s.jsonl`
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_name: String,

    /// Number of messages in the file as reported by the host
    #[serde(default, deserialize_with = "lenient_count")]
    pub chat_items: u64,

    /// Size descriptor: `"12.3KB"`, `"1.1MB"` or a bare byte count
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_size: String,

    /// Timestamp of the file's last message
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_mes: String,
}

impl ChatFileMetadata {
    /// Create a listing entry
    pub fn new(
        file_name: impl Into<String>,
        chat_items: u64,
        file_size: impl Into<String>,
        last_mes: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            chat_items,
            file_size: file_size.into(),
            last_mes: last_mes.into(),
        }
    }
}

/// Accepts a string, a number (rendered to its decimal form) or null
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Accepts a non-negative number or a string starting with digits; anything
/// else counts as zero
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.trunc() as u64))
            .unwrap_or(0),
        Value::String(s) => leading_integer(&s),
        _ => 0,
    })
}

fn leading_integer(s: &str) -> u64 {
    let digits: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Read-only view of the currently selected character
///
/// The pipeline never discovers the character on its own; callers pass in
/// whatever their host knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterContext {
    /// Stable identifier, normally the avatar file name (`Alice.png`)
    pub character_id: Option<String>,

    /// Avatar of the selected character, consulted when `character_id` is absent
    pub selected_avatar: Option<String>,

    /// Human-readable name for display
    pub display_name: Option<String>,
}

impl CharacterContext {
    /// Context for a character identified by its avatar file name
    pub fn for_character(character_id: impl Into<String>) -> Self {
        Self {
            character_id: Some(character_id.into()),
            ..Self::default()
        }
    }

    /// Attach a display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Resolve the identifier used to list chats
    ///
    /// Prefers `character_id`, falling back to `selected_avatar`. Blank
    /// values count as absent.
    pub fn identifier(&self) -> Option<&str> {
        non_blank(self.character_id.as_deref()).or_else(|| non_blank(self.selected_avatar.as_deref()))
    }

    /// Name to show for the character
    pub fn display_name_or_default(&self) -> &str {
        non_blank(self.display_name.as_deref()).unwrap_or("Unknown character")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Statistics for a single chat file read in full
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStatsSummary {
    /// Filtered word count across all valid records
    pub word_count: u64,
    /// Number of valid message records
    pub message_count: u64,
    /// Number of records with `is_user == true`; never exceeds `message_count`
    pub user_message_count: u64,
    /// Earliest parseable timestamp among user-authored records
    pub earliest_user_instant: Option<Instant>,
}

impl FileStatsSummary {
    /// Whether the file contributed anything to a scan
    pub fn has_content(&self) -> bool {
        self.message_count > 0 || self.word_count > 0
    }
}

/// Final reconciled statistics for one character
///
/// `first_instant` is `None` exactly when the pipeline judged that no real
/// interaction happened; `message_count` and `word_count` are then zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub message_count: u64,
    pub word_count: u64,
    pub first_instant: Option<Instant>,
    pub total_duration_seconds: u64,
    pub total_size_bytes: u64,
    pub chat_file_count: usize,
}

impl AggregateStats {
    /// The "nothing to report" result (no character, no history)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the result represents a genuine two-sided conversation
    pub fn has_interaction(&self) -> bool {
        self.first_instant.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_deserializes_host_payload() {
        let json = r#"{
            "file_name": "Alice - 2024-03-05@14h30m00s.jsonl",
            "file_size": "12.3KB",
            "chat_items": 42,
            "mes": "See you tomorrow",
            "last_mes": "March 6, 2024 9:05pm"
        }"#;
        let meta: ChatFileMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.file_name, "Alice - 2024-03-05@14h30m00s.jsonl");
        assert_eq!(meta.chat_items, 42);
        assert_eq!(meta.file_size, "12.3KB");
        assert_eq!(meta.last_mes, "March 6, 2024 9:05pm");
    }

    #[test]
    fn test_metadata_lenient_counts_and_sizes() {
        let json = r#"{"file_name": "a.jsonl", "chat_items": "17", "file_size": 2048}"#;
        let meta: ChatFileMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.chat_items, 17);
        assert_eq!(meta.file_size, "2048");
        assert_eq!(meta.last_mes, "");

        let json = r#"{"file_name": "b.jsonl", "chat_items": "n/a", "last_mes": 1709650000000}"#;
        let meta: ChatFileMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.chat_items, 0);
        assert_eq!(meta.last_mes, "1709650000000");
    }

    #[test]
    fn test_metadata_null_fields_default() {
        let json = r#"{"file_name": null, "chat_items": null}"#;
        let meta: ChatFileMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta, ChatFileMetadata::default());
    }

    #[test]
    fn test_context_identifier_prefers_character_id() {
        let ctx = CharacterContext {
            character_id: Some("Alice.png".to_string()),
            selected_avatar: Some("Bob.png".to_string()),
            display_name: None,
        };
        assert_eq!(ctx.identifier(), Some("Alice.png"));
    }

    #[test]
    fn test_context_identifier_falls_back_to_selected_avatar() {
        let ctx = CharacterContext {
            character_id: Some("  ".to_string()),
            selected_avatar: Some("Bob.png".to_string()),
            display_name: None,
        };
        assert_eq!(ctx.identifier(), Some("Bob.png"));
        assert_eq!(CharacterContext::default().identifier(), None);
    }

    #[test]
    fn test_context_display_name_default() {
        assert_eq!(
            CharacterContext::default().display_name_or_default(),
            "Unknown character"
        );
        let ctx = CharacterContext::for_character("Alice.png").with_display_name("Alice");
        assert_eq!(ctx.display_name_or_default(), "Alice");
    }

    #[test]
    fn test_summary_has_content() {
        assert!(!FileStatsSummary::default().has_content());
        let summary = FileStatsSummary {
            word_count: 0,
            message_count: 1,
            ..Default::default()
        };
        assert!(summary.has_content());
    }
}
