//! On-disk SillyTavern chat directory
//!
//! SillyTavern stores chats as `<data>/<user>/chats/<folder>/<file>.jsonl`,
//! one folder per character (the avatar name without extension). This
//! source reads that layout directly, computing listing metadata the same way
//! the server's listing endpoint does:
//!
//! - `chat_items` = number of non-blank lines minus the header line
//! - `file_size`  = size in KiB with two decimals and a `kb` suffix
//! - `last_mes`   = `send_date` of the final record

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Result, StatsError};
use crate::source::{strip_extension, ChatContentSource, ChatListingSource};
use crate::types::ChatFileMetadata;

/// Chat source reading a local `chats/` directory
#[derive(Debug, Clone)]
pub struct LocalChatStore {
    root: PathBuf,
}

impl LocalChatStore {
    /// Create a store rooted at a `chats/` directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `<root>/<folder>`, refusing names that would escape the root
    fn folder_path(&self, folder: &str) -> Option<PathBuf> {
        is_plain_segment(folder).then(|| self.root.join(folder))
    }

    /// Resolve `<root>/<folder>/<file_name>`, refusing names that would
    /// escape the root
    fn chat_path(&self, folder: &str, file_name: &str) -> Option<PathBuf> {
        if is_plain_segment(file_name) {
            self.folder_path(folder).map(|dir| dir.join(file_name))
        } else {
            None
        }
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains(['/', '\\'])
}

/// Build a listing entry from a chat file's content and byte size
pub fn describe_chat_file(file_name: &str, content: &str, size_bytes: u64) -> ChatFileMetadata {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let chat_items = lines.len().saturating_sub(1) as u64;
    let last_mes = lines
        .last()
        .and_then(|line| serde_json::from_str::<Value>(line).ok())
        .and_then(|record| match record.get("send_date") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default();

    ChatFileMetadata {
        file_name: file_name.to_string(),
        chat_items,
        file_size: format!("{:.2}kb", size_bytes as f64 / 1024.0),
        last_mes,
    }
}

#[async_trait::async_trait]
impl ChatListingSource for LocalChatStore {
    async fn list_chats(&self, character_id: &str) -> Result<Vec<ChatFileMetadata>> {
        let folder = strip_extension(character_id);
        let Some(dir) = self.folder_path(folder) else {
            return Ok(Vec::new());
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %dir.display(), "No chat folder for character");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StatsError::Io(e).into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StatsError::Io)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let size = entry.metadata().await.map_err(StatsError::Io)?.len();
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable chat file");
                    continue;
                }
            };
            files.push(describe_chat_file(file_name, &content, size));
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }
}

#[async_trait::async_trait]
impl ChatContentSource for LocalChatStore {
    async fn fetch_chat(&self, folder: &str, file_name: &str) -> Result<Option<String>> {
        let Some(path) = self.chat_path(folder, file_name) else {
            tracing::debug!(folder, file_name, "Rejected chat path");
            return Ok(None);
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StatsError::Io(e).into()),
        }
    }
}
