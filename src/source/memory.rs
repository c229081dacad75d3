//! In-process chat source
//!
//! Holds listings and file contents in memory. Hosts that already have the
//! chats loaded can hand them to the pipeline through this type, and tests
//! use it to script missing files, transport failures and slow fetches.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, StatsError};
use crate::source::{ChatContentSource, ChatListingSource};
use crate::types::ChatFileMetadata;

/// Listing and content source backed by in-memory maps
#[derive(Debug, Default)]
pub struct InMemoryChatSource {
    listings: HashMap<String, Vec<ChatFileMetadata>>,
    files: HashMap<(String, String), String>,
    failing_folders: HashSet<String>,
    fetch_delay: Option<Duration>,
    fetch_log: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryChatSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the listing returned for `character_id`
    pub fn with_listing(mut self, character_id: &str, files: Vec<ChatFileMetadata>) -> Self {
        self.listings.insert(character_id.to_string(), files);
        self
    }

    /// Register the content of `<folder>/<file_name>`
    pub fn with_file(mut self, folder: &str, file_name: &str, content: impl Into<String>) -> Self {
        self.files
            .insert((folder.to_string(), file_name.to_string()), content.into());
        self
    }

    /// Make every fetch under `folder` fail with a transport error
    pub fn with_failing_folder(mut self, folder: &str) -> Self {
        self.failing_folders.insert(folder.to_string());
        self
    }

    /// Delay every fetch, so concurrent fetches overlap
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Every `(folder, file_name)` requested so far, in request order
    pub fn fetch_log(&self) -> Vec<(String, String)> {
        self.fetch_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Highest number of fetches observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChatListingSource for InMemoryChatSource {
    async fn list_chats(&self, character_id: &str) -> Result<Vec<ChatFileMetadata>> {
        Ok(self.listings.get(character_id).cloned().unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl ChatContentSource for InMemoryChatSource {
    async fn fetch_chat(&self, folder: &str, file_name: &str) -> Result<Option<String>> {
        if let Ok(mut log) = self.fetch_log.lock() {
            log.push((folder.to_string(), file_name.to_string()));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_folders.contains(folder) {
            return Err(StatsError::Source(format!("simulated failure for {}", folder)).into());
        }
        Ok(self
            .files
            .get(&(folder.to_string(), file_name.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_unknown_character_is_empty() {
        let source = InMemoryChatSource::new();
        assert!(source.list_chats("nobody.png").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_registered_and_missing_files() {
        let source = InMemoryChatSource::new().with_file("Alice", "a.jsonl", "{}");
        assert_eq!(
            source.fetch_chat("Alice", "a.jsonl").await.unwrap(),
            Some("{}".to_string())
        );
        assert_eq!(source.fetch_chat("Alice", "b.jsonl").await.unwrap(), None);
        assert_eq!(source.fetch_log().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_folder_errors() {
        let source = InMemoryChatSource::new()
            .with_file("Alice", "a.jsonl", "{}")
            .with_failing_folder("Alice");
        assert!(source.fetch_chat("Alice", "a.jsonl").await.is_err());
    }
}
