//! Chat listing and content collaborators
//!
//! The pipeline reads chats through two traits so it never depends on where
//! they live:
//!
//! - [`ChatListingSource`] returns a character's chat-file metadata.
//! - [`ChatContentSource`] returns the raw JSONL text of one chat file.
//!
//! Implementations:
//!
//! - [`http::HttpChatSource`] -- talks to a running SillyTavern server.
//! - [`local::LocalChatStore`] -- reads a SillyTavern `chats/` directory
//!   directly from disk.
//! - [`memory::InMemoryChatSource`] -- fixed in-process data for tests and
//!   embedding hosts that already hold the chats.
//!
//! # Canonical Import Path
//!
//! ```no_run
//! use companion_stats::source::{ChatContentSource, ChatListingSource};
//! ```

use crate::error::Result;
use crate::types::ChatFileMetadata;

/// Produces the chat-file listing for a character
#[async_trait::async_trait]
pub trait ChatListingSource: Send + Sync {
    /// List chat files for `character_id` (an avatar file name)
    ///
    /// An empty list is a valid answer ("no history").
    ///
    /// # Errors
    ///
    /// Returns an error when the listing itself cannot be obtained. The
    /// pipeline treats that as a run-level failure.
    async fn list_chats(&self, character_id: &str) -> Result<Vec<ChatFileMetadata>>;
}

/// Produces the raw content of a single chat file
#[async_trait::async_trait]
pub trait ChatContentSource: Send + Sync {
    /// Fetch `<folder>/<file_name>`
    ///
    /// `Ok(None)` means the file is not available under that folder, which is
    /// an expected outcome: callers try another folder next.
    ///
    /// # Errors
    ///
    /// Transport failures. Callers in this crate log and swallow them.
    async fn fetch_chat(&self, folder: &str, file_name: &str) -> Result<Option<String>>;
}

/// Folder candidates for a chat file, in the order they should be tried
///
/// 1. The character identifier with its extension stripped (`Alice.png` ->
///    `Alice`). Skipped when the identifier is empty or `"0"`, which some host
///    versions report instead of an avatar name.
/// 2. The character-name prefix of the file name (text before the first
///    `" - "`).
///
/// Duplicates are kept.
pub fn candidate_folders(character_id: Option<&str>, file_name: &str) -> Vec<String> {
    let mut folders = Vec::with_capacity(2);
    if let Some(id) = character_id.filter(|id| !id.is_empty() && *id != "0") {
        folders.push(strip_extension(id).to_string());
    }
    let name_segment = file_name.split(" - ").next().unwrap_or(file_name);
    folders.push(name_segment.to_string());
    folders
}

/// Drop the last `.ext` unless the dot is the first character
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

pub mod http;
pub mod local;
pub mod memory;

pub use http::HttpChatSource;
pub use local::LocalChatStore;
pub use memory::InMemoryChatSource;
