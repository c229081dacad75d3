//! companion-stats - relationship statistics for SillyTavern characters
//!
//! This library computes how much a user has talked with a SillyTavern
//! character: message and word totals, when they first met, accumulated chat
//! time and the size of the stored history.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `date_parser`: host timestamps (`"March 5, 2024 2:30pm"`) to instants
//! - `filename_time`: `YYYY-MM-DD@HHhMMmSSs` stamps embedded in chat file names
//! - `word_count`: markup filtering and CJK-aware word counting
//! - `chat_file`: per-file statistics from JSONL chat content
//! - `pipeline`: listing estimate, batched full scan and reconciliation
//! - `source`: chat listing and content collaborators (HTTP, local, in-memory)
//! - `report`: display formatting of aggregate statistics
//! - `refresh`: debounced recomputation on character events
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use companion_stats::{CharacterContext, HttpChatSource, StatsPipeline};
//! use companion_stats::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let source = Arc::new(HttpChatSource::from_config(&config.server)?);
//!     let pipeline = StatsPipeline::from_source(source, config.pipeline.clone());
//!     let stats = pipeline
//!         .aggregate(&CharacterContext::for_character("Alice.png"))
//!         .await?;
//!     println!("{} messages", stats.message_count);
//!     Ok(())
//! }
//! ```

pub mod chat_file;
pub mod cli;
pub mod commands;
pub mod config;
pub mod date_parser;
pub mod error;
pub mod filename_time;
pub mod pipeline;
pub mod refresh;
pub mod report;
pub mod source;
pub mod types;
pub mod word_count;

// Re-export commonly used types
pub use chat_file::ChatFileStatsFetcher;
pub use config::Config;
pub use date_parser::parse_chat_date;
pub use error::{Result, StatsError};
pub use filename_time::{parse_filename_time, FilenameTime};
pub use pipeline::StatsPipeline;
pub use report::StatsReport;
pub use source::{
    ChatContentSource, ChatListingSource, HttpChatSource, InMemoryChatSource, LocalChatStore,
};
pub use types::{AggregateStats, CharacterContext, ChatFileMetadata, FileStatsSummary, Instant};
pub use word_count::{count_words, filter_message_text};
