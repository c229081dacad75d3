//! Statistics aggregation
//!
//! [`StatsPipeline::aggregate`] reconciles two views of a character's chats:
//!
//! 1. **Metadata pass** -- always runs, uses only the listing (item counts,
//!    humanized sizes, file-name stamps, last-message dates). Fast but coarse:
//!    words are estimated from byte size and the earliest date may be a
//!    last-message date rather than a first-message date.
//! 2. **Full scan** -- fetches every chat file in batches and counts for real.
//!    When at least one file is read, its numbers replace the estimate
//!    entirely.
//!
//! Either way, a character that never got a reply (no user messages, or no
//! chat longer than the opening line) reports zero messages, zero words and
//! no first-met time. Size and file count are always kept.

use std::sync::Arc;
use std::sync::LazyLock;

use futures::future::join_all;
use regex::Regex;

use crate::chat_file::ChatFileStatsFetcher;
use crate::config::PipelineConfig;
use crate::date_parser::parse_chat_date;
use crate::error::Result;
use crate::filename_time::parse_filename_time;
use crate::source::{ChatContentSource, ChatListingSource};
use crate::types::{AggregateStats, CharacterContext, ChatFileMetadata, FileStatsSummary, Instant};

static SIZE_MB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9.]+)\s*MB").expect("valid size pattern"));
static SIZE_KB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9.]+)\s*KB").expect("valid size pattern"));

/// A size descriptor converted to bytes and kilobytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedSize {
    pub bytes: f64,
    pub kilobytes: f64,
}

/// Parse `"12.3KB"`, `"1.1MB"` or a bare byte count
///
/// The MB suffix wins over KB, and a bare number is only considered when
/// neither suffix is present. Returns `None` for anything else.
pub fn parse_size_descriptor(descriptor: &str) -> Option<ParsedSize> {
    if let Some(caps) = SIZE_MB.captures(descriptor) {
        let mb = leading_float(&caps[1])?;
        return Some(ParsedSize {
            bytes: mb * 1024.0 * 1024.0,
            kilobytes: mb * 1024.0,
        });
    }
    if let Some(caps) = SIZE_KB.captures(descriptor) {
        let kb = leading_float(&caps[1])?;
        return Some(ParsedSize {
            bytes: kb * 1024.0,
            kilobytes: kb,
        });
    }
    let bytes = leading_float(descriptor)?;
    Some(ParsedSize {
        bytes,
        kilobytes: bytes / 1024.0,
    })
}

/// Longest numeric prefix (`[+-]digits[.digits][e[+-]digits]`) as f64
fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if !s[digits_start..end].bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse().ok().filter(|v: &f64| v.is_finite())
}

/// Statistics derived from the chat listing alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataEstimate {
    /// Sum of `chat_items`
    pub message_count: u64,
    /// Largest single-file `chat_items`
    pub max_file_items: u64,
    pub total_size_bytes: f64,
    pub total_size_kb: f64,
    /// Sum of file-name time-of-day stamps
    pub total_duration_seconds: u64,
    /// Earliest valid file-name instant
    pub filename_earliest: Option<Instant>,
    /// Earliest parseable `last_mes`
    pub last_message_earliest: Option<Instant>,
}

impl MetadataEstimate {
    /// Fold a listing into an estimate
    ///
    /// Counts saturate at `u64::MAX` rather than overflow on absurd listings.
    pub fn from_files(files: &[ChatFileMetadata]) -> Self {
        let mut estimate = Self::default();
        for file in files {
            estimate.message_count = estimate.message_count.saturating_add(file.chat_items);
            estimate.max_file_items = estimate.max_file_items.max(file.chat_items);

            if let Some(size) = parse_size_descriptor(&file.file_size) {
                estimate.total_size_bytes += size.bytes;
                estimate.total_size_kb += size.kilobytes;
            }

            if let Some(stamp) = parse_filename_time(&file.file_name) {
                estimate.total_duration_seconds = estimate
                    .total_duration_seconds
                    .saturating_add(stamp.elapsed_seconds);
                estimate.filename_earliest = earlier(estimate.filename_earliest, stamp.instant);
            }

            estimate.last_message_earliest =
                earlier(estimate.last_message_earliest, parse_chat_date(&file.last_mes));
        }
        estimate
    }

    /// Earliest known instant, preferring file-name stamps
    ///
    /// A last-message date is only used when no file-name stamp exists or it
    /// is strictly earlier than every stamp.
    pub fn earliest_instant(&self) -> Option<Instant> {
        match (self.filename_earliest, self.last_message_earliest) {
            (Some(stamp), Some(last)) if last < stamp => Some(last),
            (Some(stamp), _) => Some(stamp),
            (None, last) => last,
        }
    }

    /// Word estimate from total size
    pub fn estimated_words(&self, words_per_kb: f64) -> u64 {
        (self.total_size_kb * words_per_kb).round().max(0.0) as u64
    }

    /// Total size rounded to whole bytes
    pub fn size_bytes(&self) -> u64 {
        self.total_size_bytes.round().max(0.0) as u64
    }
}

fn earlier(current: Option<Instant>, candidate: Option<Instant>) -> Option<Instant> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Totals from reading chat files in full
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullScan {
    /// Files that yielded at least one message or word
    pub files_read: usize,
    pub word_count: u64,
    pub message_count: u64,
    pub user_message_count: u64,
    pub earliest_user_instant: Option<Instant>,
    /// Largest single-file message count among files read
    pub max_file_messages: u64,
}

impl FullScan {
    /// Fold one file summary in; empty summaries are ignored
    pub fn record(&mut self, summary: &FileStatsSummary) {
        if !summary.has_content() {
            return;
        }
        self.files_read += 1;
        self.word_count = self.word_count.saturating_add(summary.word_count);
        self.message_count = self.message_count.saturating_add(summary.message_count);
        self.user_message_count = self
            .user_message_count
            .saturating_add(summary.user_message_count);
        self.earliest_user_instant =
            earlier(self.earliest_user_instant, summary.earliest_user_instant);
        self.max_file_messages = self.max_file_messages.max(summary.message_count);
    }
}

/// Orchestrates listing, metadata estimate and full scan
#[derive(Clone)]
pub struct StatsPipeline {
    listing: Arc<dyn ChatListingSource>,
    fetcher: ChatFileStatsFetcher,
    config: PipelineConfig,
}

impl std::fmt::Debug for StatsPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StatsPipeline {
    /// Create a pipeline from separate listing and content sources
    pub fn new(
        listing: Arc<dyn ChatListingSource>,
        content: Arc<dyn ChatContentSource>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            listing,
            fetcher: ChatFileStatsFetcher::new(content),
            config,
        }
    }

    /// Create a pipeline from a source that provides both listing and content
    pub fn from_source<S>(source: Arc<S>, config: PipelineConfig) -> Self
    where
        S: ChatListingSource + ChatContentSource + 'static,
    {
        Self::new(source.clone(), source, config)
    }

    /// Pipeline settings in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compute statistics for the character in `context`
    ///
    /// # Errors
    ///
    /// Returns an error only when the chat listing cannot be obtained. Per-file
    /// failures degrade silently.
    pub async fn aggregate(&self, context: &CharacterContext) -> Result<AggregateStats> {
        let Some(character_id) = context.identifier() else {
            tracing::debug!("No character selected");
            return Ok(AggregateStats::empty());
        };

        let files = self.listing.list_chats(character_id).await?;
        if files.is_empty() {
            tracing::debug!(character_id, "Character has no chat history");
            return Ok(AggregateStats::empty());
        }

        let estimate = MetadataEstimate::from_files(&files);
        let scan = self.scan(&files, context).await;

        let stats = self.reconcile(&estimate, &scan, files.len());
        tracing::info!(
            character_id,
            files = files.len(),
            files_read = scan.files_read,
            messages = stats.message_count,
            words = stats.word_count,
            interaction = stats.has_interaction(),
            "Aggregated chat statistics"
        );
        Ok(stats)
    }

    /// Fetch every file, `batch_size` at a time
    pub async fn scan(&self, files: &[ChatFileMetadata], context: &CharacterContext) -> FullScan {
        let mut scan = FullScan::default();
        for batch in files.chunks(self.config.batch_size.max(1)) {
            let summaries = join_all(
                batch
                    .iter()
                    .map(|file| self.fetcher.fetch(&file.file_name, context)),
            )
            .await;
            for summary in &summaries {
                scan.record(summary);
            }
        }
        scan
    }

    /// Pick the final numbers from the estimate and the scan
    pub fn reconcile(
        &self,
        estimate: &MetadataEstimate,
        scan: &FullScan,
        chat_file_count: usize,
    ) -> AggregateStats {
        let threshold = self.config.interaction_threshold;
        let suppressed = AggregateStats {
            total_size_bytes: estimate.size_bytes(),
            chat_file_count,
            ..AggregateStats::default()
        };

        if scan.files_read > 0 {
            if scan.user_message_count == 0 || scan.max_file_messages <= threshold {
                tracing::debug!(
                    user_messages = scan.user_message_count,
                    max_file_messages = scan.max_file_messages,
                    "No real interaction found in chat contents"
                );
                return suppressed;
            }
            return AggregateStats {
                message_count: scan.message_count,
                word_count: scan.word_count,
                first_instant: scan
                    .earliest_user_instant
                    .or_else(|| estimate.earliest_instant()),
                total_duration_seconds: estimate.total_duration_seconds,
                total_size_bytes: estimate.size_bytes(),
                chat_file_count,
            };
        }

        tracing::debug!("No chat file could be read; using listing estimate");
        if estimate.max_file_items <= threshold {
            return suppressed;
        }
        AggregateStats {
            message_count: estimate.message_count,
            word_count: estimate.estimated_words(self.config.words_per_kb),
            first_instant: estimate.earliest_instant(),
            total_duration_seconds: estimate.total_duration_seconds,
            total_size_bytes: estimate.size_bytes(),
            chat_file_count,
        }
    }
}
