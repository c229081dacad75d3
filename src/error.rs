//! Error types for companion-stats
//!
//! Most failures inside the statistics pipeline are recovered locally (a
//! missing chat file degrades to "no content", a malformed line is skipped).
//! The variants here cover what is left: configuration problems and
//! collaborator failures that abort a whole run.

use thiserror::Error;

/// Main error type for companion-stats operations
#[derive(Error, Debug)]
pub enum StatsError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The chat listing collaborator could not produce a file list
    #[error("Chat listing error: {0}")]
    Listing(String),

    /// A chat content source failed in a way the caller should see
    #[error("Chat source error: {0}")]
    Source(String),

    /// User-supplied text that could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for companion-stats operations
///
/// Uses `anyhow::Error` so call sites can attach context while the
/// [`StatsError`] variants stay matchable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
