//! Configuration management for companion-stats
//!
//! Configuration is layered: built-in defaults, then an optional YAML file,
//! then `COMPANION_STATS_*` environment variables, then command-line
//! overrides. [`Config::validate`] runs last.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};

/// Words per kilobyte of raw chat JSON, used for the metadata-only estimate
pub const DEFAULT_WORDS_PER_KB: f64 = 32.5;

/// A character whose every chat has at most this many messages has not
/// really been talked to (a lone greeting does not count)
pub const DEFAULT_INTERACTION_THRESHOLD: u64 = 1;

/// Number of chat files fetched concurrently during the full scan
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where chats are read from
    #[serde(default)]
    pub server: ServerConfig,

    /// Aggregation tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Debounced refresh behavior
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Chat source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// SillyTavern server root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Obtain and send a CSRF token with every request
    #[serde(default = "default_csrf")]
    pub csrf: bool,

    /// Read chats from this local `chats/` directory instead of the server
    #[serde(default)]
    pub chats_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_csrf() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            csrf: default_csrf(),
            chats_dir: None,
        }
    }
}

/// Aggregation pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Files fetched concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Words per KB for the metadata-only estimate
    #[serde(default = "default_words_per_kb")]
    pub words_per_kb: f64,

    /// Maximum per-file message count still treated as "no interaction"
    #[serde(default = "default_interaction_threshold")]
    pub interaction_threshold: u64,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_words_per_kb() -> f64 {
    DEFAULT_WORDS_PER_KB
}

fn default_interaction_threshold() -> u64 {
    DEFAULT_INTERACTION_THRESHOLD
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            words_per_kb: default_words_per_kb(),
            interaction_threshold: default_interaction_threshold(),
        }
    }
}

/// Refresh scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Quiet period before a triggered refresh runs (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment and CLI
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: impl AsRef<Path>, cli: &crate::cli::Cli) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StatsError::Config(format!("Failed to read config file: {}", e)))?;
        let config = serde_yaml::from_str(&contents)
            .map_err(StatsError::Yaml)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("COMPANION_STATS_BASE_URL") {
            self.server.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("COMPANION_STATS_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(v) => self.server.timeout_seconds = v,
                Err(_) => tracing::warn!("Invalid COMPANION_STATS_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        if let Ok(dir) = std::env::var("COMPANION_STATS_CHATS_DIR") {
            tracing::debug!(chats_dir = %dir, "Env override: COMPANION_STATS_CHATS_DIR");
            self.server.chats_dir = Some(PathBuf::from(dir));
        }

        if let Ok(batch) = std::env::var("COMPANION_STATS_BATCH_SIZE") {
            match batch.parse() {
                Ok(v) => self.pipeline.batch_size = v,
                Err(_) => tracing::warn!("Invalid COMPANION_STATS_BATCH_SIZE: {}", batch),
            }
        }

        if let Ok(density) = std::env::var("COMPANION_STATS_WORDS_PER_KB") {
            match density.parse() {
                Ok(v) => self.pipeline.words_per_kb = v,
                Err(_) => tracing::warn!("Invalid COMPANION_STATS_WORDS_PER_KB: {}", density),
            }
        }

        if let Ok(debounce) = std::env::var("COMPANION_STATS_DEBOUNCE_MS") {
            match debounce.parse() {
                Ok(v) => self.refresh.debounce_ms = v,
                Err(_) => tracing::warn!("Invalid COMPANION_STATS_DEBOUNCE_MS: {}", debounce),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            self.server.base_url = base_url.clone();
        }
        if let crate::cli::Commands::Stats {
            local: Some(dir), ..
        } = &cli.command
        {
            self.server.chats_dir = Some(dir.clone());
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range
    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(StatsError::Config("server.base_url cannot be empty".to_string()).into());
        }

        if let Err(e) = url::Url::parse(&self.server.base_url) {
            return Err(StatsError::Config(format!(
                "server.base_url is not a valid URL: {}",
                e
            ))
            .into());
        }

        if self.server.timeout_seconds == 0 {
            return Err(StatsError::Config(
                "server.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.pipeline.batch_size == 0 {
            return Err(StatsError::Config(
                "pipeline.batch_size must be greater than 0".to_string(),
            )
            .into());
        }

        if !self.pipeline.words_per_kb.is_finite() || self.pipeline.words_per_kb <= 0.0 {
            return Err(StatsError::Config(
                "pipeline.words_per_kb must be a positive number".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
