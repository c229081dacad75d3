//! Command-line interface definition for companion-stats
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// companion-stats - how long you and a SillyTavern character have been talking
///
/// Reads a character's chat history from a running server or a local data
/// directory and reports messages, words, first meeting and more.
#[derive(Parser, Debug, Clone)]
#[command(name = "companion-stats")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// SillyTavern server root (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Aggregate statistics for a character
    Stats {
        /// Character identifier (avatar file name, e.g. `Alice.png`)
        #[arg(short = 'C', long)]
        character: String,

        /// Display name (defaults to the identifier without extension)
        #[arg(short, long)]
        name: Option<String>,

        /// Read chats from a local `chats/` directory instead of the server
        #[arg(short, long)]
        local: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a single chat file
    File {
        /// Path to a `.jsonl` chat file
        path: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count words in text after markup filtering (reads stdin when omitted)
    Words {
        /// Text to count
        text: Option<String>,
    },

    /// Parse a chat timestamp
    Date {
        /// Timestamp, e.g. "March 5, 2024 2:30pm"
        text: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
