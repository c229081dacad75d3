//! companion-stats - relationship statistics for SillyTavern characters
//!
#![doc = "Main entry point for the companion-stats CLI."]

use anyhow::Result;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use companion_stats::cli::{Cli, Commands};
use companion_stats::commands;
use companion_stats::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Stats {
            character,
            name,
            local: _,
            json,
        } => {
            commands::stats::run_stats(&config, &character, name, json).await?;
            Ok(())
        }
        Commands::File { path, json } => {
            tracing::debug!("Summarizing chat file: {}", path.display());
            commands::file::run_file(&path, json).await?;
            Ok(())
        }
        Commands::Words { text } => {
            commands::words::run_words(text)?;
            Ok(())
        }
        Commands::Date { text } => {
            commands::date::run_date(&text)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "companion_stats=debug"
    } else {
        "companion_stats=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
