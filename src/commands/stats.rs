//! Character statistics command
//!
//! Builds a [`StatsPipeline`] over either the configured SillyTavern server or
//! a local `chats/` directory, runs it once and prints the [`StatsReport`].

use std::sync::Arc;

use chrono::NaiveDate;

use super::to_pretty_json;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::StatsPipeline;
use crate::report::StatsReport;
use crate::source::{strip_extension, HttpChatSource, LocalChatStore};
use crate::types::CharacterContext;

/// Build a pipeline over the configured chat source
///
/// A `server.chats_dir` selects the local store; otherwise the HTTP server at
/// `server.base_url` is used.
///
/// # Errors
///
/// Returns error if the HTTP client cannot be created
pub fn build_pipeline(config: &Config) -> Result<StatsPipeline> {
    let pipeline = match &config.server.chats_dir {
        Some(dir) => {
            tracing::debug!(dir = %dir.display(), "Reading chats from local directory");
            StatsPipeline::from_source(
                Arc::new(LocalChatStore::new(dir.clone())),
                config.pipeline.clone(),
            )
        }
        None => {
            tracing::debug!(base_url = %config.server.base_url, "Reading chats from server");
            StatsPipeline::from_source(
                Arc::new(HttpChatSource::from_config(&config.server)?),
                config.pipeline.clone(),
            )
        }
    };
    Ok(pipeline)
}

/// Context for `character`, named `name` or the identifier minus extension
pub fn character_context(character: &str, name: Option<String>) -> CharacterContext {
    let display = name.unwrap_or_else(|| strip_extension(character).to_string());
    CharacterContext::for_character(character).with_display_name(display)
}

/// Run the pipeline and format its outcome
pub async fn collect_report(
    pipeline: &StatsPipeline,
    context: &CharacterContext,
    today: NaiveDate,
) -> StatsReport {
    let outcome = pipeline.aggregate(context).await;
    StatsReport::from_outcome(&outcome, context.display_name_or_default(), today)
}

/// Print statistics for `character`
///
/// An unreachable source does not fail the command; the report shows
/// placeholders instead.
pub async fn run_stats(
    config: &Config,
    character: &str,
    name: Option<String>,
    json: bool,
) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let context = character_context(character, name);
    tracing::info!(character, "Collecting statistics");

    let report = collect_report(&pipeline, &context, chrono::Local::now().date_naive()).await;
    if json {
        println!("{}", to_pretty_json(&report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}
