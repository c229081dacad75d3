//! SillyTavern server client
//!
//! [`HttpChatSource`] implements both collaborator traits against a running
//! SillyTavern instance:
//!
//! - Listing: `POST {base}/api/characters/chats` with `{"avatar_url": <id>}`.
//!   The server answers with an array (or an index-keyed object) of chat
//!   metadata, or `{"error": true}` when the character has no chat folder.
//! - Content: `GET {base}/chats/{folder}/{file}` with both path segments
//!   percent-encoded.
//!
//! # CSRF
//!
//! SillyTavern protects its API with a CSRF token bound to a session cookie.
//! When `csrf` is enabled the token is fetched once from `GET
//! {base}/csrf-token`, cached for the lifetime of the client, and sent as
//! `X-CSRF-Token` on every request. The cookie store is always on.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::OnceCell;
use url::Url;

use crate::config::ServerConfig;
use crate::error::{Result, StatsError};
use crate::source::{ChatContentSource, ChatListingSource};
use crate::types::ChatFileMetadata;

const CSRF_HEADER: &str = "X-CSRF-Token";

/// Chat source backed by a SillyTavern HTTP server
#[derive(Debug)]
pub struct HttpChatSource {
    client: reqwest::Client,
    base_url: Url,
    csrf: bool,
    csrf_token: OnceCell<Option<String>>,
}

impl HttpChatSource {
    /// Create a client for `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Server root, e.g. `http://127.0.0.1:8000/`
    /// * `timeout` - Per-request timeout
    /// * `csrf` - Whether to obtain and send a CSRF token
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration, csrf: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(StatsError::Http)?;

        Ok(Self {
            client,
            base_url,
            csrf,
            csrf_token: OnceCell::new(),
        })
    }

    /// Create a client from the `server` section of the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the client cannot be
    /// constructed.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            StatsError::Config(format!("Invalid server.base_url {}: {}", config.base_url, e))
        })?;
        Self::new(
            base_url,
            Duration::from_secs(config.timeout_seconds),
            config.csrf,
        )
    }

    /// Build `{base}/<segments...>`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StatsError::Config(format!("Base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn token(&self) -> Result<Option<String>> {
        if !self.csrf {
            return Ok(None);
        }
        let token = self
            .csrf_token
            .get_or_try_init(|| async {
                let url = self.endpoint(&["csrf-token"])?;
                let response = self.client.get(url).send().await?;
                if !response.status().is_success() {
                    return Err(anyhow::anyhow!(StatsError::Source(format!(
                        "CSRF token request returned HTTP {}",
                        response.status()
                    ))));
                }
                let body: Value = response.json().await?;
                let token = body
                    .get("token")
                    .and_then(Value::as_str)
                    .filter(|t| *t != "disabled")
                    .map(str::to_string);
                tracing::debug!(has_token = token.is_some(), "Obtained CSRF token");
                Ok::<_, anyhow::Error>(token)
            })
            .await?;
        Ok(token.clone())
    }

    async fn request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let builder = match self.token().await? {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        };
        Ok(builder.send().await?)
    }
}

/// Decode the listing payload the way the host web client does
fn parse_listing(body: Value) -> Result<Vec<ChatFileMetadata>> {
    let entries = match body {
        Value::Array(items) => items,
        Value::Object(map) if map.get("error") == Some(&Value::Bool(true)) => Vec::new(),
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        other => {
            return Err(StatsError::Listing(format!("unexpected listing payload: {}", other)).into())
        }
    };
    let mut files = Vec::with_capacity(entries.len());
    for entry in entries {
        files.push(serde_json::from_value::<ChatFileMetadata>(entry).map_err(StatsError::Serialization)?);
    }
    Ok(files)
}

#[async_trait::async_trait]
impl ChatListingSource for HttpChatSource {
    async fn list_chats(&self, character_id: &str) -> Result<Vec<ChatFileMetadata>> {
        let url = self.endpoint(&["api", "characters", "chats"])?;
        let body = serde_json::json!({ "avatar_url": character_id });
        let response = self.request(self.client.post(url).json(&body)).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatsError::Listing(format!(
                "HTTP {} listing chats for {}",
                status.as_u16(),
                character_id
            ))
            .into());
        }

        let files = parse_listing(response.json().await?)?;
        tracing::debug!(character_id, count = files.len(), "Listed chat files");
        Ok(files)
    }
}

#[async_trait::async_trait]
impl ChatContentSource for HttpChatSource {
    async fn fetch_chat(&self, folder: &str, file_name: &str) -> Result<Option<String>> {
        let url = self.endpoint(&["chats", folder, file_name])?;
        let response = self.request(self.client.get(url.clone())).await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "Chat file not served");
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }
}
