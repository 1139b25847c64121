//! Knowledge-graph engine trait and HTTP client
//!
//! The engine owns episode ingestion, entity extraction, hybrid search and
//! re-ranking. This crate only forwards requests to it.
//!
//! # Endpoints
//!
//! | Call | Method and path |
//! |---|---|
//! | build indices | `POST /build-indices` |
//! | add episode | `POST /episodes` |
//! | search | `POST /search` |
//! | delete episode | `DELETE /episodes/{uuid}` |
//! | capabilities | `GET /healthcheck` |

use std::time::Duration;

use async_trait::async_trait;
use lenettoyage::ResultValue;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::episode::NewEpisode;
use crate::error::{EngineError, Result};
use crate::search::{SearchRequest, SearchResults};
use crate::time::format_timestamp;

/// Operations the wrapper needs from the knowledge-graph engine
#[async_trait]
pub trait GraphEngine: Send + Sync {
    /// Create the engine's indices and constraints (idempotent)
    async fn build_indices_and_constraints(&self) -> Result<()>;

    /// Ingest an episode, returning the engine's raw result
    async fn add_episode(&self, episode: NewEpisode) -> Result<ResultValue>;

    /// Run a hybrid search
    async fn search(&self, request: SearchRequest) -> Result<SearchResults>;

    /// Delete an episode and its dependent graph elements
    async fn delete_episode(&self, uuid: Uuid) -> Result<()>;

    /// Whether the engine has a cross-encoder available for re-ranking
    async fn supports_reranking(&self) -> Result<bool>;
}

#[derive(Serialize)]
struct EpisodeBody<'a> {
    name: &'a str,
    episode_body: &'a str,
    source: &'static str,
    source_description: &'a str,
    reference_time: String,
}

/// [`GraphEngine`] backed by the engine's HTTP service
#[derive(Debug, Clone)]
pub struct RemoteGraphEngine {
    base_url: String,
    http: Client,
}

impl RemoteGraphEngine {
    /// Create a client with its own connection pool
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(base_url, http))
    }

    /// Create a client sharing an existing connection pool
    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Base URL of the engine service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl GraphEngine for RemoteGraphEngine {
    async fn build_indices_and_constraints(&self) -> Result<()> {
        let response = self.http.post(self.url("/build-indices")).send().await?;
        read_json(response, "indices").await.map(|_| ())
    }

    async fn add_episode(&self, episode: NewEpisode) -> Result<ResultValue> {
        let body = EpisodeBody {
            name: &episode.name,
            episode_body: &episode.content,
            source: episode.source.as_str(),
            source_description: episode.source_description.as_deref().unwrap_or(""),
            reference_time: format_timestamp(&episode.reference_time),
        };

        tracing::debug!(name = %episode.name, source = %episode.source, "Posting episode to engine");
        let response = self.http.post(self.url("/episodes")).json(&body).send().await?;
        Ok(read_json(response, &episode.name).await?.into())
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchResults> {
        let body = request.to_body()?;
        let response = self.http.post(self.url("/search")).json(&body).send().await?;
        let raw = read_json(response, "search").await?;
        SearchResults::from_response(raw.into(), request.scope)
    }

    async fn delete_episode(&self, uuid: Uuid) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/episodes/{}", uuid)))
            .send()
            .await?;
        read_json(response, &format!("episode {}", uuid))
            .await
            .map(|_| ())
    }

    async fn supports_reranking(&self) -> Result<bool> {
        let response = self.http.get(self.url("/healthcheck")).send().await?;
        let health = read_json(response, "healthcheck").await?;
        Ok(health
            .get("cross_encoder")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }
}

/// Decode a JSON response, mapping non-success statuses to errors
///
/// An empty success body decodes to `null`.
pub(crate) async fn read_json(response: Response, subject: &str) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;

    if status == StatusCode::NOT_FOUND {
        return Err(EngineError::NotFound(subject.to_string()));
    }
    if !status.is_success() {
        let message = if text.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            text
        };
        return Err(EngineError::Api {
            status: status.as_u16(),
            message,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}
