//! Episode ingestion types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use lenettoyage::ResultValue;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Source format of an episode body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Free text
    #[default]
    Text,

    /// A JSON document
    Json,
}

impl SourceKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Text => "text",
            SourceKind::Json => "json",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(SourceKind::Text),
            "json" => Ok(SourceKind::Json),
            other => Err(EngineError::validation(format!(
                "source_type must be 'text' or 'json', got '{}'",
                other
            ))),
        }
    }
}

/// A validated episode ready for ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct NewEpisode {
    /// Episode name/title
    pub name: String,

    /// Raw body (text, or a JSON document for [`SourceKind::Json`])
    pub content: String,

    /// Body format
    pub source: SourceKind,

    /// Optional description of where the episode came from
    pub source_description: Option<String>,

    /// When the episode happened, in UTC
    pub reference_time: DateTime<Utc>,
}

impl NewEpisode {
    /// Validate and build an episode
    ///
    /// Name and content must be non-blank; JSON episodes must carry a
    /// parseable JSON body.
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        source: SourceKind,
        source_description: Option<String>,
        reference_time: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.into();
        let content = content.into();

        if name.trim().is_empty() {
            return Err(EngineError::validation("name must not be empty"));
        }
        if content.trim().is_empty() {
            return Err(EngineError::validation("content must not be empty"));
        }
        if source == SourceKind::Json {
            serde_json::from_str::<serde_json::Value>(&content).map_err(|e| {
                EngineError::validation(format!("content is not valid JSON: {}", e))
            })?;
        }

        Ok(Self {
            name,
            content,
            source,
            source_description: source_description.filter(|d| !d.trim().is_empty()),
            reference_time,
        })
    }
}

/// Extract the episode identifier from the engine's ingestion result
///
/// The engine may answer with the bare identifier, with the created episode
/// (`{"uuid": ...}`), or with an ingestion summary (`{"episode": {"uuid": ...}}`).
pub fn episode_identifier(result: &ResultValue) -> Option<String> {
    match result {
        ResultValue::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        ResultValue::Mapping(_) | ResultValue::Object(_) => result
            .get("uuid")
            .filter(|uuid| uuid.is_scalar() && **uuid != ResultValue::Null)
            .map(ResultValue::to_display_string)
            .or_else(|| result.get("episode").and_then(episode_identifier)),
        _ => None,
    }
}

/// Whether a node returned by the engine is an episode
///
/// Matches a label starting with `episodic` (any case) or an attributed
/// object whose type name is `EpisodicNode`.
pub fn is_episodic(node: &ResultValue) -> bool {
    if node.type_name() == Some("EpisodicNode") {
        return true;
    }

    node.get("labels")
        .and_then(ResultValue::as_sequence)
        .map(|labels| {
            labels.iter().filter_map(ResultValue::as_str).any(|label| {
                label.to_ascii_lowercase().starts_with("episodic")
            })
        })
        .unwrap_or(false)
}

/// Keep episodic nodes and apply paging
///
/// Returns the requested page together with the number of episodic nodes
/// before paging. A `limit` of zero means no cap.
pub fn page_episodes(
    nodes: Vec<ResultValue>,
    offset: usize,
    limit: usize,
) -> (Vec<ResultValue>, usize) {
    let episodes: Vec<ResultValue> = nodes.into_iter().filter(is_episodic).collect();
    let total = episodes.len();
    let take = if limit == 0 { usize::MAX } else { limit };

    let page = episodes.into_iter().skip(offset).take(take).collect();
    (page, total)
}
