//! Graph database trait and Neo4j Query API client
//!
//! Statements run over Neo4j's HTTP Query API (`/db/<name>/query/v2`), so the
//! wrapper needs no Bolt driver. Graph values in the response are lifted into
//! attributed [`ResultValue`] objects so the sanitizer treats them like any
//! other structured result.

use async_trait::async_trait;
use lenettoyage::{Fields, ResultValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Type name given to node values
pub const NODE_TYPE: &str = "Node";

/// Type name given to relationship values
pub const RELATIONSHIP_TYPE: &str = "Relationship";

/// Arbitrary statement execution against the graph database
#[async_trait]
pub trait GraphDatabase: Send + Sync {
    /// Execute a statement, returning one mapping per row keyed by field name
    async fn execute_query(&self, statement: &str) -> Result<Vec<ResultValue>>;
}

/// [`GraphDatabase`] over the Neo4j HTTP Query API
#[derive(Clone)]
pub struct Neo4jQueryClient {
    endpoint: String,
    username: String,
    password: String,
    http: Client,
}

impl std::fmt::Debug for Neo4jQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jQueryClient")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Neo4jQueryClient {
    /// Create a client for an explicit Query API endpoint
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        http: Client,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            http,
        }
    }

    /// Create a client from engine configuration
    pub fn from_config(config: &EngineConfig, http: Client) -> Result<Self> {
        Ok(Self::new(
            config.neo4j_query_endpoint()?,
            config.neo4j_username.clone(),
            config.neo4j_password.clone(),
            http,
        ))
    }

    /// Query API endpoint in use
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphDatabase for Neo4jQueryClient {
    async fn execute_query(&self, statement: &str) -> Result<Vec<ResultValue>> {
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&json!({ "statement": statement }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: QueryResponse = if text.trim().is_empty() {
            QueryResponse::default()
        } else {
            serde_json::from_str(&text).map_err(|e| {
                if status.is_success() {
                    EngineError::Serialization(e)
                } else {
                    EngineError::Api {
                        status: status.as_u16(),
                        message: text.clone(),
                    }
                }
            })?
        };

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(EngineError::Api {
                status: status.as_u16(),
                message: body.error_message().unwrap_or_else(|| "authentication failed".to_string()),
            });
        }
        if let Some(message) = body.error_message() {
            return Err(EngineError::Query(message));
        }
        if !status.is_success() {
            return Err(EngineError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(body.data.map(QueryData::into_rows).unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    errors: Vec<QueryError>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct QueryError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl QueryResponse {
    fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl QueryData {
    fn into_rows(self) -> Vec<ResultValue> {
        let fields = self.fields;
        self.values
            .into_iter()
            .map(|row| {
                let mapping: Fields = fields
                    .iter()
                    .cloned()
                    .zip(row.into_iter().map(graph_value))
                    .collect();
                ResultValue::Mapping(mapping)
            })
            .collect()
    }
}

/// Convert a Query API JSON value into a result value
///
/// Nodes and relationships become attributed objects; everything else maps
/// structurally.
pub fn graph_value(value: Value) -> ResultValue {
    match value {
        Value::Array(items) => ResultValue::Sequence(items.into_iter().map(graph_value).collect()),
        Value::Object(map) => {
            if is_node(&map) {
                graph_entity(NODE_TYPE, map)
            } else if is_relationship(&map) {
                graph_entity(RELATIONSHIP_TYPE, map)
            } else {
                ResultValue::Mapping(
                    map.into_iter()
                        .map(|(key, value)| (key, graph_value(value)))
                        .collect(),
                )
            }
        }
        scalar => ResultValue::from(scalar),
    }
}

fn is_node(map: &Map<String, Value>) -> bool {
    map.contains_key("elementId") && map.contains_key("labels") && map.contains_key("properties")
}

fn is_relationship(map: &Map<String, Value>) -> bool {
    map.contains_key("elementId")
        && map.contains_key("type")
        && map.contains_key("startNodeElementId")
}

fn graph_entity(type_name: &str, map: Map<String, Value>) -> ResultValue {
    let attributes: Fields = map
        .into_iter()
        .map(|(key, value)| (snake_case(&key), graph_value(value)))
        .collect();
    ResultValue::object(type_name, attributes)
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
