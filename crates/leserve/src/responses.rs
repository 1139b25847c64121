//! API response types

use lenettoyage::ResultValue;
use serde::{Deserialize, Serialize};

/// Generic success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Success flag
    pub success: bool,

    /// Human-readable summary
    pub message: String,

    /// Response data
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Create a success response
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Envelope for raw query results, carrying the statement and its timing
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    /// Success flag
    pub success: bool,

    /// Human-readable summary
    pub message: String,

    /// Response data
    pub data: CypherData,

    /// Executed statement
    pub query: String,

    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: f64,
}

/// Payload of `POST /add_memory`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeCreated {
    /// Identifier assigned by the engine
    pub episode_uuid: String,
}

/// Payload of `POST /search_facts`
#[derive(Debug, Clone, Serialize)]
pub struct FactsData {
    /// Sanitized fact edges
    pub facts: Vec<ResultValue>,

    /// Query echoed back
    pub query: String,
}

/// Payload of `POST /search_nodes`
#[derive(Debug, Clone, Serialize)]
pub struct NodesData {
    /// Sanitized nodes
    pub nodes: Vec<ResultValue>,

    /// Query echoed back
    pub query: String,
}

/// Payload of `GET /episodes`
#[derive(Debug, Clone, Serialize)]
pub struct EpisodesData {
    /// Sanitized episodes for the requested page
    pub episodes: Vec<ResultValue>,

    /// Episodic nodes found before paging
    pub total: usize,
}

/// Payload of `POST /delete_episode`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeDeleted {
    /// Identifier of the removed episode
    pub deleted_uuid: String,
}

/// Payload of `POST /cypher_query`
#[derive(Debug, Clone, Serialize)]
pub struct CypherData {
    /// Sanitized rows
    pub results: Vec<ResultValue>,

    /// Rows returned
    pub total_results: usize,

    /// Whether the row count hit the requested limit
    pub limited: bool,
}

/// Re-ranking status reported by `GET /health`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerankerStatus {
    /// Requested by configuration
    pub enabled: bool,

    /// Offered by the connected engine
    pub available: bool,

    /// Used for searches
    pub active: bool,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"healthy"`, or `"unhealthy"` when the engine clients cannot be built
    pub status: String,

    /// Whether the engine clients have been constructed
    pub engine_initialized: bool,

    /// Re-ranking status
    pub reranker: RerankerStatus,

    /// Why the engine clients could not be built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name
    pub service: String,

    /// Crate version
    pub version: String,

    /// Endpoint index
    pub endpoints: Vec<EndpointInfo>,
}

/// One entry of the endpoint index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// HTTP method
    pub method: String,

    /// Route path
    pub path: String,

    /// What the endpoint does
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            description: description.to_string(),
        }
    }
}

impl ServiceInfo {
    /// Describe this service
    pub fn current() -> Self {
        Self {
            service: "LeSouvenir".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoints: vec![
                EndpointInfo::new("POST", "/add_memory", "Store an episode in the knowledge graph"),
                EndpointInfo::new("POST", "/search_facts", "Find relevant facts and relationships"),
                EndpointInfo::new("POST", "/search_nodes", "Search entity summaries"),
                EndpointInfo::new("GET", "/episodes", "List recent episodes"),
                EndpointInfo::new("POST", "/delete_episode", "Remove an episode"),
                EndpointInfo::new("POST", "/cypher_query", "Run a Cypher statement"),
                EndpointInfo::new("GET", "/health", "Service and engine status"),
            ],
        }
    }
}
