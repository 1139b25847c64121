//! Engine configuration from environment

use std::fmt;

use crate::error::{EngineError, Result};

/// Default knowledge-graph engine service URL
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:8001";

/// Default engine request timeout in seconds
///
/// Episode ingestion runs LLM extraction inside the engine and is slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Neo4j HTTP port used when a Bolt URI carries the default Bolt port
pub const NEO4J_HTTP_PORT: u16 = 7474;

const NEO4J_BOLT_PORT: u16 = 7687;

/// Required Neo4j variables, in the order they are reported when missing
const REQUIRED_NEO4J_VARS: [&str; 4] = [
    "NEO4J_URI",
    "NEO4J_USERNAME",
    "NEO4J_PASSWORD",
    "NEO4J_DATABASE",
];

/// Connection settings for the external engine and graph database
#[derive(Clone)]
pub struct EngineConfig {
    /// Base URL of the knowledge-graph engine service
    pub engine_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Neo4j URI (`neo4j+s://`, `bolt://`, `http(s)://`)
    pub neo4j_uri: String,

    /// Neo4j user
    pub neo4j_username: String,

    /// Neo4j password
    pub neo4j_password: String,

    /// Neo4j database name
    pub neo4j_database: String,

    /// Ask the engine to re-rank search results with its cross-encoder
    pub use_reranker: bool,
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("engine_url", &self.engine_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("neo4j_uri", &self.neo4j_uri)
            .field("neo4j_username", &self.neo4j_username)
            .field("neo4j_password", &"<redacted>")
            .field("neo4j_database", &self.neo4j_database)
            .field("use_reranker", &self.use_reranker)
            .finish()
    }
}

impl EngineConfig {
    /// Load configuration from process environment variables
    ///
    /// Environment variables:
    /// - `GRAPH_ENGINE_URL` - Engine service URL
    /// - `GRAPH_ENGINE_TIMEOUT_SECS` - Engine request timeout
    /// - `NEO4J_URI`, `NEO4J_USERNAME`, `NEO4J_PASSWORD`, `NEO4J_DATABASE` - required
    /// - `USE_BGE_RERANKER` - `true` (default) or `false`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_NEO4J_VARS
            .iter()
            .copied()
            .filter(|key| read(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::config(format!(
                "Missing required Neo4j environment variables: {}",
                missing.join(", ")
            )));
        }

        let timeout_secs = match read("GRAPH_ENGINE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                EngineError::config("GRAPH_ENGINE_TIMEOUT_SECS must be a positive integer")
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            engine_url: read("GRAPH_ENGINE_URL").unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string()),
            timeout_secs,
            neo4j_uri: read("NEO4J_URI").unwrap_or_default(),
            neo4j_username: read("NEO4J_USERNAME").unwrap_or_default(),
            neo4j_password: read("NEO4J_PASSWORD").unwrap_or_default(),
            neo4j_database: read("NEO4J_DATABASE").unwrap_or_default(),
            use_reranker: reranker_flag(read("USE_BGE_RERANKER")),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(EngineError::config("Engine timeout must be greater than zero"));
        }

        let engine_url = reqwest::Url::parse(&self.engine_url).map_err(|e| {
            EngineError::config(format!("Invalid GRAPH_ENGINE_URL '{}': {}", self.engine_url, e))
        })?;
        if !matches!(engine_url.scheme(), "http" | "https") {
            return Err(EngineError::config(format!(
                "GRAPH_ENGINE_URL must use http or https, got '{}'",
                engine_url.scheme()
            )));
        }

        self.neo4j_query_endpoint().map(|_| ())
    }

    /// Neo4j HTTP Query API endpoint derived from the configured URI
    ///
    /// Secure Bolt schemes (`neo4j+s`, `bolt+s`) map to `https`, plain ones
    /// to `http` on port 7474. `http(s)` URIs are used as given.
    pub fn neo4j_query_endpoint(&self) -> Result<String> {
        let url = reqwest::Url::parse(&self.neo4j_uri).map_err(|e| {
            EngineError::config(format!("Invalid NEO4J_URI '{}': {}", self.neo4j_uri, e))
        })?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| EngineError::config(format!("NEO4J_URI has no host: {}", self.neo4j_uri)))?;

        let (scheme, port) = match url.scheme() {
            "http" | "https" => (url.scheme(), url.port()),
            "neo4j+s" | "bolt+s" | "neo4j+ssc" | "bolt+ssc" => {
                ("https", url.port().filter(|port| *port != NEO4J_BOLT_PORT))
            }
            "neo4j" | "bolt" => (
                "http",
                Some(match url.port() {
                    None | Some(NEO4J_BOLT_PORT) => NEO4J_HTTP_PORT,
                    Some(port) => port,
                }),
            ),
            other => {
                return Err(EngineError::config(format!(
                    "Unsupported NEO4J_URI scheme '{}'",
                    other
                )))
            }
        };

        let authority = match port {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(format!(
            "{}://{}/db/{}/query/v2",
            scheme, authority, self.neo4j_database
        ))
    }
}

/// Whether `USE_BGE_RERANKER` asks for re-ranking (default `true`)
pub fn reranker_requested() -> bool {
    reranker_flag(std::env::var("USE_BGE_RERANKER").ok())
}

fn reranker_flag(raw: Option<String>) -> bool {
    raw.filter(|value| !value.trim().is_empty())
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(true)
}
