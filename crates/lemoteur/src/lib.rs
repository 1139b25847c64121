//! lemoteur - Graph Engine Clients
//!
//! *Le Moteur* (The Engine) - Clients for the external knowledge-graph engine
//! and graph database, plus the lazily constructed handle that shares them

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Engine error types
pub mod error;

/// Engine configuration from environment
pub mod config;

/// Episode ingestion types
pub mod episode;

/// Reference timestamp normalization
pub mod time;

/// Hybrid search requests and results
pub mod search;

/// Knowledge-graph engine trait and HTTP client
pub mod engine;

/// Graph database trait and Neo4j Query API client
pub mod database;

/// Construct-once shared client handle
pub mod handle;

pub use config::EngineConfig;
pub use database::{GraphDatabase, Neo4jQueryClient};
pub use engine::{GraphEngine, RemoteGraphEngine};
pub use episode::{NewEpisode, SourceKind};
pub use error::{EngineError, Result};
pub use handle::{ClientFactory, EngineHandle, GraphClients, RemoteClientFactory};
pub use search::{SearchRequest, SearchResults, SearchScope};
