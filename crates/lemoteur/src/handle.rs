//! Construct-once shared client handle
//!
//! The engine and database clients are built on first use and then reused
//! for the lifetime of the process. Concurrent first callers wait on the same
//! construction; a failed construction is not cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::{reranker_requested, EngineConfig};
use crate::database::{GraphDatabase, Neo4jQueryClient};
use crate::engine::{GraphEngine, RemoteGraphEngine};
use crate::error::{EngineError, Result};

/// Connected engine and database clients
#[derive(Clone)]
pub struct GraphClients {
    /// Knowledge-graph engine
    pub engine: Arc<dyn GraphEngine>,

    /// Graph database for raw statements
    pub database: Arc<dyn GraphDatabase>,

    /// Whether the engine reported a cross-encoder at connect time
    pub reranker_available: bool,
}

impl std::fmt::Debug for GraphClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClients")
            .field("reranker_available", &self.reranker_available)
            .finish_non_exhaustive()
    }
}

/// Builds connected [`GraphClients`]
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Construct and initialize the clients
    async fn connect(&self) -> Result<GraphClients>;
}

/// Factory for the HTTP engine service and the Neo4j Query API
#[derive(Debug, Clone, Default)]
pub struct RemoteClientFactory {
    config: Option<EngineConfig>,
}

impl RemoteClientFactory {
    /// Use a fixed configuration
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    /// Read configuration from the environment at connect time
    pub fn from_env() -> Self {
        Self::default()
    }

    fn config(&self) -> Result<EngineConfig> {
        match &self.config {
            Some(config) => {
                config.validate()?;
                Ok(config.clone())
            }
            None => EngineConfig::from_env(),
        }
    }
}

#[async_trait]
impl ClientFactory for RemoteClientFactory {
    async fn connect(&self) -> Result<GraphClients> {
        let config = self.config()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::config(format!("Failed to build HTTP client: {}", e)))?;

        let engine = RemoteGraphEngine::with_client(config.engine_url.clone(), http.clone());
        let database = Neo4jQueryClient::from_config(&config, http)?;

        info!(
            engine = %engine.base_url(),
            neo4j = %database.endpoint(),
            "Connecting graph clients"
        );

        engine.build_indices_and_constraints().await?;

        let reranker_available = match engine.supports_reranking().await {
            Ok(available) => available,
            Err(e) => {
                warn!("Could not query engine re-ranking support: {}", e);
                false
            }
        };

        Ok(GraphClients {
            engine: Arc::new(engine),
            database: Arc::new(database),
            reranker_available,
        })
    }
}

/// Shared, lazily connected client handle
pub struct EngineHandle {
    factory: Box<dyn ClientFactory>,
    clients: OnceCell<GraphClients>,
    reranker_enabled: bool,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("initialized", &self.is_initialized())
            .field("reranker_enabled", &self.reranker_enabled)
            .finish_non_exhaustive()
    }
}

impl EngineHandle {
    /// Create a handle that connects through `factory` on first use
    pub fn new(factory: impl ClientFactory + 'static, reranker_enabled: bool) -> Self {
        Self {
            factory: Box::new(factory),
            clients: OnceCell::new(),
            reranker_enabled,
        }
    }

    /// Handle over the remote services, configured from the environment
    pub fn from_env() -> Self {
        Self::new(RemoteClientFactory::from_env(), reranker_requested())
    }

    /// Handle over the remote services with a fixed configuration
    pub fn from_config(config: EngineConfig) -> Self {
        let reranker_enabled = config.use_reranker;
        Self::new(RemoteClientFactory::new(config), reranker_enabled)
    }

    /// Handle around already connected clients
    pub fn with_clients(clients: GraphClients, reranker_enabled: bool) -> Self {
        Self {
            factory: Box::new(RemoteClientFactory::from_env()),
            clients: OnceCell::new_with(Some(clients)),
            reranker_enabled,
        }
    }

    /// Connected clients, constructing them if needed
    pub async fn clients(&self) -> Result<&GraphClients> {
        self.clients
            .get_or_try_init(|| async {
                let clients = self.factory.connect().await?;
                info!(
                    reranker_available = clients.reranker_available,
                    "Graph clients initialized"
                );
                if self.reranker_enabled && !clients.reranker_available {
                    warn!("Re-ranking requested but the engine has no cross-encoder; searching without it");
                }
                Ok(clients)
            })
            .await
    }

    /// The engine client
    pub async fn engine(&self) -> Result<Arc<dyn GraphEngine>> {
        Ok(Arc::clone(&self.clients().await?.engine))
    }

    /// The database client
    pub async fn database(&self) -> Result<Arc<dyn GraphDatabase>> {
        Ok(Arc::clone(&self.clients().await?.database))
    }

    /// Whether the clients have been constructed
    pub fn is_initialized(&self) -> bool {
        self.clients.initialized()
    }

    /// Whether re-ranking was requested by configuration
    pub fn reranker_enabled(&self) -> bool {
        self.reranker_enabled
    }

    /// Whether the connected engine offers re-ranking
    pub fn reranker_available(&self) -> bool {
        self.clients
            .get()
            .map_or(false, |clients| clients.reranker_available)
    }

    /// Whether searches are re-ranked
    pub fn reranker_active(&self) -> bool {
        self.reranker_enabled && self.reranker_available()
    }
}
