//! Server instance management

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use lemoteur::EngineHandle;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::handlers::{create_router, AppState};

/// LeSouvenir HTTP server
///
/// Manages the Axum server lifecycle: eager engine initialization,
/// startup, and graceful shutdown.
pub struct LeSouvenirServer {
    /// Server configuration
    config: ServerConfig,

    /// Shared engine handle
    engine: Arc<EngineHandle>,
}

impl LeSouvenirServer {
    /// Create new server instance
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `engine` - Engine handle shared with every request
    pub fn new(config: ServerConfig, engine: EngineHandle) -> Result<Self, ApiError> {
        if let Err(e) = config.validate() {
            return Err(ApiError::internal(format!("Invalid config: {}", e)));
        }

        Ok(Self {
            config,
            engine: Arc::new(engine),
        })
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, ApiError> {
        self.config
            .socket_addr()
            .map_err(|e| ApiError::internal(format!("Failed to parse address: {}", e)))
    }

    /// Connect the engine clients before accepting traffic
    pub async fn initialize(&self) -> Result<(), ApiError> {
        self.engine.clients().await.map_err(|e| {
            error!("Failed to initialize graph engine: {}", e);
            ApiError::from_engine("Failed to initialize graph engine", e)
        })?;
        info!(
            reranker_active = self.engine.reranker_active(),
            "Graph engine initialized"
        );
        Ok(())
    }

    /// Router with middleware, ready to serve
    pub fn app(&self) -> Router {
        build_app(Arc::clone(&self.engine), self.config.clone())
    }

    /// Start server and run until a shutdown signal arrives
    pub async fn start(&self) -> Result<(), ApiError> {
        let addr = self.socket_addr()?;
        let app = self.app();

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind to {}: {:?}", addr, e);
            ApiError::internal(format!("Failed to bind to {}: {}", addr, e))
        })?;

        info!("Server listening on: {}", self.server_url());

        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown())
            .await
            .map_err(|e| ApiError::internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get engine handle
    #[must_use]
    pub fn engine(&self) -> Arc<EngineHandle> {
        Arc::clone(&self.engine)
    }

    /// Get server URL
    #[must_use]
    pub fn server_url(&self) -> String {
        self.config.server_url()
    }
}

/// Build the full application: routes, state, CORS, and request tracing
pub fn build_app(engine: Arc<EngineHandle>, config: ServerConfig) -> Router {
    let cors = cors_layer(&config);
    let enable_logging = config.enable_logging;
    let state = AppState::new_from_arc(engine, config);

    let router = create_router().with_state(state);
    if enable_logging {
        router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
    } else {
        router.layer(cors)
    }
}

/// CORS policy from the configured origins
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Wait for shutdown signal
///
/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix;
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received TERM signal");
            }
            Err(e) => {
                error!("Failed to install TERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
