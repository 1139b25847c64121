//! leserve - HTTP Server
//!
//! *Le Serve* (The Server) - Axum-based HTTP API that stores episodes in an
//! external knowledge-graph engine and serves sanitized search results

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// API error types
pub mod error;

/// HTTP handlers for REST endpoints
pub mod handlers;

/// Server configuration from TOML
pub mod config;

/// API response types
pub mod responses;

/// Server instance management
pub mod server;

/// Command-line interface
pub mod cli;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use handlers::{create_router, AppState};
pub use server::{build_app, LeSouvenirServer};
