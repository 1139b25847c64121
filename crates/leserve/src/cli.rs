// CLI Interface
//
// Command-line entry for the LeSouvenir HTTP server.

use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use lemoteur::EngineHandle;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::server::LeSouvenirServer;

/// LeSouvenir - Episodic memory API over a knowledge-graph engine
#[derive(Parser, Debug)]
#[command(name = "lesouvenir")]
#[command(author = "LeSouvenir Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve episodic memory ingestion and search over HTTP", long_about = None)]
pub struct Cli {
    /// Host address to bind to (overrides API_HOST)
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Port to listen on (overrides API_PORT)
    #[arg(long = "port")]
    pub port: Option<u16>,

    /// TOML file with server settings
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Environment file to load before reading settings
    #[arg(long = "env-file", value_name = "FILE")]
    pub env_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Resolve server settings: file, then environment, then flags
    pub fn server_config(&self) -> AnyhowResult<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())
            .context("Failed to load server configuration")?;

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }

        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid server configuration")?;
        Ok(config)
    }

    /// Run the server until shutdown
    pub async fn run(self) -> AnyhowResult<()> {
        load_env_file(self.env_file.as_deref())?;

        let config = self.server_config()?;
        init_logging(&config.log_level);

        info!(
            host = %config.host,
            port = config.port,
            cors_origins = ?config.cors_origins,
            "Starting LeSouvenir"
        );

        let server = LeSouvenirServer::new(config, EngineHandle::from_env())?;
        server.initialize().await?;
        server.start().await?;
        Ok(())
    }
}

/// Load a `.env` file; a missing default `.env` is not an error
fn load_env_file(path: Option<&std::path::Path>) -> AnyhowResult<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }
    Ok(())
}

/// Install the global fmt subscriber writing to stderr
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},tower_http={level}")));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
