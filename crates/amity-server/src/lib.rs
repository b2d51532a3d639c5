//! Amity Server
//!
//! JSON-over-HTTP front end for the relationship engine. Handlers resolve
//! emails to user ids and delegate every rule to `amity-engine`.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod mentions;

use amity_engine::RelationshipEngine;
use amity_store::{SqliteStore, StoreError};
use config::ServerConfig;
use handlers::{create_router, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Failed to open the database
    #[error("Failed to open store: {0}")]
    Store(#[from] StoreError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Open the configured store and wrap it in shared state
pub fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    let store = SqliteStore::with_busy_timeout(&config.database_path, config.busy_timeout())?;
    Ok(AppState::new(RelationshipEngine::new(store)))
}

/// Install the global subscriber; `RUST_LOG` wins over the config
fn init_tracing(config: &ServerConfig) -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| ServerError::Server(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| ServerError::Server(e.to_string()))
}

/// Start the HTTP server
///
/// Initializes logging, opens the store, and serves until the listener
/// fails.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    init_tracing(&config)?;

    info!("Starting Amity server");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.database_path);

    let state = build_state(&config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
