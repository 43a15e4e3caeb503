//! # route-service: Command Layer for Reparto
//!
//! Exposes the route operations to the agent's client as JSON-lines commands.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        route-service                                    │
//! │                                                                         │
//! │  stdin ──► dispatch.rs ──► commands/ ──► reparto-db ──► SQLite          │
//! │   (one JSON request        │  typed requests                            │
//! │    per line)               │  Result<T, ApiError>                       │
//! │                            ▼                                            │
//! │  stdout ◄── ApiResponse {"success": ..., "data" | "error": ...}        │
//! │                                                                         │
//! │  stderr ◄── tracing (RUST_LOG, default info,reparto=debug,sqlx=warn)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging, to stderr)
//! 2. Load configuration (file, then `REPARTO_*` environment)
//! 3. Connect to database & run migrations
//! 4. Serve stdin until EOF
//! 5. Close the pool

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod state;

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub use config::{ConfigError, ServiceConfig};
pub use dispatch::{dispatch, ApiResponse, Command};
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

/// Runs the service on stdin/stdout until input closes.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting route service");

    let config = ServiceConfig::load(config_path)?;
    info!(path = %config.database_path.display(), "Database path");

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let state = AppState::connect(&config).await?;
    info!("Database connected");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    dispatch::serve(&state, stdin, stdout).await?;

    state.db().close().await;
    Ok(())
}

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reparto=debug,route_service=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
