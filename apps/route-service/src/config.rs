//! # Service Configuration
//!
//! Settings for the route service: where the database lives, how the pool is
//! sized, and how patiently idempotent operations are retried.
//!
//! ## Load Order (later overrides earlier)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults           database in the platform data dir               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  2. route-service.toml (explicit path, or the platform config dir)     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  3. REPARTO_* environment variables                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  validate() ──► ServiceConfig                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example File
//! ```toml
//! database_path = "/var/lib/reparto/reparto.db"
//! max_connections = 8
//! busy_timeout_ms = 5000
//!
//! [retry]
//! max_attempts = 3
//! initial_backoff_ms = 200
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reparto_core::retry::RetryPolicy;
use reparto_db::DbConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable names.
pub mod env {
    pub const DB_PATH: &str = "REPARTO_DB_PATH";
    pub const MAX_CONNECTIONS: &str = "REPARTO_MAX_CONNECTIONS";
    pub const BUSY_TIMEOUT_MS: &str = "REPARTO_BUSY_TIMEOUT_MS";
    pub const RETRY_MAX_ATTEMPTS: &str = "REPARTO_RETRY_MAX_ATTEMPTS";
    pub const RETRY_INITIAL_BACKOFF_MS: &str = "REPARTO_RETRY_INITIAL_BACKOFF_MS";
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Route service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Pool size. One connection per concurrently active agent is plenty.
    pub max_connections: u32,

    /// How long a writer waits for the SQLite lock.
    pub busy_timeout_ms: u64,

    /// Retry settings for reads and single-statement writes.
    pub retry: RetryPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            database_path: default_database_path(),
            max_connections: 8,
            busy_timeout_ms: 5_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(default_config_path) {
            if path.exists() {
                info!(?path, "Loading service config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Applies `REPARTO_*` overrides read through `lookup`.
    ///
    /// Unlike a missing variable, a variable that is set but unparsable is an
    /// error: a typo should not silently fall back to a default.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(env::DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(env::MAX_CONNECTIONS) {
            self.max_connections = parse_var(env::MAX_CONNECTIONS, &raw)?;
        }

        if let Some(raw) = lookup(env::BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms = parse_var(env::BUSY_TIMEOUT_MS, &raw)?;
        }

        if let Some(raw) = lookup(env::RETRY_MAX_ATTEMPTS) {
            self.retry.max_attempts = parse_var(env::RETRY_MAX_ATTEMPTS, &raw)?;
        }

        if let Some(raw) = lookup(env::RETRY_INITIAL_BACKOFF_MS) {
            self.retry.initial_backoff_ms = parse_var(env::RETRY_INITIAL_BACKOFF_MS, &raw)?;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".into()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".into()));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue("retry.max_attempts".into()));
        }

        Ok(())
    }

    /// Pool settings for [`reparto_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "reparto", "route-service")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("route-service.toml"))
}

/// `<data dir>/reparto.db`, or `./reparto.db` when no home directory exists.
fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("reparto.db"))
        .unwrap_or_else(|| PathBuf::from("reparto.db"))
}

// =============================================================================
// Unit Tests
// =============================================================================
