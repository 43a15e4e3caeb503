//! # Application State
//!
//! What every command receives: the database handle and the retry policy.
//!
//! ## Thread Safety
//! `Database` wraps a `SqlitePool`, which is safe to share. Commands run
//! concurrently on the same `AppState` without explicit locking; the only
//! concurrency boundary is SQLite's write lock.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn pending_customers(
//!     state: &AppState,
//!     req: PendingCustomersRequest,
//! ) -> Result<Vec<Customer>, ApiError> {
//!     let db = state.db();
//!     let customers = with_retry(state.retry(), "pending_customers", || async move {
//!         db.ledger().pending_customers(req.zone_code).await
//!     })
//!     .await?;
//!     Ok(customers)
//! }
//! ```

use reparto_core::retry::RetryPolicy;
use reparto_db::{Database, DbResult};
use tracing::info;

use crate::config::ServiceConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
    retry: RetryPolicy,
}

impl AppState {
    pub fn new(db: Database, retry: RetryPolicy) -> Self {
        AppState { db, retry }
    }

    /// Opens the configured database (creating it and running migrations).
    pub async fn connect(config: &ServiceConfig) -> DbResult<Self> {
        let db = Database::new(config.db_config()).await?;
        info!(
            max_attempts = config.retry.max_attempts,
            "Route service state ready"
        );
        Ok(AppState::new(db, config.retry.clone()))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Retry policy for reads and single-statement writes.
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}
