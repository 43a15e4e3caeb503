//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Domain Error (CoreError)            │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← categorized: not found / conflict / storage  │
//! │       │                                                                 │
//! │       ├── is_retryable()? ──► retry executor (idempotent ops only)     │
//! │       ▼                                                                 │
//! │  ApiError (route-service) ← serialized for the route client            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use reparto_core::CoreError;
use thiserror::Error;

/// SQLite primary and extended result codes that mean "another writer holds
/// the lock" (BUSY, LOCKED and their extended variants).
const SQLITE_LOCK_CODES: &[&str] = &["5", "6", "261", "262", "517"];

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - No line item for the (customer, product) being reconciled
    /// - No logged visit to correct
    /// - Unknown customer code
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Another connection holds the write lock (SQLITE_BUSY / LOCKED).
    ///
    /// Safe to retry for single statements. The reconciliation transaction
    /// surfaces it to the client instead.
    #[error("Concurrent write conflict: {0}")]
    Conflict(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction could not begin, commit or roll back.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A domain rule rejected the operation inside a transaction.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if the operation may succeed when attempted again.
    ///
    /// ## Retryable
    /// - Lock contention (`Conflict`)
    /// - Pool exhaustion and connection loss
    ///
    /// ## Not Retryable
    /// - Missing rows, constraint violations, domain errors
    /// - Migration and query errors (the same SQL fails the same way)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::Conflict(_) | DbError::PoolExhausted | DbError::ConnectionFailed(_)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → constraint / lock / query by code and message
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::Io             → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                if code
                    .as_deref()
                    .is_some_and(|c| SQLITE_LOCK_CODES.contains(&c))
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::Conflict(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    // "UNIQUE constraint failed: <table>.<column>[, ...]"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<reparto_core::ValidationError> for DbError {
    fn from(err: reparto_core::ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(DbError::Conflict("database is locked".into()).is_retryable());
        assert!(DbError::PoolExhausted.is_retryable());
        assert!(DbError::ConnectionFailed("io".into()).is_retryable());

        assert!(!DbError::not_found("Customer", "42").is_retryable());
        assert!(!DbError::duplicate("stock_date", "2025-04-14").is_retryable());
        assert!(!DbError::QueryFailed("syntax".into()).is_retryable());
        assert!(!DbError::Domain(CoreError::InvalidCredentials).is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_pool_timeout_maps_to_exhausted() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::PoolExhausted));
        assert!(err.is_retryable());
    }
}
