//! # API Error Type
//!
//! Unified error type for route-service commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Reparto                                │
//! │                                                                         │
//! │  Route client                 Rust Backend                              │
//! │  ────────────                 ────────────                              │
//! │                                                                         │
//! │  {"command":"reconcile_visit", ...}                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Bad input? ──── ValidationError ─────────────────┐             │  │
//! │  │         │        (before any storage access)      │             │  │
//! │  │         ▼                                         ▼             │  │
//! │  │  Storage / domain failure? ── DbError ───────► ApiError ───────►│  │
//! │  │         │                     (rolled back)                      │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  {"success":false,"error":{"code":"NOT_FOUND","message":"..."}}        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal details (SQL messages, lock errors) are logged, never sent.

use reparto_core::{CoreError, ValidationError};
use reparto_db::DbError;
use serde::Serialize;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "No pending line item for customer 42 product A4"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
///
/// ## Client Handling
/// ```text
/// VALIDATION_ERROR  fix the input, do not retry as-is
/// NOT_FOUND         referenced customer/line/visit is absent
/// CONFLICT          another writer held the lock; retry with the SAME
///                   idempotency key
/// STORAGE_ERROR     storage unavailable; retry later with the same key
/// INTEGRITY_ERROR   the operation would break a stored invariant
/// UNAUTHORIZED      bad agent credentials
/// INTERNAL          bug; report it
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Resource not found (404)
    NotFound,

    /// Concurrent write conflict (409)
    Conflict,

    /// Storage unavailable or failed (503)
    StorageError,

    /// Stored invariant would be violated (422)
    IntegrityError,

    /// Credentials rejected (401)
    Unauthorized,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::Conflict(e) => {
                tracing::warn!("Write conflict: {}", e);
                ApiError::new(
                    ErrorCode::Conflict,
                    "Another update is in progress, try again",
                )
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::StorageError, "Database connection failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::StorageError, "Database is busy, try again")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::new(ErrorCode::StorageError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::StorageError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::StorageError, "Database transaction failed")
            }
            DbError::Domain(e) => e.into(),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::internal("Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            e @ CoreError::LineItemNotFound { .. } => {
                ApiError::new(ErrorCode::NotFound, e.to_string())
            }
            e @ CoreError::VisitNotLogged { .. } => {
                ApiError::new(ErrorCode::NotFound, e.to_string())
            }
            e @ CoreError::NoPriorStock { .. } => {
                ApiError::new(ErrorCode::IntegrityError, e.to_string())
            }
            CoreError::InvalidCredentials => {
                ApiError::new(ErrorCode::Unauthorized, "Invalid name or password")
            }
            e @ CoreError::ArithmeticOverflow { .. } => ApiError::validation(e.to_string()),
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use reparto_core::ProductCode;

    #[test]
    fn test_error_code_wire_format() {
        let json = serde_json::to_value(ApiError::not_found("Customer", "42")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Customer not found: 42");

        let json = serde_json::to_value(ErrorCode::IntegrityError).unwrap();
        assert_eq!(json, "INTEGRITY_ERROR");
    }

    #[test]
    fn test_domain_errors_map_to_client_codes() {
        let err: ApiError = DbError::Domain(CoreError::LineItemNotFound {
            customer_code: 42,
            product: ProductCode::A4,
        })
        .into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let date = NaiveDate::from_ymd_opt(2025, 4, 14).unwrap();
        let err: ApiError = DbError::Domain(CoreError::NoPriorStock { date }).into();
        assert_eq!(err.code, ErrorCode::IntegrityError);

        let err: ApiError = CoreError::InvalidCredentials.into();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let err: ApiError = ValidationError::required("date").into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "date is required");
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let err: ApiError = DbError::QueryFailed("no such column: cash_a5".into()).into();
        assert_eq!(err.code, ErrorCode::StorageError);
        assert!(!err.message.contains("cash_a5"));

        let err: ApiError = DbError::Conflict("database is locked".into()).into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(!err.message.contains("locked"));
    }
}
