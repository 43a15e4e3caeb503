//! # Error Types
//!
//! Domain-specific error types for reparto-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  reparto-core errors (this file)                                       │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures (pre-I/O)            │
//! │                                                                         │
//! │  reparto-db errors (separate crate)                                    │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  route-service errors                                                  │
//! │  └── ApiError         - What the route client sees (serialized)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::ProductCode;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No visit line item was provisioned for the customer/product pair.
    ///
    /// ## When This Occurs
    /// - The route-load step never created the line for this customer
    /// - The client sent a product the customer does not take
    ///
    /// The reconciliation transaction is rolled back; nothing is written.
    #[error("No pending line item for customer {customer_code} product {product}")]
    LineItemNotFound {
        customer_code: i64,
        product: ProductCode,
    },

    /// A correction referenced a visit that was never logged.
    #[error("No logged visit for customer {customer_code} product {product} on {visit_date}")]
    VisitNotLogged {
        customer_code: i64,
        product: ProductCode,
        visit_date: NaiveDate,
    },

    /// Stock rollforward has no baseline row before the requested date.
    ///
    /// ## Why a hard stop?
    /// ```text
    /// caps(date) = caps(prior) - units_sold(date)
    ///                   ▲
    ///                   └── no prior row → the derived count means nothing
    /// ```
    #[error("No stock level recorded before {date}")]
    NoPriorStock { date: NaiveDate },

    /// Agent name/password pair did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// An arithmetic step would overflow i64.
    #[error("Arithmetic overflow while computing {context}")]
    ArithmeticOverflow { context: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        CoreError::ArithmeticOverflow {
            context: context.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are raised before any storage access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::LineItemNotFound {
            customer_code: 42,
            product: ProductCode::A4,
        };
        assert_eq!(
            err.to_string(),
            "No pending line item for customer 42 product A4"
        );

        let date = NaiveDate::from_ymd_opt(2025, 4, 14).unwrap();
        let err = CoreError::NoPriorStock { date };
        assert_eq!(err.to_string(), "No stock level recorded before 2025-04-14");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("cod_cliente");
        assert_eq!(err.to_string(), "cod_cliente is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("fecha").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
