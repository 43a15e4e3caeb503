//! # Validation Module
//!
//! Input validation for Reparto commands.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Route client                                                 │
//! │  └── Form checks, immediate feedback                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Command (Rust)                                               │
//! │  ├── Deserialization (every field optional on the wire)                │
//! │  └── THIS MODULE: required fields, codes, dates, lengths               │
//! │           │  (nothing below runs if this layer rejects)                │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE and foreign key constraints                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use reparto_core::validation::{parse_business_date, validate_code};
//!
//! let date = parse_business_date("2025-04-14", "date").unwrap();
//! assert_eq!(date.to_string(), "2025-04-14");
//! assert!(validate_code(0, "agent_code").is_err());
//! ```

use chrono::{Datelike, NaiveDate};

use crate::error::ValidationError;
use crate::types::{NewCustomer, NewCustomerIntake, NewExpense, NewTruckMovement, ProductCode};
use crate::{BUSINESS_DATE_FORMAT, MAX_IDEMPOTENCY_KEY_LEN, MAX_NAME_LEN, MAX_REASON_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest quantity accepted for a single truck movement or intake.
pub const MAX_QUANTITY: i64 = 10_000;

// =============================================================================
// Presence
// =============================================================================

/// Unwraps a required field, reporting its name when absent.
///
/// ## Example
/// ```rust
/// use reparto_core::validation::require;
///
/// assert_eq!(require(Some(5), "units_sold").unwrap(), 5);
/// assert!(require::<i64>(None, "units_sold").is_err());
/// ```
pub fn require<T>(value: Option<T>, field: &str) -> ValidationResult<T> {
    value.ok_or_else(|| ValidationError::required(field))
}

/// Like [`require`], but also rejects blank strings.
pub fn require_text(value: Option<String>, field: &str) -> ValidationResult<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ValidationError::required(field)),
    }
}

// =============================================================================
// Codes and Enumerations
// =============================================================================

/// Validates an agent, zone or customer code.
///
/// Codes come from printed route sheets and start at 1.
pub fn validate_code(code: i64, field: &str) -> ValidationResult<i64> {
    if code <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(code)
}

/// Parses a product code (`A3` or `A4`).
pub fn parse_product(raw: &str) -> ValidationResult<ProductCode> {
    if raw.trim().is_empty() {
        return Err(ValidationError::required("product"));
    }
    raw.parse()
}

// =============================================================================
// Dates
// =============================================================================

/// Parses a business date in `YYYY-MM-DD` form.
///
/// There is no "today" default: every caller states the date it means.
pub fn parse_business_date(raw: &str, field: &str) -> ValidationResult<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::required(field));
    }

    NaiveDate::parse_from_str(raw, BUSINESS_DATE_FORMAT).map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        }
    })
}

/// Validates a calendar month and returns its half-open date range.
///
/// ## Example
/// ```rust
/// use reparto_core::validation::month_range;
///
/// let (start, end) = month_range(2024, 12).unwrap();
/// assert_eq!(start.to_string(), "2024-12-01");
/// assert_eq!(end.to_string(), "2025-01-01");
/// ```
pub fn month_range(year: i32, month: u32) -> ValidationResult<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }

    let out_of_range = || ValidationError::OutOfRange {
        field: "year".to_string(),
        min: 2000,
        max: 9999,
    };
    if !(2000..=9999).contains(&year) {
        return Err(out_of_range());
    }

    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(out_of_range)?;
    let end = if start.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(out_of_range)?;

    Ok((start, end))
}

// =============================================================================
// Free Text
// =============================================================================

/// Normalizes the optional visit reason. Blank becomes `None`.
pub fn validate_reason(reason: Option<String>) -> ValidationResult<Option<String>> {
    let Some(reason) = reason else {
        return Ok(None);
    };

    let reason = reason.trim();
    if reason.is_empty() {
        return Ok(None);
    }

    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }

    Ok(Some(reason.to_string()))
}

/// Validates a client-generated idempotency key.
///
/// ## Rules
/// - Must not be blank
/// - At most 64 characters
/// - Letters, numbers, hyphens and underscores only
pub fn validate_idempotency_key(key: &str) -> ValidationResult<String> {
    let key = key.trim();

    if key.is_empty() {
        return Err(ValidationError::required("idempotency_key"));
    }

    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(ValidationError::TooLong {
            field: "idempotency_key".to_string(),
            max: MAX_IDEMPOTENCY_KEY_LEN,
        });
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "idempotency_key".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(key.to_string())
}

/// Validates a display name (agent, customer, category).
pub fn validate_name(name: &str, field: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

// =============================================================================
// Numbers
// =============================================================================

/// Validates a count that cannot be negative (e.g. empties returned).
pub fn validate_non_negative(value: i64, field: &str) -> ValidationResult<i64> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(value)
}

/// Validates a quantity for truck movements and intake.
pub fn validate_quantity(qty: i64) -> ValidationResult<i64> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }

    Ok(qty)
}

/// Validates an expense or price amount in cents.
pub fn validate_amount_cents(cents: i64, field: &str) -> ValidationResult<i64> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(cents)
}

// =============================================================================
// Composite Inputs
// =============================================================================

pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<()> {
    validate_code(customer.customer_code, "customer_code")?;
    validate_name(&customer.name, "name")?;
    validate_code(customer.zone_code, "zone_code")?;
    validate_non_negative(customer.route_sequence, "route_sequence")?;
    Ok(())
}

pub fn validate_new_expense(expense: &NewExpense) -> ValidationResult<()> {
    validate_code(expense.agent_code, "agent_code")?;
    validate_code(expense.category_code, "category_code")?;
    validate_amount_cents(expense.amount_cents, "amount_cents")?;
    Ok(())
}

pub fn validate_new_intake(intake: &NewCustomerIntake) -> ValidationResult<()> {
    validate_name(&intake.business_name, "business_name")?;
    validate_quantity(intake.quantity)?;
    validate_code(intake.zone_code, "zone_code")?;
    if let Some(seq) = intake.route_sequence {
        validate_non_negative(seq, "route_sequence")?;
    }
    Ok(())
}

pub fn validate_new_truck_movement(movement: &NewTruckMovement) -> ValidationResult<()> {
    validate_code(movement.agent_code, "agent_code")?;
    validate_code(movement.zone_code, "zone_code")?;
    validate_quantity(movement.quantity)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
