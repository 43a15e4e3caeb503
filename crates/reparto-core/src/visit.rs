//! # Visit Events
//!
//! A visit event is what the agent records at a customer's door: bottles
//! sold, cash and on-account collections, empties picked up.
//!
//! ## Input → Event
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  VisitEventInput (wire)          VisitEvent (validated)                 │
//! │  ─────────────────────           ──────────────────────                 │
//! │  every field Option<_>   ──►     every required field present          │
//! │  product: "a4"                   product: ProductCode::A4               │
//! │  date: "2025-04-14"              visit_date: NaiveDate                  │
//! │  reason: "  "                    reason: None                           │
//! │                                                                         │
//! │  TryFrom fails with ValidationError BEFORE any storage access          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary and unit fields are signed: a negative sale is an adjustment
//! (e.g. bottles taken back) and flows through the same arithmetic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::settlement::SettlementAmounts;
use crate::types::ProductCode;
use crate::validation::{
    parse_business_date, parse_product, require, validate_code, validate_idempotency_key,
    validate_non_negative, validate_reason,
};

// =============================================================================
// Visit Event
// =============================================================================

/// Raw visit as received from the route client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VisitEventInput {
    pub customer_code: Option<i64>,
    pub product: Option<String>,
    pub units_sold: Option<i64>,
    pub cash_collected: Option<i64>,
    pub on_account_collected: Option<i64>,
    pub agent_code: Option<i64>,
    pub zone_code: Option<i64>,
    pub empties_returned: Option<i64>,
    pub reason: Option<String>,
    pub date: Option<String>,
    pub idempotency_key: Option<String>,
}

/// A validated visit, ready for the reconciliation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub customer_code: i64,
    pub product: ProductCode,
    pub units_sold: i64,
    pub cash_collected: i64,
    pub on_account_collected: i64,
    pub agent_code: i64,
    pub zone_code: i64,
    pub empties_returned: i64,
    pub reason: Option<String>,
    pub visit_date: NaiveDate,
    pub idempotency_key: Option<String>,
}

impl VisitEvent {
    /// The three figures that move balances and aggregates.
    pub fn amounts(&self) -> SettlementAmounts {
        SettlementAmounts::new(self.units_sold, self.cash_collected, self.on_account_collected)
    }
}

impl TryFrom<VisitEventInput> for VisitEvent {
    type Error = ValidationError;

    fn try_from(input: VisitEventInput) -> Result<Self, Self::Error> {
        let customer_code = validate_code(require(input.customer_code, "customer_code")?, "customer_code")?;
        let product = parse_product(&require(input.product, "product")?)?;
        let units_sold = require(input.units_sold, "units_sold")?;
        let cash_collected = require(input.cash_collected, "cash_collected")?;
        let on_account_collected = require(input.on_account_collected, "on_account_collected")?;
        let agent_code = validate_code(require(input.agent_code, "agent_code")?, "agent_code")?;
        let zone_code = validate_code(require(input.zone_code, "zone_code")?, "zone_code")?;
        let empties_returned = validate_non_negative(
            require(input.empties_returned, "empties_returned")?,
            "empties_returned",
        )?;
        let visit_date = parse_business_date(&require(input.date, "date")?, "date")?;
        let reason = validate_reason(input.reason)?;
        let idempotency_key = input
            .idempotency_key
            .as_deref()
            .map(validate_idempotency_key)
            .transpose()?;

        Ok(VisitEvent {
            customer_code,
            product,
            units_sold,
            cash_collected,
            on_account_collected,
            agent_code,
            zone_code,
            empties_returned,
            reason,
            visit_date,
            idempotency_key,
        })
    }
}

// =============================================================================
// Visit Correction
// =============================================================================

/// Raw correction of an already logged visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VisitCorrectionInput {
    pub agent_code: Option<i64>,
    pub zone_code: Option<i64>,
    pub customer_code: Option<i64>,
    pub product: Option<String>,
    pub date: Option<String>,
    pub units_sold: Option<i64>,
    pub cash_collected: Option<i64>,
    pub on_account_collected: Option<i64>,
    pub empties_returned: Option<i64>,
    pub reason: Option<String>,
}

/// Replacement figures for the latest logged visit on a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitCorrection {
    pub agent_code: i64,
    pub zone_code: i64,
    pub customer_code: i64,
    pub product: ProductCode,
    pub visit_date: NaiveDate,
    pub units_sold: i64,
    pub cash_collected: i64,
    pub on_account_collected: i64,
    pub empties_returned: i64,
    pub reason: Option<String>,
}

impl VisitCorrection {
    pub fn amounts(&self) -> SettlementAmounts {
        SettlementAmounts::new(self.units_sold, self.cash_collected, self.on_account_collected)
    }
}

impl TryFrom<VisitCorrectionInput> for VisitCorrection {
    type Error = ValidationError;

    fn try_from(input: VisitCorrectionInput) -> Result<Self, Self::Error> {
        Ok(VisitCorrection {
            agent_code: validate_code(require(input.agent_code, "agent_code")?, "agent_code")?,
            zone_code: validate_code(require(input.zone_code, "zone_code")?, "zone_code")?,
            customer_code: validate_code(
                require(input.customer_code, "customer_code")?,
                "customer_code",
            )?,
            product: parse_product(&require(input.product, "product")?)?,
            visit_date: parse_business_date(&require(input.date, "date")?, "date")?,
            units_sold: require(input.units_sold, "units_sold")?,
            cash_collected: require(input.cash_collected, "cash_collected")?,
            on_account_collected: require(input.on_account_collected, "on_account_collected")?,
            empties_returned: validate_non_negative(
                require(input.empties_returned, "empties_returned")?,
                "empties_returned",
            )?,
            reason: validate_reason(input.reason)?,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn full_input() -> VisitEventInput {
        VisitEventInput {
            customer_code: Some(42),
            product: Some("A4".to_string()),
            units_sold: Some(5),
            cash_collected: Some(3),
            on_account_collected: Some(2),
            agent_code: Some(1),
            zone_code: Some(7),
            empties_returned: Some(4),
            reason: None,
            date: Some("2025-04-14".to_string()),
            idempotency_key: Some("visit-42-a4".to_string()),
        }
    }

    #[test]
    fn test_valid_input_builds_event() {
        let event = VisitEvent::try_from(full_input()).unwrap();
        assert_eq!(event.customer_code, 42);
        assert_eq!(event.product, ProductCode::A4);
        assert_eq!(event.visit_date, NaiveDate::from_ymd_opt(2025, 4, 14).unwrap());
        assert_eq!(event.amounts().net().unwrap(), 0);
        assert_eq!(event.idempotency_key.as_deref(), Some("visit-42-a4"));
    }

    #[test]
    fn test_missing_fields_are_named() {
        let mut input = full_input();
        input.cash_collected = None;
        let err = VisitEvent::try_from(input).unwrap_err();
        assert_eq!(err.to_string(), "cash_collected is required");

        let mut input = full_input();
        input.date = None;
        let err = VisitEvent::try_from(input).unwrap_err();
        assert_eq!(err.to_string(), "date is required");
    }

    #[test]
    fn test_zero_is_present_not_missing() {
        let mut input = full_input();
        input.units_sold = Some(0);
        input.cash_collected = Some(0);
        input.on_account_collected = Some(0);
        input.empties_returned = Some(0);
        assert!(VisitEvent::try_from(input).is_ok());
    }

    #[test]
    fn test_negative_adjustment_is_accepted() {
        let mut input = full_input();
        input.units_sold = Some(-2);
        let event = VisitEvent::try_from(input).unwrap();
        assert_eq!(event.units_sold, -2);
    }

    #[test]
    fn test_unknown_product_rejected() {
        let mut input = full_input();
        input.product = Some("B1".to_string());
        assert!(matches!(
            VisitEvent::try_from(input),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_correction_requires_date() {
        let input = VisitCorrectionInput {
            agent_code: Some(1),
            zone_code: Some(7),
            customer_code: Some(42),
            product: Some("A3".to_string()),
            date: None,
            units_sold: Some(1),
            cash_collected: Some(1),
            on_account_collected: Some(0),
            empties_returned: Some(0),
            reason: None,
        };
        let err = VisitCorrection::try_from(input).unwrap_err();
        assert_eq!(err.to_string(), "date is required");
    }
}
