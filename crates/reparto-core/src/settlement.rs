//! # Settlement Math
//!
//! Pure arithmetic behind the reconciliation transaction: the per-customer
//! balance recurrence and the per-(agent, date, zone) aggregate.
//!
//! ## The Recurrence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  new_balance = old_balance + units_sold − cash − on_account            │
//! │                                                                         │
//! │  Example: owes 10, sells 5, collects 3 cash + 2 on account             │
//! │           10 + 5 − 3 − 2 = 10                                           │
//! │                                                                         │
//! │  Every step is checked; overflow is an error, never a wrap.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Aggregate
//! ```text
//! (agent, date, zone) ──► ┌──────────────┬──────────────┐
//!                         │      A3      │      A4      │
//!                         ├──────────────┼──────────────┤
//!                         │ units_sold   │ units_sold   │
//!                         │ cash         │ cash         │
//!                         │ on_account   │ on_account   │
//!                         └──────────────┴──────────────┘
//! ```
//! Storage applies a [`SettlementDelta`] with one upsert-add statement.
//! [`fold_log`] recomputes the same row from the visit log so the two can
//! be compared.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{DailySettlement, ProductCode, VisitLogEntry};

// =============================================================================
// Settlement Amounts
// =============================================================================

/// Units sold and collections for one product on one visit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementAmounts {
    pub units_sold: i64,
    pub cash_collected: i64,
    pub on_account_collected: i64,
}

impl SettlementAmounts {
    pub const fn new(units_sold: i64, cash_collected: i64, on_account_collected: i64) -> Self {
        SettlementAmounts {
            units_sold,
            cash_collected,
            on_account_collected,
        }
    }

    pub const fn zero() -> Self {
        SettlementAmounts::new(0, 0, 0)
    }

    /// Net change to the customer's balance: `units_sold − cash − on_account`.
    pub fn net(&self) -> CoreResult<i64> {
        self.units_sold
            .checked_sub(self.cash_collected)
            .and_then(|v| v.checked_sub(self.on_account_collected))
            .ok_or_else(|| CoreError::overflow("visit net"))
    }

    /// Component-wise sum.
    pub fn checked_add(&self, other: &SettlementAmounts) -> CoreResult<SettlementAmounts> {
        Ok(SettlementAmounts {
            units_sold: add(self.units_sold, other.units_sold, "units sold")?,
            cash_collected: add(self.cash_collected, other.cash_collected, "cash collected")?,
            on_account_collected: add(
                self.on_account_collected,
                other.on_account_collected,
                "on-account collected",
            )?,
        })
    }

    /// Component-wise difference (`self − other`), used for corrections.
    pub fn checked_sub(&self, other: &SettlementAmounts) -> CoreResult<SettlementAmounts> {
        let sub = |a: i64, b: i64, what: &str| {
            a.checked_sub(b).ok_or_else(|| CoreError::overflow(what))
        };
        Ok(SettlementAmounts {
            units_sold: sub(self.units_sold, other.units_sold, "units sold")?,
            cash_collected: sub(self.cash_collected, other.cash_collected, "cash collected")?,
            on_account_collected: sub(
                self.on_account_collected,
                other.on_account_collected,
                "on-account collected",
            )?,
        })
    }

    pub fn is_zero(&self) -> bool {
        *self == SettlementAmounts::zero()
    }
}

impl From<&VisitLogEntry> for SettlementAmounts {
    fn from(entry: &VisitLogEntry) -> Self {
        SettlementAmounts::new(entry.units_sold, entry.cash_collected, entry.on_account_collected)
    }
}

fn add(a: i64, b: i64, what: &str) -> CoreResult<i64> {
    a.checked_add(b).ok_or_else(|| CoreError::overflow(what))
}

// =============================================================================
// Balance Recurrence
// =============================================================================

/// Applies one visit to a customer balance.
///
/// ## Example
/// ```rust
/// use reparto_core::settlement::{next_balance, SettlementAmounts};
///
/// assert_eq!(next_balance(10, &SettlementAmounts::new(5, 3, 2)).unwrap(), 10);
/// assert_eq!(next_balance(0, &SettlementAmounts::new(0, 4, 0)).unwrap(), -4);
/// ```
pub fn next_balance(balance: i64, amounts: &SettlementAmounts) -> CoreResult<i64> {
    add(balance, amounts.net()?, "customer balance")
}

// =============================================================================
// Aggregate Key and Delta
// =============================================================================

/// Identity of one daily settlement row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementKey {
    pub agent_code: i64,
    #[ts(as = "String")]
    pub settlement_date: NaiveDate,
    pub zone_code: i64,
}

impl SettlementKey {
    pub const fn new(agent_code: i64, settlement_date: NaiveDate, zone_code: i64) -> Self {
        SettlementKey {
            agent_code,
            settlement_date,
            zone_code,
        }
    }
}

/// Amounts to add to every column of a settlement row.
///
/// Only the columns of one product are non-zero for a visit, but the delta
/// always carries all six so storage can bind one fixed statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementDelta {
    pub a3: SettlementAmounts,
    pub a4: SettlementAmounts,
}

impl SettlementDelta {
    /// Delta that touches only `product`'s columns.
    pub fn for_product(product: ProductCode, amounts: SettlementAmounts) -> Self {
        match product {
            ProductCode::A3 => SettlementDelta {
                a3: amounts,
                a4: SettlementAmounts::zero(),
            },
            ProductCode::A4 => SettlementDelta {
                a3: SettlementAmounts::zero(),
                a4: amounts,
            },
        }
    }
}

// =============================================================================
// Daily Settlement Helpers
// =============================================================================

impl DailySettlement {
    /// All-zero row for `key`.
    pub fn empty(key: SettlementKey) -> Self {
        DailySettlement {
            agent_code: key.agent_code,
            settlement_date: key.settlement_date,
            zone_code: key.zone_code,
            units_sold_a3: 0,
            cash_a3: 0,
            on_account_a3: 0,
            units_sold_a4: 0,
            cash_a4: 0,
            on_account_a4: 0,
        }
    }

    pub fn key(&self) -> SettlementKey {
        SettlementKey::new(self.agent_code, self.settlement_date, self.zone_code)
    }

    /// Totals for one product.
    pub fn amounts(&self, product: ProductCode) -> SettlementAmounts {
        match product {
            ProductCode::A3 => {
                SettlementAmounts::new(self.units_sold_a3, self.cash_a3, self.on_account_a3)
            }
            ProductCode::A4 => {
                SettlementAmounts::new(self.units_sold_a4, self.cash_a4, self.on_account_a4)
            }
        }
    }

    /// Adds a delta in place, mirroring the storage upsert.
    pub fn apply(&mut self, delta: &SettlementDelta) -> CoreResult<()> {
        let a3 = self.amounts(ProductCode::A3).checked_add(&delta.a3)?;
        let a4 = self.amounts(ProductCode::A4).checked_add(&delta.a4)?;

        self.units_sold_a3 = a3.units_sold;
        self.cash_a3 = a3.cash_collected;
        self.on_account_a3 = a3.on_account_collected;
        self.units_sold_a4 = a4.units_sold;
        self.cash_a4 = a4.cash_collected;
        self.on_account_a4 = a4.on_account_collected;
        Ok(())
    }

    /// Units sold across both products; what stock rollforward subtracts.
    pub fn total_units_sold(&self) -> CoreResult<i64> {
        add(self.units_sold_a3, self.units_sold_a4, "total units sold")
    }
}

/// Recomputes the settlement row for `key` from log entries.
///
/// Entries outside the key are ignored. Callers de-duplicate first; this
/// function sums whatever it is given.
pub fn fold_log<'a, I>(key: SettlementKey, entries: I) -> CoreResult<DailySettlement>
where
    I: IntoIterator<Item = &'a VisitLogEntry>,
{
    let mut settlement = DailySettlement::empty(key);

    for entry in entries {
        if entry.agent_code != key.agent_code
            || entry.visit_date != key.settlement_date
            || entry.zone_code != key.zone_code
        {
            continue;
        }
        let delta = SettlementDelta::for_product(entry.product, SettlementAmounts::from(entry));
        settlement.apply(&delta)?;
    }

    Ok(settlement)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 14).unwrap()
    }

    fn entry(id: i64, product: ProductCode, units: i64, cash: i64, ccte: i64) -> VisitLogEntry {
        VisitLogEntry {
            id,
            agent_code: 1,
            zone_code: 7,
            route_order: id,
            customer_code: 100 + id,
            product,
            visit_date: date(),
            units_sold: units,
            cash_collected: cash,
            on_account_collected: ccte,
            empties_returned: 0,
            reason: None,
            prior_balance: 0,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_balance_scenario() {
        let amounts = SettlementAmounts::new(5, 3, 2);
        assert_eq!(next_balance(10, &amounts).unwrap(), 10);
    }

    #[test]
    fn test_balance_zero_and_negative_inputs() {
        assert_eq!(next_balance(7, &SettlementAmounts::zero()).unwrap(), 7);
        assert_eq!(next_balance(7, &SettlementAmounts::new(-2, 0, 0)).unwrap(), 5);
        assert_eq!(next_balance(7, &SettlementAmounts::new(0, -1, -1)).unwrap(), 9);
        assert_eq!(next_balance(0, &SettlementAmounts::new(0, 3, 0)).unwrap(), -3);
    }

    #[test]
    fn test_balance_overflow_is_error() {
        let amounts = SettlementAmounts::new(1, 0, 0);
        assert!(matches!(
            next_balance(i64::MAX, &amounts),
            Err(CoreError::ArithmeticOverflow { .. })
        ));
        let amounts = SettlementAmounts::new(i64::MIN, 1, 0);
        assert!(amounts.net().is_err());
    }

    #[test]
    fn test_delta_targets_one_product() {
        let delta = SettlementDelta::for_product(ProductCode::A4, SettlementAmounts::new(5, 3, 2));
        assert!(delta.a3.is_zero());
        assert_eq!(delta.a4, SettlementAmounts::new(5, 3, 2));
    }

    #[test]
    fn test_apply_accumulates() {
        let key = SettlementKey::new(1, date(), 7);
        let mut row = DailySettlement::empty(key);
        let delta = SettlementDelta::for_product(ProductCode::A3, SettlementAmounts::new(5, 5, 0));
        row.apply(&delta).unwrap();
        row.apply(&delta).unwrap();
        assert_eq!(row.units_sold_a3, 10);
        assert_eq!(row.cash_a3, 10);
        assert_eq!(row.units_sold_a4, 0);
        assert_eq!(row.total_units_sold().unwrap(), 10);
    }

    #[test]
    fn test_fold_log_sums_matching_key_only() {
        let key = SettlementKey::new(1, date(), 7);
        let mut other_zone = entry(3, ProductCode::A3, 100, 0, 0);
        other_zone.zone_code = 8;

        let entries = vec![
            entry(1, ProductCode::A3, 2, 1, 1),
            entry(2, ProductCode::A4, 5, 3, 2),
            other_zone,
        ];
        let row = fold_log(key, &entries).unwrap();

        assert_eq!(row.amounts(ProductCode::A3), SettlementAmounts::new(2, 1, 1));
        assert_eq!(row.amounts(ProductCode::A4), SettlementAmounts::new(5, 3, 2));
    }

    #[test]
    fn test_correction_delta() {
        let old = SettlementAmounts::new(5, 3, 2);
        let new = SettlementAmounts::new(4, 4, 0);
        let delta = new.checked_sub(&old).unwrap();
        assert_eq!(delta, SettlementAmounts::new(-1, 1, -2));
        assert_eq!(old.checked_add(&delta).unwrap(), new);
    }
}
