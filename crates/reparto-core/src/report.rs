//! # Reports
//!
//! Read-side projections over settlements and the de-duplicated visit log.
//! Storage fetches rows; this module folds them.
//!
//! - [`DayResults`] - one (agent, date, zone) settlement next to the log
//!   totals it should equal
//! - [`CustomerDayMovements`] - the day's log grouped by customer, in route
//!   order
//! - [`MonthlySummary`] - collections per (date, zone) for a month, priced
//!   with the [`PriceList`]

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::dedup::dedup_latest;
use crate::error::CoreResult;
use crate::money::Money;
use crate::settlement::{fold_log, SettlementDelta, SettlementKey};
use crate::types::{Customer, DailySettlement, ProductCode, ProductPrice, VisitLogEntry};

// =============================================================================
// Price List
// =============================================================================

/// Product prices for reporting. A product without a price is valued at zero.
#[derive(Debug, Clone, Default)]
pub struct PriceList {
    prices: HashMap<ProductCode, Money>,
}

impl PriceList {
    pub fn new(prices: impl IntoIterator<Item = ProductPrice>) -> Self {
        PriceList {
            prices: prices
                .into_iter()
                .map(|p| (p.product, Money::from_cents(p.price_cents)))
                .collect(),
        }
    }

    pub fn price(&self, product: ProductCode) -> Money {
        self.prices.get(&product).copied().unwrap_or_default()
    }

    /// Values `units` of `product`.
    pub fn value(&self, product: ProductCode, units: i64) -> CoreResult<Money> {
        self.price(product).checked_mul_units(units)
    }
}

// =============================================================================
// Day Results
// =============================================================================

/// End-of-day figures for one (agent, date, zone).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DayResults {
    /// The stored aggregate (all zeros if nothing was reconciled).
    pub settlement: DailySettlement,
    /// The same row recomputed from the de-duplicated log.
    pub log_totals: DailySettlement,
    /// Distinct visits in the de-duplicated log.
    pub visits: usize,
    /// Whether the aggregate and the log agree.
    pub in_balance: bool,
}

impl DayResults {
    /// Builds day results from the stored row and the day's log entries.
    pub fn build(
        key: SettlementKey,
        settlement: Option<DailySettlement>,
        entries: Vec<VisitLogEntry>,
    ) -> CoreResult<DayResults> {
        let survivors = dedup_latest(entries).survivors;
        let log_totals = fold_log(key, &survivors)?;
        let settlement = settlement.unwrap_or_else(|| DailySettlement::empty(key));
        let in_balance = settlement == log_totals;

        Ok(DayResults {
            settlement,
            log_totals,
            visits: survivors.len(),
            in_balance,
        })
    }
}

// =============================================================================
// Day Movements by Customer
// =============================================================================

/// A customer and the visits logged for them on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerDayMovements {
    pub customer: Customer,
    pub movements: Vec<VisitLogEntry>,
}

/// Groups log entries under their customers.
///
/// Customer order is preserved (callers pass route order); customers with no
/// entries are dropped. Each customer's movements are ordered by id.
pub fn group_by_customer(
    customers: Vec<Customer>,
    entries: Vec<VisitLogEntry>,
) -> Vec<CustomerDayMovements> {
    let mut by_customer: HashMap<i64, Vec<VisitLogEntry>> = HashMap::new();
    for entry in entries {
        by_customer.entry(entry.customer_code).or_default().push(entry);
    }

    customers
        .into_iter()
        .filter_map(|customer| {
            let mut movements = by_customer.remove(&customer.customer_code)?;
            movements.sort_by_key(|e| e.id);
            Some(CustomerDayMovements {
                customer,
                movements,
            })
        })
        .collect()
}

// =============================================================================
// Monthly Summary
// =============================================================================

/// Collections for one (date, zone), in units and priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyCollectionRow {
    #[ts(as = "String")]
    pub settlement_date: NaiveDate,
    pub zone_code: i64,
    pub cash_a3: Money,
    pub cash_a4: Money,
    pub on_account_a3: Money,
    pub on_account_a4: Money,
}

impl MonthlyCollectionRow {
    fn priced(settlement: &DailySettlement, prices: &PriceList) -> CoreResult<Self> {
        Ok(MonthlyCollectionRow {
            settlement_date: settlement.settlement_date,
            zone_code: settlement.zone_code,
            cash_a3: prices.value(ProductCode::A3, settlement.cash_a3)?,
            cash_a4: prices.value(ProductCode::A4, settlement.cash_a4)?,
            on_account_a3: prices.value(ProductCode::A3, settlement.on_account_a3)?,
            on_account_a4: prices.value(ProductCode::A4, settlement.on_account_a4)?,
        })
    }

    pub fn total(&self) -> CoreResult<Money> {
        self.cash_a3
            .checked_add(self.cash_a4)?
            .checked_add(self.on_account_a3)?
            .checked_add(self.on_account_a4)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyTotals {
    pub cash_a3: Money,
    pub cash_a4: Money,
    pub on_account_a3: Money,
    pub on_account_a4: Money,
    pub grand_total: Money,
}

/// Month-to-date collections for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlySummary {
    pub agent_code: i64,
    pub year: i32,
    pub month: u32,
    pub rows: Vec<MonthlyCollectionRow>,
    pub totals: MonthlyTotals,
}

impl MonthlySummary {
    /// Prices settlement rows and totals them.
    ///
    /// Rows sharing a (date, zone) are merged; output is ordered by date then
    /// zone.
    pub fn build(
        agent_code: i64,
        year: i32,
        month: u32,
        settlements: &[DailySettlement],
        prices: &PriceList,
    ) -> CoreResult<MonthlySummary> {
        let mut merged: Vec<DailySettlement> = Vec::new();
        for s in settlements {
            match merged
                .iter_mut()
                .find(|m| m.settlement_date == s.settlement_date && m.zone_code == s.zone_code)
            {
                Some(existing) => {
                    for product in ProductCode::ALL {
                        let delta = SettlementDelta::for_product(product, s.amounts(product));
                        existing.apply(&delta)?;
                    }
                }
                None => merged.push(s.clone()),
            }
        }
        merged.sort_by_key(|s| (s.settlement_date, s.zone_code));

        let mut rows = Vec::with_capacity(merged.len());
        let mut totals = MonthlyTotals::default();
        for settlement in &merged {
            let row = MonthlyCollectionRow::priced(settlement, prices)?;
            totals.cash_a3 = totals.cash_a3.checked_add(row.cash_a3)?;
            totals.cash_a4 = totals.cash_a4.checked_add(row.cash_a4)?;
            totals.on_account_a3 = totals.on_account_a3.checked_add(row.on_account_a3)?;
            totals.on_account_a4 = totals.on_account_a4.checked_add(row.on_account_a4)?;
            totals.grand_total = totals.grand_total.checked_add(row.total()?)?;
            rows.push(row);
        }

        Ok(MonthlySummary {
            agent_code,
            year,
            month,
            rows,
            totals,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn prices() -> PriceList {
        PriceList::new(vec![
            ProductPrice {
                product: ProductCode::A3,
                price_cents: 500,
            },
            ProductPrice {
                product: ProductCode::A4,
                price_cents: 800,
            },
        ])
    }

    fn settlement(d: u32, zone: i64, cash_a3: i64, cash_a4: i64, ccte_a4: i64) -> DailySettlement {
        DailySettlement {
            agent_code: 1,
            settlement_date: day(d),
            zone_code: zone,
            units_sold_a3: cash_a3,
            cash_a3,
            on_account_a3: 0,
            units_sold_a4: cash_a4 + ccte_a4,
            cash_a4,
            on_account_a4: ccte_a4,
        }
    }

    fn log(id: i64, customer: i64, units: i64, cash: i64) -> VisitLogEntry {
        VisitLogEntry {
            id,
            agent_code: 1,
            zone_code: 7,
            route_order: 0,
            customer_code: customer,
            product: ProductCode::A4,
            visit_date: day(14),
            units_sold: units,
            cash_collected: cash,
            on_account_collected: 0,
            empties_returned: 0,
            reason: None,
            prior_balance: 0,
            recorded_at: Utc::now(),
        }
    }

    fn customer(code: i64, seq: i64) -> Customer {
        Customer {
            customer_code: code,
            name: format!("Cliente {code}"),
            address: None,
            locality: None,
            phone: None,
            zone_code: 7,
            route_sequence: seq,
            visited: true,
            balance_a3: 0,
            balance_a4: 0,
        }
    }

    #[test]
    fn test_missing_price_is_zero() {
        let list = PriceList::new(Vec::new());
        assert_eq!(list.value(ProductCode::A4, 10).unwrap(), Money::zero());
    }

    #[test]
    fn test_monthly_summary_prices_and_totals() {
        let rows = vec![settlement(2, 7, 2, 3, 1), settlement(1, 7, 0, 1, 0)];
        let summary = MonthlySummary::build(1, 2025, 4, &rows, &prices()).unwrap();

        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rows[0].settlement_date, day(1));
        assert_eq!(summary.rows[1].cash_a3.cents(), 1_000);
        assert_eq!(summary.rows[1].cash_a4.cents(), 2_400);
        assert_eq!(summary.rows[1].on_account_a4.cents(), 800);

        assert_eq!(summary.totals.cash_a4.cents(), 3_200);
        assert_eq!(summary.totals.grand_total.cents(), 800 + 1_000 + 2_400 + 800);
    }

    #[test]
    fn test_monthly_summary_merges_same_day_and_zone() {
        let rows = vec![settlement(3, 7, 1, 0, 0), settlement(3, 7, 2, 0, 0)];
        let summary = MonthlySummary::build(1, 2025, 4, &rows, &prices()).unwrap();
        assert_eq!(summary.rows.len(), 1);
        assert_eq!(summary.rows[0].cash_a3.cents(), 1_500);
    }

    #[test]
    fn test_day_results_uses_deduplicated_log() {
        let key = SettlementKey::new(1, day(14), 7);
        let entries = vec![log(1, 42, 5, 5), log(2, 42, 4, 4), log(3, 43, 1, 1)];

        let mut stored = DailySettlement::empty(key);
        stored.units_sold_a4 = 5;
        stored.cash_a4 = 5;

        let results = DayResults::build(key, Some(stored), entries).unwrap();
        assert_eq!(results.visits, 2);
        assert_eq!(results.log_totals.units_sold_a4, 5);
        assert!(results.in_balance);
    }

    #[test]
    fn test_day_results_flags_drift() {
        let key = SettlementKey::new(1, day(14), 7);
        let results = DayResults::build(key, None, vec![log(1, 42, 5, 5)]).unwrap();
        assert!(!results.in_balance);
        assert_eq!(results.settlement, DailySettlement::empty(key));
    }

    #[test]
    fn test_group_by_customer_keeps_route_order() {
        let customers = vec![customer(43, 1), customer(42, 2), customer(44, 3)];
        let entries = vec![log(5, 42, 1, 1), log(2, 43, 1, 1), log(3, 42, 2, 2)];

        let grouped = group_by_customer(customers, entries);
        let codes: Vec<i64> = grouped.iter().map(|g| g.customer.customer_code).collect();
        assert_eq!(codes, vec![43, 42]);
        let ids: Vec<i64> = grouped[1].movements.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 5]);
    }
}
