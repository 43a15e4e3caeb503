//! # Domain Types
//!
//! Core domain types used throughout Reparto.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │  VisitLineItem  │   │  VisitLogEntry  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  customer_code  │◄──│  customer_code  │   │  id (ordering)  │       │
//! │  │  zone_code      │   │  product        │   │  agent/zone     │       │
//! │  │  visited (ter)  │   │  units_sold     │   │  visit_date     │       │
//! │  │  balance_a3/a4  │   │  cash/on_account│   │  prior_balance  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ DailySettlement │   │   StockLevel    │   │   ProductCode   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  agent/date/zone│   │  stock_date     │   │  A3             │       │
//! │  │  ×3 per product │   │  caps, bottles  │   │  A4             │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Agents, zones and customers are identified by the integer codes the
//! route sheets already use. Log entries use an autoincrement `id`, which
//! doubles as insertion order for de-duplication.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product Code
// =============================================================================

/// The two returnable bottle sizes carried on a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductCode {
    A3,
    A4,
}

impl ProductCode {
    /// Every product, in reporting order.
    pub const ALL: [ProductCode; 2] = [ProductCode::A3, ProductCode::A4];

    /// Wire/storage representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductCode::A3 => "A3",
            ProductCode::A4 => "A4",
        }
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A3" => Ok(ProductCode::A3),
            "A4" => Ok(ProductCode::A4),
            _ => Err(ValidationError::NotAllowed {
                field: "product".to_string(),
                allowed: ProductCode::ALL.iter().map(|p| p.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer on a delivery route (the route-sheet header).
///
/// The per-product balance here is the single source of truth for what the
/// customer owes in bottles. Only reconciliation and correction move it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub customer_code: i64,
    pub name: String,
    pub address: Option<String>,
    pub locality: Option<String>,
    pub phone: Option<String>,
    pub zone_code: i64,
    /// Position in the zone's delivery order.
    pub route_sequence: i64,
    /// Set once any visit has been reconciled for this customer.
    pub visited: bool,
    pub balance_a3: i64,
    pub balance_a4: i64,
}

impl Customer {
    /// Outstanding balance for one product.
    pub fn balance(&self, product: ProductCode) -> i64 {
        match product {
            ProductCode::A3 => self.balance_a3,
            ProductCode::A4 => self.balance_a4,
        }
    }
}

/// Fields needed to put a customer on a route sheet.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub customer_code: i64,
    pub name: String,
    pub address: Option<String>,
    pub locality: Option<String>,
    pub phone: Option<String>,
    pub zone_code: i64,
    pub route_sequence: i64,
    #[serde(default)]
    pub balance_a3: i64,
    #[serde(default)]
    pub balance_a4: i64,
}

// =============================================================================
// Visit Line Item
// =============================================================================

/// Current per-customer, per-product transaction state.
///
/// Overwritten (never accumulated) by each reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VisitLineItem {
    pub customer_code: i64,
    pub product: ProductCode,
    pub agent_code: i64,
    pub zone_code: i64,
    pub units_sold: i64,
    pub cash_collected: i64,
    pub on_account_collected: i64,
}

/// A line item joined with the customer's authoritative balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerMovement {
    pub customer_code: i64,
    pub product: ProductCode,
    pub units_sold: i64,
    pub cash_collected: i64,
    pub on_account_collected: i64,
    /// Balance read from the customer header, not stored on the line.
    pub balance: i64,
}

// =============================================================================
// Visit Completion Log
// =============================================================================

/// One finalized visit, as appended to the completion log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VisitLogEntry {
    /// Autoincrement id; higher means later.
    pub id: i64,
    pub agent_code: i64,
    pub zone_code: i64,
    pub route_order: i64,
    pub customer_code: i64,
    pub product: ProductCode,
    #[ts(as = "String")]
    pub visit_date: NaiveDate,
    pub units_sold: i64,
    pub cash_collected: i64,
    pub on_account_collected: i64,
    pub empties_returned: i64,
    pub reason: Option<String>,
    /// Header balance before this visit was applied ("debe").
    pub prior_balance: i64,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

/// Durable record that a visit with a given idempotency key was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VisitReceipt {
    pub idempotency_key: Option<String>,
    pub customer_code: i64,
    pub product: ProductCode,
    #[ts(as = "String")]
    pub visit_date: NaiveDate,
    pub visit_log_id: i64,
    pub new_balance: i64,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

/// Result of reconciling (or replaying) a visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VisitOutcome {
    pub receipt: VisitReceipt,
    /// True when the idempotency key had already been committed and nothing
    /// was written by this call.
    pub replayed: bool,
}

// =============================================================================
// Daily Settlement Aggregate
// =============================================================================

/// Running per-(agent, date, zone) totals split by product and payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailySettlement {
    pub agent_code: i64,
    #[ts(as = "String")]
    pub settlement_date: NaiveDate,
    pub zone_code: i64,
    pub units_sold_a3: i64,
    pub cash_a3: i64,
    pub on_account_a3: i64,
    pub units_sold_a4: i64,
    pub cash_a4: i64,
    pub on_account_a4: i64,
}

// =============================================================================
// Stock
// =============================================================================

/// Warehouse inventory snapshot for one business date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    #[ts(as = "String")]
    pub stock_date: NaiveDate,
    pub caps: i64,
    pub bottles_a4: i64,
    pub bottles_a3: i64,
    pub bases: i64,
}

/// Result of a stock rollforward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockRollforward {
    pub stock: StockLevel,
    /// True when this call inserted the row for the date.
    pub created: bool,
    /// True when this call subtracted the scope's units sold. False on a
    /// re-run for an (agent, zone) already applied to the date.
    pub applied: bool,
}

// =============================================================================
// Agents
// =============================================================================

/// A delivery agent (repartidor). The password hash never leaves storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Agent {
    pub agent_code: i64,
    pub name: String,
}

// =============================================================================
// Expenses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ExpenseCategory {
    pub code: i64,
    pub description: String,
}

/// An expense an agent paid out of the day's cash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: i64,
    pub agent_code: i64,
    #[ts(as = "String")]
    pub expense_date: NaiveDate,
    pub category_code: i64,
    pub amount_cents: i64,
}

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewExpense {
    pub agent_code: i64,
    #[ts(as = "String")]
    pub expense_date: NaiveDate,
    pub category_code: i64,
    pub amount_cents: i64,
}

// =============================================================================
// Prices
// =============================================================================

/// Unit price of a product, used only for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductPrice {
    pub product: ProductCode,
    pub price_cents: i64,
}

impl ProductPrice {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// New-Customer Intake
// =============================================================================

/// A prospect captured on the route, waiting to be turned into a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerIntake {
    pub id: i64,
    pub business_name: String,
    pub locality: Option<String>,
    pub phone: Option<String>,
    pub bottle_product: ProductCode,
    pub quantity: i64,
    pub zone_code: i64,
    pub route_sequence: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomerIntake {
    pub business_name: String,
    pub locality: Option<String>,
    pub phone: Option<String>,
    pub bottle_product: ProductCode,
    pub quantity: i64,
    pub zone_code: i64,
    pub route_sequence: Option<i64>,
}

// =============================================================================
// Truck Movements
// =============================================================================

/// Direction of a truck movement relative to the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TruckMovementKind {
    /// Bottles loaded onto the truck in the morning.
    Load,
    /// Bottles (full or empty) brought back at day end.
    Unload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TruckMovement {
    pub id: i64,
    #[ts(as = "String")]
    pub movement_date: NaiveDate,
    pub agent_code: i64,
    pub product: ProductCode,
    pub zone_code: i64,
    pub quantity: i64,
    pub kind: TruckMovementKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTruckMovement {
    #[ts(as = "String")]
    pub movement_date: NaiveDate,
    pub agent_code: i64,
    pub product: ProductCode,
    pub zone_code: i64,
    pub quantity: i64,
    pub kind: TruckMovementKind,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_code_parse() {
        assert_eq!("A3".parse::<ProductCode>().unwrap(), ProductCode::A3);
        assert_eq!(" a4 ".parse::<ProductCode>().unwrap(), ProductCode::A4);
        assert!("A5".parse::<ProductCode>().is_err());
        assert!("".parse::<ProductCode>().is_err());
    }

    #[test]
    fn test_product_code_serde() {
        let json = serde_json::to_string(&ProductCode::A4).unwrap();
        assert_eq!(json, "\"A4\"");
        let back: ProductCode = serde_json::from_str("\"A3\"").unwrap();
        assert_eq!(back, ProductCode::A3);
    }

    #[test]
    fn test_customer_balance_by_product() {
        let customer = Customer {
            customer_code: 7,
            name: "Kiosco Norte".to_string(),
            address: None,
            locality: None,
            phone: None,
            zone_code: 3,
            route_sequence: 1,
            visited: false,
            balance_a3: 2,
            balance_a4: 10,
        };
        assert_eq!(customer.balance(ProductCode::A3), 2);
        assert_eq!(customer.balance(ProductCode::A4), 10);
    }

    #[test]
    fn test_truck_movement_kind_serde() {
        let json = serde_json::to_string(&TruckMovementKind::Unload).unwrap();
        assert_eq!(json, "\"unload\"");
    }
}
