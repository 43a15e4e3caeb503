//! # Money Module
//!
//! Integer money for the reporting side of Reparto.
//!
//! Route figures (units sold, cash and on-account collections) are unit
//! counts. They only become money in reports, where each count is priced
//! with the product price list:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cash_a4 (units) × price(A4) (cents) ──► Money                         │
//! │                                                                         │
//! │  Stored in cents, summed in cents, never as floating point.            │
//! │  Formatting with a currency symbol belongs to the client.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use reparto_core::money::Money;
//!
//! let price = Money::from_cents(1_250);
//! let line = price.checked_mul_units(4).unwrap();
//! assert_eq!(line.cents(), 5_000);
//! ```

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed, so corrections can produce negative amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Prices a unit count: `self × units`.
    ///
    /// ## Example
    /// ```rust
    /// use reparto_core::money::Money;
    ///
    /// assert!(Money::from_cents(i64::MAX).checked_mul_units(2).is_err());
    /// ```
    pub fn checked_mul_units(&self, units: i64) -> CoreResult<Money> {
        self.0
            .checked_mul(units)
            .map(Money)
            .ok_or_else(|| CoreError::overflow("priced units"))
    }

    pub fn checked_add(&self, other: Money) -> CoreResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| CoreError::overflow("money total"))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// Unchecked operators for totals that are already bounded by checked steps.

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
