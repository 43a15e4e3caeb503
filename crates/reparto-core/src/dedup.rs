//! # Visit Log De-duplication
//!
//! A visit can be logged more than once for the same key (client retries,
//! corrections). Only the most recent entry counts.
//!
//! ```text
//! key = (agent, customer, product, date)
//!
//!   id  key            units        id  key            units
//!   ──  ─────────────  ─────        ──  ─────────────  ─────
//!    4  (1,42,A4,d)      5    ──►    9  (1,42,A4,d)      4   ← latest wins
//!    9  (1,42,A4,d)      4          11  (1,43,A3,d)      2
//!   11  (1,43,A3,d)      2
//!                                   pruned: [4]
//! ```
//!
//! The same rule runs in SQL (`reparto-db`) against the stored log. Applying
//! it twice gives the same survivors.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::types::{ProductCode, VisitLogEntry};

/// De-duplication key for the completion log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisitLogKey {
    pub agent_code: i64,
    pub customer_code: i64,
    pub product: ProductCode,
    pub visit_date: NaiveDate,
}

impl From<&VisitLogEntry> for VisitLogKey {
    fn from(entry: &VisitLogEntry) -> Self {
        VisitLogKey {
            agent_code: entry.agent_code,
            customer_code: entry.customer_code,
            product: entry.product,
            visit_date: entry.visit_date,
        }
    }
}

/// Survivors and the ids that lost to a later entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Surviving entries, ordered by id.
    pub survivors: Vec<VisitLogEntry>,
    /// Ids that would be deleted, ascending.
    pub pruned_ids: Vec<i64>,
}

/// Keeps the entry with the highest id per [`VisitLogKey`].
pub fn dedup_latest(entries: Vec<VisitLogEntry>) -> DedupOutcome {
    let mut latest: HashMap<VisitLogKey, VisitLogEntry> = HashMap::with_capacity(entries.len());
    let mut pruned_ids = Vec::new();

    for entry in entries {
        let key = VisitLogKey::from(&entry);
        let superseded = latest.get(&key).is_some_and(|kept| kept.id >= entry.id);
        if superseded {
            pruned_ids.push(entry.id);
        } else if let Some(replaced) = latest.insert(key, entry) {
            pruned_ids.push(replaced.id);
        }
    }

    let mut survivors: Vec<VisitLogEntry> = latest.into_values().collect();
    survivors.sort_by_key(|e| e.id);
    pruned_ids.sort_unstable();

    DedupOutcome {
        survivors,
        pruned_ids,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: i64, customer: i64, product: ProductCode, units: i64) -> VisitLogEntry {
        VisitLogEntry {
            id,
            agent_code: 1,
            zone_code: 7,
            route_order: 0,
            customer_code: customer,
            product,
            visit_date: NaiveDate::from_ymd_opt(2025, 4, 14).unwrap(),
            units_sold: units,
            cash_collected: 0,
            on_account_collected: 0,
            empties_returned: 0,
            reason: None,
            prior_balance: 0,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_latest_entry_wins() {
        let outcome = dedup_latest(vec![
            entry(4, 42, ProductCode::A4, 5),
            entry(9, 42, ProductCode::A4, 4),
            entry(11, 43, ProductCode::A3, 2),
        ]);

        let ids: Vec<i64> = outcome.survivors.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![9, 11]);
        assert_eq!(outcome.pruned_ids, vec![4]);
        assert_eq!(outcome.survivors[0].units_sold, 4);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let outcome = dedup_latest(vec![
            entry(9, 42, ProductCode::A4, 4),
            entry(2, 42, ProductCode::A4, 1),
            entry(4, 42, ProductCode::A4, 5),
        ]);
        assert_eq!(outcome.survivors.len(), 1);
        assert_eq!(outcome.survivors[0].id, 9);
        assert_eq!(outcome.pruned_ids, vec![2, 4]);
    }

    #[test]
    fn test_products_are_separate_keys() {
        let outcome = dedup_latest(vec![
            entry(1, 42, ProductCode::A3, 1),
            entry(2, 42, ProductCode::A4, 1),
        ]);
        assert_eq!(outcome.survivors.len(), 2);
        assert!(outcome.pruned_ids.is_empty());
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let first = dedup_latest(vec![
            entry(1, 42, ProductCode::A3, 1),
            entry(3, 42, ProductCode::A3, 2),
            entry(5, 50, ProductCode::A4, 3),
        ]);
        let second = dedup_latest(first.survivors.clone());
        assert_eq!(second.survivors, first.survivors);
        assert!(second.pruned_ids.is_empty());
    }
}
