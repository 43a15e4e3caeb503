//! # Visit Log Repository
//!
//! The append-only completion log. Each reconciled or corrected visit adds
//! one row; rows are never updated.
//!
//! ## De-duplication
//! ```text
//! DELETE FROM visit_log
//! WHERE id NOT IN (
//!     SELECT MAX(id) FROM visit_log
//!     GROUP BY agent_code, customer_code, product, visit_date
//! )
//! [AND agent_code = ? AND zone_code = ? AND visit_date = ?]   ← scoped form
//! ```
//! The scoped form deletes a subset of what the global form deletes, so
//! both agree with `reparto_core::dedup::dedup_latest`. Running either twice
//! deletes nothing the second time.

use chrono::{DateTime, NaiveDate, Utc};
use reparto_core::{ProductCode, VisitLogEntry};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;

const LOG_COLUMNS: &str = "id, agent_code, zone_code, route_order, customer_code, product, \
     visit_date, units_sold, cash_collected, on_account_collected, empties_returned, reason, \
     prior_balance, recorded_at";

/// A log row before it has an id.
#[derive(Debug, Clone)]
pub(crate) struct NewLogEntry {
    pub agent_code: i64,
    pub zone_code: i64,
    pub route_order: i64,
    pub customer_code: i64,
    pub product: ProductCode,
    pub visit_date: NaiveDate,
    pub units_sold: i64,
    pub cash_collected: i64,
    pub on_account_collected: i64,
    pub empties_returned: i64,
    pub reason: Option<String>,
    pub prior_balance: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Restricts de-duplication to one agent's zone on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupScope {
    pub agent_code: i64,
    pub zone_code: i64,
    pub visit_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct VisitLogRepository {
    pool: SqlitePool,
}

impl VisitLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VisitLogRepository { pool }
    }

    /// Removes all but the latest entry per (agent, customer, product, date).
    ///
    /// Returns the number of rows deleted.
    pub async fn dedup(&self, scope: Option<DedupScope>) -> DbResult<u64> {
        let result = match scope {
            None => {
                sqlx::query(
                    "DELETE FROM visit_log
                     WHERE id NOT IN (
                         SELECT MAX(id) FROM visit_log
                         GROUP BY agent_code, customer_code, product, visit_date
                     )",
                )
                .execute(&self.pool)
                .await?
            }
            Some(scope) => {
                sqlx::query(
                    "DELETE FROM visit_log
                     WHERE agent_code = ?1 AND zone_code = ?2 AND visit_date = ?3
                       AND id NOT IN (
                         SELECT MAX(id) FROM visit_log
                         WHERE agent_code = ?1 AND visit_date = ?3
                         GROUP BY agent_code, customer_code, product, visit_date
                     )",
                )
                .bind(scope.agent_code)
                .bind(scope.zone_code)
                .bind(scope.visit_date)
                .execute(&self.pool)
                .await?
            }
        };

        let pruned = result.rows_affected();
        if pruned > 0 {
            info!(pruned, ?scope, "Duplicate visit log entries pruned");
        } else {
            debug!(?scope, "Visit log already de-duplicated");
        }
        Ok(pruned)
    }

    /// Log entries for one agent's zone on one day, in insertion order.
    pub async fn entries_for_day(
        &self,
        agent_code: i64,
        zone_code: i64,
        visit_date: NaiveDate,
    ) -> DbResult<Vec<VisitLogEntry>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM visit_log
             WHERE agent_code = ?1 AND zone_code = ?2 AND visit_date = ?3
             ORDER BY id"
        );
        let entries = sqlx::query_as::<_, VisitLogEntry>(&sql)
            .bind(agent_code)
            .bind(zone_code)
            .bind(visit_date)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<VisitLogEntry>> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM visit_log WHERE id = ?1");
        let entry = sqlx::query_as::<_, VisitLogEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    // =========================================================================
    // Transaction Helpers
    // =========================================================================

    /// Appends a row and returns its id.
    pub(crate) async fn append_tx(
        conn: &mut SqliteConnection,
        entry: &NewLogEntry,
    ) -> DbResult<i64> {
        let result = sqlx::query(
            "INSERT INTO visit_log
                (agent_code, zone_code, route_order, customer_code, product, visit_date,
                 units_sold, cash_collected, on_account_collected, empties_returned,
                 reason, prior_balance, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(entry.agent_code)
        .bind(entry.zone_code)
        .bind(entry.route_order)
        .bind(entry.customer_code)
        .bind(entry.product)
        .bind(entry.visit_date)
        .bind(entry.units_sold)
        .bind(entry.cash_collected)
        .bind(entry.on_account_collected)
        .bind(entry.empties_returned)
        .bind(&entry.reason)
        .bind(entry.prior_balance)
        .bind(entry.recorded_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// The most recent entry for (agent, zone, customer, product, date).
    pub(crate) async fn latest_for_tx(
        conn: &mut SqliteConnection,
        agent_code: i64,
        zone_code: i64,
        customer_code: i64,
        product: ProductCode,
        visit_date: NaiveDate,
    ) -> DbResult<Option<VisitLogEntry>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM visit_log
             WHERE agent_code = ?1 AND zone_code = ?2 AND customer_code = ?3
               AND product = ?4 AND visit_date = ?5
             ORDER BY id DESC
             LIMIT 1"
        );
        let entry = sqlx::query_as::<_, VisitLogEntry>(&sql)
            .bind(agent_code)
            .bind(zone_code)
            .bind(customer_code)
            .bind(product)
            .bind(visit_date)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(entry)
    }

    pub(crate) async fn get_tx(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> DbResult<Option<VisitLogEntry>> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM visit_log WHERE id = ?1");
        let entry = sqlx::query_as::<_, VisitLogEntry>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(entry)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use reparto_core::dedup::dedup_latest;
    use reparto_core::NewCustomer;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 14).unwrap()
    }

    fn log_row(customer: i64, product: ProductCode, zone: i64, units: i64) -> NewLogEntry {
        NewLogEntry {
            agent_code: 1,
            zone_code: zone,
            route_order: 1,
            customer_code: customer,
            product,
            visit_date: day(),
            units_sold: units,
            cash_collected: 0,
            on_account_collected: 0,
            empties_returned: 0,
            reason: None,
            prior_balance: 0,
            recorded_at: Utc::now(),
        }
    }

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for code in [42, 43] {
            db.ledger()
                .create_customer(&NewCustomer {
                    customer_code: code,
                    name: format!("Cliente {code}"),
                    address: None,
                    locality: None,
                    phone: None,
                    zone_code: 7,
                    route_sequence: 1,
                    balance_a3: 0,
                    balance_a4: 0,
                })
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_dedup_matches_pure_rule_and_is_idempotent() {
        let db = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        for row in [
            log_row(42, ProductCode::A4, 7, 5),
            log_row(42, ProductCode::A4, 7, 4),
            log_row(43, ProductCode::A3, 7, 2),
            log_row(42, ProductCode::A4, 7, 6),
        ] {
            VisitLogRepository::append_tx(&mut conn, &row).await.unwrap();
        }
        drop(conn);

        let before = db.visit_log().entries_for_day(1, 7, day()).await.unwrap();
        let expected = dedup_latest(before).survivors;

        assert_eq!(db.visit_log().dedup(None).await.unwrap(), 2);
        let after = db.visit_log().entries_for_day(1, 7, day()).await.unwrap();
        assert_eq!(after, expected);
        assert_eq!(after[0].units_sold, 2);
        assert_eq!(after[1].units_sold, 6);

        assert_eq!(db.visit_log().dedup(None).await.unwrap(), 0);
        let again = db.visit_log().entries_for_day(1, 7, day()).await.unwrap();
        assert_eq!(again, after);
    }

    #[tokio::test]
    async fn test_scoped_dedup_leaves_other_zones() {
        let db = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        for row in [
            log_row(42, ProductCode::A4, 7, 5),
            log_row(42, ProductCode::A4, 7, 4),
            log_row(43, ProductCode::A3, 9, 1),
            log_row(43, ProductCode::A3, 9, 2),
        ] {
            VisitLogRepository::append_tx(&mut conn, &row).await.unwrap();
        }
        drop(conn);

        let scope = DedupScope {
            agent_code: 1,
            zone_code: 7,
            visit_date: day(),
        };
        assert_eq!(db.visit_log().dedup(Some(scope)).await.unwrap(), 1);
        assert_eq!(db.visit_log().entries_for_day(1, 9, day()).await.unwrap().len(), 2);
        assert_eq!(db.visit_log().dedup(Some(scope)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_latest_for_returns_highest_id() {
        let db = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        VisitLogRepository::append_tx(&mut conn, &log_row(42, ProductCode::A4, 7, 5))
            .await
            .unwrap();
        let last = VisitLogRepository::append_tx(&mut conn, &log_row(42, ProductCode::A4, 7, 8))
            .await
            .unwrap();

        let latest =
            VisitLogRepository::latest_for_tx(&mut conn, 1, 7, 42, ProductCode::A4, day())
                .await
                .unwrap()
                .unwrap();
        assert_eq!(latest.id, last);
        assert_eq!(latest.units_sold, 8);

        let none =
            VisitLogRepository::latest_for_tx(&mut conn, 1, 7, 42, ProductCode::A3, day())
                .await
                .unwrap();
        assert!(none.is_none());
    }
}
