//! # Settlement Repository
//!
//! The daily settlement aggregate: one row per (agent, date, zone) holding
//! units sold and collections per product.
//!
//! ## Upsert
//! ```text
//! INSERT (key, delta)
//!    │
//!    ├── no row for key ──► row = delta
//!    │
//!    └── row exists ──────► every column += delta column
//! ```
//! The whole thing is one statement, so two agents adding to the same key
//! can never lose each other's increment.

use chrono::NaiveDate;
use reparto_core::settlement::{SettlementDelta, SettlementKey};
use reparto_core::{CoreError, DailySettlement};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

const SETTLEMENT_COLUMNS: &str = "agent_code, settlement_date, zone_code, \
     units_sold_a3, cash_a3, on_account_a3, units_sold_a4, cash_a4, on_account_a4";

#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: SqlitePool,
}

impl SettlementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettlementRepository { pool }
    }

    /// The stored row for `key`, if any visit has been reconciled into it.
    pub async fn get(&self, key: &SettlementKey) -> DbResult<Option<DailySettlement>> {
        let sql = format!(
            "SELECT {SETTLEMENT_COLUMNS} FROM daily_settlements
             WHERE agent_code = ?1 AND settlement_date = ?2 AND zone_code = ?3"
        );
        let row = sqlx::query_as::<_, DailySettlement>(&sql)
            .bind(key.agent_code)
            .bind(key.settlement_date)
            .bind(key.zone_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// All of an agent's rows with `start <= date < end`, by date then zone.
    pub async fn list_for_agent_between(
        &self,
        agent_code: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<DailySettlement>> {
        debug!(agent_code, %start, %end, "Listing settlements");

        let sql = format!(
            "SELECT {SETTLEMENT_COLUMNS} FROM daily_settlements
             WHERE agent_code = ?1 AND settlement_date >= ?2 AND settlement_date < ?3
             ORDER BY settlement_date, zone_code"
        );
        let rows = sqlx::query_as::<_, DailySettlement>(&sql)
            .bind(agent_code)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Adds `delta` to the row for `key`, creating it if missing.
    ///
    /// SQLite turns an overflowing integer sum into REAL; the `WHERE` guard
    /// skips the update instead, and that is reported as `ArithmeticOverflow`.
    pub(crate) async fn upsert_add_tx(
        conn: &mut SqliteConnection,
        key: &SettlementKey,
        delta: &SettlementDelta,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "INSERT INTO daily_settlements
                (agent_code, settlement_date, zone_code,
                 units_sold_a3, cash_a3, on_account_a3,
                 units_sold_a4, cash_a4, on_account_a4)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(agent_code, settlement_date, zone_code) DO UPDATE SET
                units_sold_a3 = units_sold_a3 + excluded.units_sold_a3,
                cash_a3 = cash_a3 + excluded.cash_a3,
                on_account_a3 = on_account_a3 + excluded.on_account_a3,
                units_sold_a4 = units_sold_a4 + excluded.units_sold_a4,
                cash_a4 = cash_a4 + excluded.cash_a4,
                on_account_a4 = on_account_a4 + excluded.on_account_a4
             WHERE typeof(daily_settlements.units_sold_a3 + excluded.units_sold_a3) = 'integer'
               AND typeof(daily_settlements.cash_a3 + excluded.cash_a3) = 'integer'
               AND typeof(daily_settlements.on_account_a3 + excluded.on_account_a3) = 'integer'
               AND typeof(daily_settlements.units_sold_a4 + excluded.units_sold_a4) = 'integer'
               AND typeof(daily_settlements.cash_a4 + excluded.cash_a4) = 'integer'
               AND typeof(daily_settlements.on_account_a4 + excluded.on_account_a4) = 'integer'",
        )
        .bind(key.agent_code)
        .bind(key.settlement_date)
        .bind(key.zone_code)
        .bind(delta.a3.units_sold)
        .bind(delta.a3.cash_collected)
        .bind(delta.a3.on_account_collected)
        .bind(delta.a4.units_sold)
        .bind(delta.a4.cash_collected)
        .bind(delta.a4.on_account_collected)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ArithmeticOverflow {
                context: "daily settlement".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Reads the row for `key` on the caller's transaction.
    pub(crate) async fn get_tx(
        conn: &mut SqliteConnection,
        key: &SettlementKey,
    ) -> DbResult<Option<DailySettlement>> {
        let sql = format!(
            "SELECT {SETTLEMENT_COLUMNS} FROM daily_settlements
             WHERE agent_code = ?1 AND settlement_date = ?2 AND zone_code = ?3"
        );
        let row = sqlx::query_as::<_, DailySettlement>(&sql)
            .bind(key.agent_code)
            .bind(key.settlement_date)
            .bind(key.zone_code)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
