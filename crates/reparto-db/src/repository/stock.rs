//! # Stock Repository
//!
//! Warehouse stock snapshots, one per business date, chained by date.
//!
//! ## Rollforward
//! ```text
//!  stock_levels                      daily_settlements
//!  ┌────────────┬──────┐             ┌───────┬────────────┬──────┐
//!  │ 2025-04-11 │ 500  │ ◄── latest  │ agent │ 2025-04-14 │ zone │
//!  └────────────┴──────┘    before   │ units_sold_a3 + _a4 = 37  │
//!          │                date     └───────────────────────────┘
//!          ▼                                  │
//!  ┌────────────┬──────┐                      │
//!  │ 2025-04-14 │ 463  │ ◄── caps − units ────┘
//!  └────────────┴──────┘     bottles / bases carried unchanged
//! ```
//!
//! Each (date, agent, zone) is applied once and recorded in
//! `stock_rollforwards`. The first scope for a date inserts the row; later
//! scopes subtract their own sales from it (`created = false`). Re-running an
//! applied scope returns the row unchanged (`applied = false`).

use chrono::{NaiveDate, Utc};
use reparto_core::settlement::SettlementKey;
use reparto_core::validation::validate_non_negative;
use reparto_core::{CoreError, DailySettlement, StockLevel, StockRollforward};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::settlement::SettlementRepository;

const STOCK_COLUMNS: &str = "stock_date, caps, bottles_a4, bottles_a3, bases";

#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Records a counted stock level (a restock or the first baseline).
    pub async fn insert_level(&self, level: &StockLevel) -> DbResult<StockLevel> {
        validate_non_negative(level.caps, "caps")?;
        validate_non_negative(level.bottles_a4, "bottles_a4")?;
        validate_non_negative(level.bottles_a3, "bottles_a3")?;
        validate_non_negative(level.bases, "bases")?;

        let mut conn = self.pool.acquire().await?;
        insert_tx(&mut conn, level).await.map_err(|e| match e {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("stock_date", level.stock_date.to_string())
            }
            other => other,
        })?;

        info!(stock_date = %level.stock_date, caps = level.caps, "Stock level recorded");
        Ok(level.clone())
    }

    pub async fn get(&self, stock_date: NaiveDate) -> DbResult<Option<StockLevel>> {
        let sql = format!("SELECT {STOCK_COLUMNS} FROM stock_levels WHERE stock_date = ?1");
        let level = sqlx::query_as::<_, StockLevel>(&sql)
            .bind(stock_date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(level)
    }

    /// Rolls stock forward to `date` by subtracting the day's units sold for
    /// (agent, date, zone) from the most recent earlier snapshot.
    ///
    /// ## Errors
    /// - `CoreError::NoPriorStock` if no snapshot exists before `date`
    pub async fn rollforward(
        &self,
        date: NaiveDate,
        agent_code: i64,
        zone_code: i64,
    ) -> DbResult<StockRollforward> {
        debug!(%date, agent_code, zone_code, "Rolling stock forward");

        let mut tx = self.pool.begin().await?;
        match rollforward_steps(&mut tx, date, SettlementKey::new(agent_code, date, zone_code))
            .await
        {
            Ok(result) => {
                tx.commit().await?;
                if result.applied {
                    info!(%date, zone_code, caps = result.stock.caps, "Stock rolled forward");
                } else {
                    debug!(%date, zone_code, "Stock already rolled forward for zone");
                }
                Ok(result)
            }
            Err(err) => {
                warn!(%date, error = %err, "Stock rollforward rolled back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

async fn rollforward_steps(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    key: SettlementKey,
) -> DbResult<StockRollforward> {
    // Write first: claiming the scope takes the lock before any read.
    let claimed = sqlx::query(
        "INSERT INTO stock_rollforwards (stock_date, agent_code, zone_code, applied_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (stock_date, agent_code, zone_code) DO NOTHING",
    )
    .bind(date)
    .bind(key.agent_code)
    .bind(key.zone_code)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .rows_affected()
        == 1;

    let existing = get_tx(conn, date).await?;

    if !claimed {
        let stock = existing.ok_or_else(|| {
            DbError::Internal(format!("rollforward recorded for {date} without a stock row"))
        })?;
        return Ok(StockRollforward {
            stock,
            created: false,
            applied: false,
        });
    }

    let sold = SettlementRepository::get_tx(conn, &key)
        .await?
        .unwrap_or_else(|| DailySettlement::empty(key))
        .total_units_sold()?;

    sqlx::query(
        "UPDATE stock_rollforwards SET units_sold = ?4
         WHERE stock_date = ?1 AND agent_code = ?2 AND zone_code = ?3",
    )
    .bind(date)
    .bind(key.agent_code)
    .bind(key.zone_code)
    .bind(sold)
    .execute(&mut *conn)
    .await?;

    // Another zone already created the row for this date
    if let Some(current) = existing {
        let caps = subtract_caps(current.caps, sold)?;
        sqlx::query("UPDATE stock_levels SET caps = ?2 WHERE stock_date = ?1")
            .bind(date)
            .bind(caps)
            .execute(&mut *conn)
            .await?;

        debug!(zone_code = key.zone_code, sold, "Zone sales subtracted from existing snapshot");
        return Ok(StockRollforward {
            stock: StockLevel { caps, ..current },
            created: false,
            applied: true,
        });
    }

    let sql = format!(
        "SELECT {STOCK_COLUMNS} FROM stock_levels
         WHERE stock_date < ?1
         ORDER BY stock_date DESC
         LIMIT 1"
    );
    let prior = sqlx::query_as::<_, StockLevel>(&sql)
        .bind(date)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(CoreError::NoPriorStock { date })?;

    let level = StockLevel {
        stock_date: date,
        caps: subtract_caps(prior.caps, sold)?,
        bottles_a4: prior.bottles_a4,
        bottles_a3: prior.bottles_a3,
        bases: prior.bases,
    };
    insert_tx(conn, &level).await?;

    debug!(prior_date = %prior.stock_date, sold, "Stock derived from prior snapshot");
    Ok(StockRollforward {
        stock: level,
        created: true,
        applied: true,
    })
}

fn subtract_caps(caps: i64, sold: i64) -> DbResult<i64> {
    caps.checked_sub(sold).ok_or_else(|| {
        CoreError::ArithmeticOverflow {
            context: "stock caps".to_string(),
        }
        .into()
    })
}

async fn get_tx(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<Option<StockLevel>> {
    let sql = format!("SELECT {STOCK_COLUMNS} FROM stock_levels WHERE stock_date = ?1");
    let level = sqlx::query_as::<_, StockLevel>(&sql)
        .bind(date)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(level)
}

async fn insert_tx(conn: &mut SqliteConnection, level: &StockLevel) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO stock_levels (stock_date, caps, bottles_a4, bottles_a3, bases)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(level.stock_date)
    .bind(level.caps)
    .bind(level.bottles_a4)
    .bind(level.bottles_a3)
    .bind(level.bases)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
