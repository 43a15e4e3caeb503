//! # Visit Reconciliation
//!
//! Folds one finished visit into the three places that track it: the
//! customer's line item and balance, the daily settlement aggregate, and
//! the completion log. All of it commits together or not at all.
//!
//! ## Reconciliation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   0. INSERT visit_receipts (key) ON CONFLICT DO NOTHING  ← if key given │
//! │        └── 0 rows? ──► ROLLBACK, return stored receipt (replayed)       │
//! │   1. UPDATE visit_line_items SET figures  ── 0 rows? ──► LineItemNotFound│
//! │   2. UPSERT daily_settlements += delta                                  │
//! │   3. UPDATE customers SET visited = 1                                   │
//! │   4. SELECT header balance ──► INSERT visit_log (prior_balance)         │
//! │   5. UPDATE customers SET balance = prior + units − cash − on_account   │
//! │   6. UPDATE visit_receipts SET visit_log_id, new_balance                │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error ──► explicit ROLLBACK, then the error is returned            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement is always a write, so the connection holds the
//! SQLite write lock before it reads the balance it will base step 5 on.
//! A concurrent reconciler waits on the busy timeout and then sees the
//! committed balance.
//!
//! ## Retries
//! Neither transaction here is retried server-side. Clients retry with the
//! same idempotency key; a key that already committed replays its receipt.
//! A key reused for a different customer, product or date is a validation
//! error.

use chrono::Utc;
use reparto_core::settlement::{next_balance, SettlementAmounts, SettlementDelta, SettlementKey};
use reparto_core::{
    CoreError, ValidationError, VisitCorrection, VisitEvent, VisitLogEntry, VisitOutcome,
    VisitReceipt,
};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::ledger::LedgerRepository;
use crate::repository::settlement::SettlementRepository;
use crate::repository::visit_log::{NewLogEntry, VisitLogRepository};

/// What a committed correction changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionOutcome {
    /// Id of the log entry the correction supersedes.
    pub replaced_id: i64,
    /// The newly appended log entry carrying the corrected figures.
    pub entry: VisitLogEntry,
    /// Corrected minus previous figures, as added to the aggregate.
    pub delta: SettlementAmounts,
    pub new_balance: i64,
}

enum ReconcileStep {
    Committed(VisitReceipt),
    Replayed(VisitReceipt),
}

/// Runs the reconciliation and correction transactions.
#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: SqlitePool,
}

impl Reconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Reconciler { pool }
    }

    /// Reconciles one visit atomically.
    ///
    /// ## Errors
    /// - `CoreError::LineItemNotFound` when the (customer, product) line was
    ///   never provisioned; nothing is written
    /// - `CoreError::ArithmeticOverflow` when the balance would overflow
    /// - `DbError::Conflict` when the write lock could not be taken in time
    pub async fn reconcile_visit(&self, event: &VisitEvent) -> DbResult<VisitOutcome> {
        debug!(
            customer_code = event.customer_code,
            product = %event.product,
            agent_code = event.agent_code,
            zone_code = event.zone_code,
            visit_date = %event.visit_date,
            "Reconciling visit"
        );

        let mut tx = self.pool.begin().await?;

        match reconcile_steps(&mut tx, event).await {
            Ok(ReconcileStep::Committed(receipt)) => {
                tx.commit().await?;
                info!(
                    customer_code = receipt.customer_code,
                    product = %receipt.product,
                    visit_log_id = receipt.visit_log_id,
                    new_balance = receipt.new_balance,
                    "Visit reconciled"
                );
                Ok(VisitOutcome {
                    receipt,
                    replayed: false,
                })
            }
            Ok(ReconcileStep::Replayed(receipt)) => {
                rollback(tx, "visit replay").await;
                warn!(
                    idempotency_key = receipt.idempotency_key.as_deref().unwrap_or_default(),
                    visit_log_id = receipt.visit_log_id,
                    "Visit already reconciled, replaying receipt"
                );
                Ok(VisitOutcome {
                    receipt,
                    replayed: true,
                })
            }
            Err(err) => {
                warn!(
                    customer_code = event.customer_code,
                    product = %event.product,
                    error = %err,
                    "Visit reconciliation rolled back"
                );
                rollback(tx, "visit reconciliation").await;
                Err(err)
            }
        }
    }

    /// Replaces the figures of the latest logged visit for
    /// (agent, zone, customer, product, date).
    ///
    /// The difference between the corrected and logged figures is added to
    /// the aggregate and the balance, and a new log entry is appended, so
    /// the aggregate keeps matching the de-duplicated log.
    ///
    /// ## Errors
    /// - `CoreError::LineItemNotFound` when the line item is missing
    /// - `CoreError::VisitNotLogged` when there is nothing to correct
    pub async fn correct_visit(&self, correction: &VisitCorrection) -> DbResult<CorrectionOutcome> {
        debug!(
            customer_code = correction.customer_code,
            product = %correction.product,
            agent_code = correction.agent_code,
            visit_date = %correction.visit_date,
            "Correcting visit"
        );

        let mut tx = self.pool.begin().await?;

        match correction_steps(&mut tx, correction).await {
            Ok(outcome) => {
                tx.commit().await?;
                info!(
                    replaced_id = outcome.replaced_id,
                    visit_log_id = outcome.entry.id,
                    new_balance = outcome.new_balance,
                    "Visit corrected"
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    customer_code = correction.customer_code,
                    product = %correction.product,
                    error = %err,
                    "Visit correction rolled back"
                );
                rollback(tx, "visit correction").await;
                Err(err)
            }
        }
    }
}

async fn rollback(tx: sqlx::Transaction<'_, sqlx::Sqlite>, what: &str) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, what, "Rollback failed");
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

async fn reconcile_steps(
    conn: &mut SqliteConnection,
    event: &VisitEvent,
) -> DbResult<ReconcileStep> {
    let recorded_at = Utc::now();

    if let Some(key) = &event.idempotency_key {
        let claimed = sqlx::query(
            "INSERT INTO visit_receipts
                (idempotency_key, customer_code, product, visit_date, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(idempotency_key) DO NOTHING",
        )
        .bind(key)
        .bind(event.customer_code)
        .bind(event.product)
        .bind(event.visit_date)
        .bind(recorded_at)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if claimed == 0 {
            let stored = sqlx::query_as::<_, VisitReceipt>(
                "SELECT idempotency_key, customer_code, product, visit_date,
                        visit_log_id, new_balance, recorded_at
                 FROM visit_receipts WHERE idempotency_key = ?1",
            )
            .bind(key)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("VisitReceipt", key.clone()))?;

            if (stored.customer_code, stored.product, stored.visit_date)
                != (event.customer_code, event.product, event.visit_date)
            {
                return Err(ValidationError::InvalidFormat {
                    field: "idempotency_key".to_string(),
                    reason: format!(
                        "already used for customer {} product {} on {}",
                        stored.customer_code, stored.product, stored.visit_date
                    ),
                }
                .into());
            }
            return Ok(ReconcileStep::Replayed(stored));
        }
    }

    let amounts = event.amounts();

    let found = LedgerRepository::overwrite_line_item_tx(
        conn,
        event.customer_code,
        event.product,
        &amounts,
    )
    .await?;
    if !found {
        return Err(CoreError::LineItemNotFound {
            customer_code: event.customer_code,
            product: event.product,
        }
        .into());
    }

    let key = SettlementKey::new(event.agent_code, event.visit_date, event.zone_code);
    let delta = SettlementDelta::for_product(event.product, amounts);
    SettlementRepository::upsert_add_tx(conn, &key, &delta).await?;

    LedgerRepository::mark_visited_tx(conn, event.customer_code).await?;

    let (prior_balance, route_sequence) =
        LedgerRepository::header_balance_tx(conn, event.customer_code, event.product).await?;
    let new_balance = next_balance(prior_balance, &amounts)?;

    let visit_log_id = VisitLogRepository::append_tx(
        conn,
        &NewLogEntry {
            agent_code: event.agent_code,
            zone_code: event.zone_code,
            route_order: route_sequence,
            customer_code: event.customer_code,
            product: event.product,
            visit_date: event.visit_date,
            units_sold: amounts.units_sold,
            cash_collected: amounts.cash_collected,
            on_account_collected: amounts.on_account_collected,
            empties_returned: event.empties_returned,
            reason: event.reason.clone(),
            prior_balance,
            recorded_at,
        },
    )
    .await?;

    LedgerRepository::set_balance_tx(conn, event.customer_code, event.product, new_balance)
        .await?;

    if let Some(key) = &event.idempotency_key {
        sqlx::query(
            "UPDATE visit_receipts SET visit_log_id = ?1, new_balance = ?2
             WHERE idempotency_key = ?3",
        )
        .bind(visit_log_id)
        .bind(new_balance)
        .bind(key)
        .execute(&mut *conn)
        .await?;
    }

    debug!(prior_balance, new_balance, visit_log_id, "Visit steps applied");

    Ok(ReconcileStep::Committed(VisitReceipt {
        idempotency_key: event.idempotency_key.clone(),
        customer_code: event.customer_code,
        product: event.product,
        visit_date: event.visit_date,
        visit_log_id,
        new_balance,
        recorded_at,
    }))
}

async fn correction_steps(
    conn: &mut SqliteConnection,
    correction: &VisitCorrection,
) -> DbResult<CorrectionOutcome> {
    let corrected = correction.amounts();

    let found = LedgerRepository::overwrite_line_item_tx(
        conn,
        correction.customer_code,
        correction.product,
        &corrected,
    )
    .await?;
    if !found {
        return Err(CoreError::LineItemNotFound {
            customer_code: correction.customer_code,
            product: correction.product,
        }
        .into());
    }

    let previous = VisitLogRepository::latest_for_tx(
        conn,
        correction.agent_code,
        correction.zone_code,
        correction.customer_code,
        correction.product,
        correction.visit_date,
    )
    .await?
    .ok_or(CoreError::VisitNotLogged {
        customer_code: correction.customer_code,
        product: correction.product,
        visit_date: correction.visit_date,
    })?;

    let delta = corrected.checked_sub(&SettlementAmounts::from(&previous))?;

    let key = SettlementKey::new(
        correction.agent_code,
        correction.visit_date,
        correction.zone_code,
    );
    SettlementRepository::upsert_add_tx(
        conn,
        &key,
        &SettlementDelta::for_product(correction.product, delta),
    )
    .await?;

    let (prior_balance, route_sequence) =
        LedgerRepository::header_balance_tx(conn, correction.customer_code, correction.product)
            .await?;
    let new_balance = next_balance(prior_balance, &delta)?;

    let id = VisitLogRepository::append_tx(
        conn,
        &NewLogEntry {
            agent_code: correction.agent_code,
            zone_code: correction.zone_code,
            route_order: route_sequence,
            customer_code: correction.customer_code,
            product: correction.product,
            visit_date: correction.visit_date,
            units_sold: corrected.units_sold,
            cash_collected: corrected.cash_collected,
            on_account_collected: corrected.on_account_collected,
            empties_returned: correction.empties_returned,
            reason: correction.reason.clone(),
            prior_balance,
            recorded_at: Utc::now(),
        },
    )
    .await?;

    LedgerRepository::set_balance_tx(
        conn,
        correction.customer_code,
        correction.product,
        new_balance,
    )
    .await?;

    let entry = VisitLogRepository::get_tx(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("VisitLogEntry", id.to_string()))?;

    Ok(CorrectionOutcome {
        replaced_id: previous.id,
        entry,
        delta,
        new_balance,
    })
}
