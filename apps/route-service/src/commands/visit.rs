//! # Visit Commands
//!
//! Reconciling a visit, correcting one, and pruning superseded log rows.
//!
//! ## Reconcile Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  VisitEventInput (every field optional on the wire)                    │
//! │       │                                                                 │
//! │       ▼  TryFrom ── missing/malformed field ──► VALIDATION_ERROR       │
//! │  VisitEvent              (no storage touched yet)                      │
//! │       │                                                                 │
//! │       ▼  Reconciler::reconcile_visit  (ONE transaction, NOT retried)   │
//! │  ┌──────────────────────────────────────────────────────────┐          │
//! │  │ claim key → line item → aggregate → visited → log → bal  │          │
//! │  └──────────────────────────────────────────────────────────┘          │
//! │       │                                                                 │
//! │       ├── committed ──► VisitOutcome { replayed: false }               │
//! │       ├── key seen  ──► VisitOutcome { replayed: true } (no writes)    │
//! │       └── failed    ──► rolled back ──► ApiError                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A client that gets `CONFLICT` or `STORAGE_ERROR` resends the same event
//! with the same `idempotency_key`. Without a key, a resend of an event whose
//! first attempt actually committed is counted twice.

use reparto_core::validation::{parse_business_date, validate_code};
use reparto_core::{VisitCorrection, VisitCorrectionInput, VisitEvent, VisitEventInput, VisitOutcome};
use reparto_db::{with_retry, CorrectionOutcome, DedupScope};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Optional scope for log de-duplication.
///
/// All three fields, or none (whole log).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DedupRequest {
    pub agent_code: Option<i64>,
    pub zone_code: Option<i64>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DedupResponse {
    /// Superseded log rows deleted.
    pub removed: u64,
}

/// Reconciles one visit.
pub async fn reconcile_visit(
    state: &AppState,
    input: VisitEventInput,
) -> Result<VisitOutcome, ApiError> {
    let event = VisitEvent::try_from(input)?;
    debug!(
        customer_code = event.customer_code,
        product = %event.product,
        keyed = event.idempotency_key.is_some(),
        "reconcile_visit called"
    );

    let outcome = state.db().reconciler().reconcile_visit(&event).await?;
    Ok(outcome)
}

/// Replaces the figures of the latest logged visit for the key.
pub async fn correct_visit(
    state: &AppState,
    input: VisitCorrectionInput,
) -> Result<CorrectionOutcome, ApiError> {
    let correction = VisitCorrection::try_from(input)?;
    debug!(
        customer_code = correction.customer_code,
        product = %correction.product,
        visit_date = %correction.visit_date,
        "correct_visit called"
    );

    let outcome = state.db().reconciler().correct_visit(&correction).await?;
    Ok(outcome)
}

/// Deletes every log row superseded by a later one for the same
/// (agent, customer, product, date).
pub async fn dedup_visit_log(
    state: &AppState,
    req: DedupRequest,
) -> Result<DedupResponse, ApiError> {
    let scope = dedup_scope(req)?;
    debug!(?scope, "dedup_visit_log called");

    let db = state.db();
    let removed = with_retry(state.retry(), "dedup_visit_log", || async move {
        db.visit_log().dedup(scope).await
    })
    .await?;

    info!(removed, scoped = scope.is_some(), "Visit log de-duplicated");
    Ok(DedupResponse { removed })
}

fn dedup_scope(req: DedupRequest) -> Result<Option<DedupScope>, ApiError> {
    match (req.agent_code, req.zone_code, req.date) {
        (None, None, None) => Ok(None),
        (Some(agent_code), Some(zone_code), Some(date)) => Ok(Some(DedupScope {
            agent_code: validate_code(agent_code, "agent_code")?,
            zone_code: validate_code(zone_code, "zone_code")?,
            visit_date: parse_business_date(&date, "date")?,
        })),
        _ => Err(ApiError::validation(
            "agent_code, zone_code and date must be given together",
        )),
    }
}
