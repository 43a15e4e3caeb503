//! # Retry Executor
//!
//! Runs an idempotent storage operation under a [`RetryPolicy`], sleeping
//! with exponential backoff between attempts.
//!
//! ```text
//! op() ──► Ok ─────────────────────────────────────────► Ok
//!   │
//!   └──► Err ── retryable? ── no ───────────────────────► Err
//!                  │
//!                  yes ── attempts left? ── no ─────────► Err
//!                              │
//!                              yes ── sleep(next_backoff) ──► op()
//! ```
//!
//! Only hand this single statements or reads. The reconciliation and
//! correction transactions are never passed through here.

use std::future::Future;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reparto_core::retry::RetryPolicy;
use tracing::{debug, warn};

use crate::error::DbResult;

fn create_backoff(policy: &RetryPolicy) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: policy.initial_backoff(),
        max_interval: policy.max_backoff(),
        multiplier: policy.multiplier,
        randomization_factor: 0.0,
        max_elapsed_time: None, // bounded by max_attempts instead
        ..Default::default()
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts.
///
/// ## Example
/// ```rust,ignore
/// let zones = with_retry(&policy, "zones_for_agent", || db.agents().zones_for_agent(2)).await?;
/// ```
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let mut backoff = create_backoff(policy);
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(op = op_name, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && policy.allows_retry(attempt) => {
                let Some(wait) = backoff.next_backoff() else {
                    return Err(err);
                };
                warn!(op = op_name, attempt, ?wait, error = %err, "Retrying after transient error");
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_retryable() {
                    warn!(op = op_name, attempt, error = %err, "Retries exhausted");
                }
                return Err(err);
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
