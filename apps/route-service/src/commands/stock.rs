//! # Stock Commands
//!
//! Warehouse stock counts and the end-of-day rollforward.
//!
//! ```text
//! caps(date) = caps(latest row before date) − units sold on date
//!              (agent, zone aggregate)
//! ```
//!
//! Each (date, agent, zone) is applied once. A second zone on the same date
//! subtracts its sales from the existing row; resending an applied scope
//! returns the row with `applied: false`, so a client may safely resend it.

use reparto_core::validation::{parse_business_date, validate_code};
use reparto_core::{StockLevel, StockRollforward};
use reparto_db::with_retry;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct RollforwardRequest {
    pub date: String,
    pub agent_code: i64,
    pub zone_code: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockDateRequest {
    pub date: String,
}

/// A counted stock level, as entered on restock day.
#[derive(Debug, Clone, Deserialize)]
pub struct StockLevelInput {
    pub date: String,
    pub caps: i64,
    pub bottles_a4: i64,
    pub bottles_a3: i64,
    pub bases: i64,
}

pub async fn rollforward_stock(
    state: &AppState,
    req: RollforwardRequest,
) -> Result<StockRollforward, ApiError> {
    let date = parse_business_date(&req.date, "date")?;
    let agent_code = validate_code(req.agent_code, "agent_code")?;
    let zone_code = validate_code(req.zone_code, "zone_code")?;
    debug!(%date, agent_code, zone_code, "rollforward_stock called");

    // One transaction; never retried here.
    let rolled = state
        .db()
        .stock()
        .rollforward(date, agent_code, zone_code)
        .await?;

    Ok(rolled)
}

pub async fn record_stock_level(
    state: &AppState,
    input: StockLevelInput,
) -> Result<StockLevel, ApiError> {
    let level = StockLevel {
        stock_date: parse_business_date(&input.date, "date")?,
        caps: input.caps,
        bottles_a4: input.bottles_a4,
        bottles_a3: input.bottles_a3,
        bases: input.bases,
    };
    debug!(stock_date = %level.stock_date, "record_stock_level called");

    let db = state.db();
    let level = &level;
    let stored = with_retry(state.retry(), "insert_stock_level", || async move {
        db.stock().insert_level(level).await
    })
    .await?;

    Ok(stored)
}

pub async fn get_stock_level(
    state: &AppState,
    req: StockDateRequest,
) -> Result<StockLevel, ApiError> {
    let date = parse_business_date(&req.date, "date")?;

    let db = state.db();
    with_retry(state.retry(), "get_stock_level", || async move {
        db.stock().get(date).await
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Stock level", &date.to_string()))
}
