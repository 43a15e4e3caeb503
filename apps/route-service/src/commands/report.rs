//! # Report Commands
//!
//! End-of-day and end-of-month views, plus the price list they use.
//!
//! ## Day Close
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  day_results(agent, zone, date)                                        │
//! │     stored aggregate  ══?══  sum of de-duplicated log                  │
//! │     in_balance: true when both agree                                   │
//! │                                                                         │
//! │  day_movements(agent, zone, date)                                      │
//! │     customers in route order, each with that day's log entries         │
//! │                                                                         │
//! │  monthly_summary(agent, year, month)                                   │
//! │     per (date, zone): units × price, split cash / on account           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All of these only read (apart from pruning superseded log rows, which is
//! idempotent), so every call goes through the retry executor.

use reparto_core::report::{CustomerDayMovements, DayResults, MonthlySummary};
use reparto_core::validation::{parse_business_date, parse_product, validate_code};
use reparto_core::ProductPrice;
use reparto_db::with_retry;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct DayReportRequest {
    pub agent_code: i64,
    pub zone_code: i64,
    pub date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthlySummaryRequest {
    pub agent_code: i64,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPriceRequest {
    pub product: String,
    pub price_cents: i64,
}

pub async fn day_results(state: &AppState, req: DayReportRequest) -> Result<DayResults, ApiError> {
    let (agent_code, zone_code, date) = day_scope(&req)?;
    debug!(agent_code, zone_code, %date, "day_results called");

    let db = state.db();
    let results = with_retry(state.retry(), "day_results", || async move {
        db.reports().day_results(agent_code, zone_code, date).await
    })
    .await?;

    if !results.in_balance {
        warn!(agent_code, zone_code, %date, "Settlement aggregate differs from visit log");
    }
    Ok(results)
}

pub async fn day_movements(
    state: &AppState,
    req: DayReportRequest,
) -> Result<Vec<CustomerDayMovements>, ApiError> {
    let (agent_code, zone_code, date) = day_scope(&req)?;
    debug!(agent_code, zone_code, %date, "day_movements called");

    let db = state.db();
    let grouped = with_retry(state.retry(), "day_movements", || async move {
        db.reports().day_movements(agent_code, zone_code, date).await
    })
    .await?;

    info!(customers = grouped.len(), "Day movements listed");
    Ok(grouped)
}

pub async fn monthly_summary(
    state: &AppState,
    req: MonthlySummaryRequest,
) -> Result<MonthlySummary, ApiError> {
    let agent_code = validate_code(req.agent_code, "agent_code")?;
    debug!(agent_code, year = req.year, month = req.month, "monthly_summary called");

    let db = state.db();
    let (year, month) = (req.year, req.month);
    let summary = with_retry(state.retry(), "monthly_summary", || async move {
        db.reports().monthly_summary(agent_code, year, month).await
    })
    .await?;

    Ok(summary)
}

pub async fn list_prices(state: &AppState) -> Result<Vec<ProductPrice>, ApiError> {
    let db = state.db();
    let prices = with_retry(state.retry(), "list_prices", || async move {
        db.prices().list().await
    })
    .await?;

    Ok(prices)
}

pub async fn set_price(state: &AppState, req: SetPriceRequest) -> Result<ProductPrice, ApiError> {
    let product = parse_product(&req.product)?;
    let price_cents = req.price_cents;

    let db = state.db();
    let price = with_retry(state.retry(), "set_price", || async move {
        db.prices().set_price(product, price_cents).await
    })
    .await?;

    Ok(price)
}

fn day_scope(req: &DayReportRequest) -> Result<(i64, i64, chrono::NaiveDate), ApiError> {
    Ok((
        validate_code(req.agent_code, "agent_code")?,
        validate_code(req.zone_code, "zone_code")?,
        parse_business_date(&req.date, "date")?,
    ))
}
