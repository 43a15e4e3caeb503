//! # Route Commands
//!
//! What the agent sees while working a zone: the zones they serve, the
//! customers still to visit in delivery order, and a customer's open line
//! items with the current balance.

use reparto_core::validation::validate_code;
use reparto_core::{Customer, CustomerMovement};
use reparto_db::with_retry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ZonesRequest {
    pub agent_code: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneRequest {
    pub zone_code: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerMovementsRequest {
    pub customer_code: i64,
    pub agent_code: i64,
    pub zone_code: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartRouteDayResponse {
    pub zone_code: i64,
    /// Customers whose visited flag was cleared.
    pub reset: u64,
}

pub async fn list_zones(state: &AppState, req: ZonesRequest) -> Result<Vec<i64>, ApiError> {
    debug!(agent_code = req.agent_code, "list_zones called");
    let agent_code = validate_code(req.agent_code, "agent_code")?;

    let db = state.db();
    let zones = with_retry(state.retry(), "zones_for_agent", || async move {
        db.agents().zones_for_agent(agent_code).await
    })
    .await?;

    Ok(zones)
}

/// Customers in the zone not yet visited, in route order.
pub async fn pending_customers(
    state: &AppState,
    req: ZoneRequest,
) -> Result<Vec<Customer>, ApiError> {
    debug!(zone_code = req.zone_code, "pending_customers called");
    let zone_code = validate_code(req.zone_code, "zone_code")?;

    let db = state.db();
    let customers = with_retry(state.retry(), "pending_customers", || async move {
        db.ledger().pending_customers(zone_code).await
    })
    .await?;

    info!(zone_code, count = customers.len(), "Pending customers listed");
    Ok(customers)
}

/// A customer's line items joined with the authoritative header balance.
///
/// An unknown customer is `NOT_FOUND` rather than an empty list.
pub async fn customer_movements(
    state: &AppState,
    req: CustomerMovementsRequest,
) -> Result<Vec<CustomerMovement>, ApiError> {
    debug!(customer_code = req.customer_code, "customer_movements called");
    let customer_code = validate_code(req.customer_code, "customer_code")?;
    let agent_code = validate_code(req.agent_code, "agent_code")?;
    let zone_code = validate_code(req.zone_code, "zone_code")?;

    let db = state.db();
    let customer = with_retry(state.retry(), "get_customer", || async move {
        db.ledger().get_customer(customer_code).await
    })
    .await?;
    if customer.is_none() {
        return Err(ApiError::not_found("Customer", &customer_code.to_string()));
    }

    let movements = with_retry(state.retry(), "customer_movements", || async move {
        db.ledger()
            .customer_movements(customer_code, agent_code, zone_code)
            .await
    })
    .await?;

    Ok(movements)
}

/// Clears the visited flag for every customer in the zone.
///
/// Run once at the start of a route day. Idempotent, so it is retried.
pub async fn start_route_day(
    state: &AppState,
    req: ZoneRequest,
) -> Result<StartRouteDayResponse, ApiError> {
    debug!(zone_code = req.zone_code, "start_route_day called");
    let zone_code = validate_code(req.zone_code, "zone_code")?;

    let db = state.db();
    let reset = with_retry(state.retry(), "reset_zone_visits", || async move {
        db.ledger().reset_zone_visits(zone_code).await
    })
    .await?;

    Ok(StartRouteDayResponse { zone_code, reset })
}
