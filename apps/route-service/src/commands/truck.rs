//! # Truck Movement Commands
//!
//! Morning loads and evening unloads, per agent and product.

use reparto_core::validation::{parse_business_date, parse_product, validate_code};
use reparto_core::{NewTruckMovement, TruckMovement, TruckMovementKind};
use reparto_db::with_retry;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct TruckMovementInput {
    pub date: String,
    pub agent_code: i64,
    pub product: String,
    pub zone_code: i64,
    pub quantity: i64,
    pub kind: TruckMovementKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TruckMovementsRequest {
    pub agent_code: i64,
    pub date: String,
}

pub async fn record_truck_movement(
    state: &AppState,
    input: TruckMovementInput,
) -> Result<TruckMovement, ApiError> {
    let movement = NewTruckMovement {
        movement_date: parse_business_date(&input.date, "date")?,
        agent_code: input.agent_code,
        product: parse_product(&input.product)?,
        zone_code: input.zone_code,
        quantity: input.quantity,
        kind: input.kind,
    };
    debug!(agent_code = movement.agent_code, kind = ?movement.kind, "record_truck_movement called");

    let db = state.db();
    let movement = &movement;
    let stored = with_retry(state.retry(), "record_truck_movement", || async move {
        db.trucks().record(movement).await
    })
    .await?;

    info!(id = stored.id, quantity = stored.quantity, "Truck movement recorded");
    Ok(stored)
}

pub async fn list_truck_movements(
    state: &AppState,
    req: TruckMovementsRequest,
) -> Result<Vec<TruckMovement>, ApiError> {
    let agent_code = validate_code(req.agent_code, "agent_code")?;
    let date = parse_business_date(&req.date, "date")?;

    let db = state.db();
    let movements = with_retry(state.retry(), "list_truck_movements", || async move {
        db.trucks().list_for_agent_date(agent_code, date).await
    })
    .await?;

    Ok(movements)
}
