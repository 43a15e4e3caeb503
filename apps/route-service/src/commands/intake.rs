//! # New-Customer Intake Commands
//!
//! Prospects the agent signs up on the route. They are stored as-is and
//! turned into customers by the office; nothing here touches balances.

use reparto_core::validation::{parse_product, validate_code};
use reparto_core::{CustomerIntake, NewCustomerIntake};
use reparto_db::with_retry;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct IntakeInput {
    pub business_name: String,
    pub locality: Option<String>,
    pub phone: Option<String>,
    pub bottle_product: String,
    pub quantity: i64,
    pub zone_code: i64,
    pub route_sequence: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneIntakeRequest {
    pub zone_code: i64,
}

pub async fn register_intake(
    state: &AppState,
    input: IntakeInput,
) -> Result<CustomerIntake, ApiError> {
    let intake = NewCustomerIntake {
        business_name: input.business_name,
        locality: blank_to_none(input.locality),
        phone: blank_to_none(input.phone),
        bottle_product: parse_product(&input.bottle_product)?,
        quantity: input.quantity,
        zone_code: input.zone_code,
        route_sequence: input.route_sequence,
    };
    debug!(zone_code = intake.zone_code, "register_intake called");

    let db = state.db();
    let intake = &intake;
    let created = with_retry(state.retry(), "register_intake", || async move {
        db.intake().create(intake).await
    })
    .await?;

    Ok(created)
}

pub async fn list_intake(
    state: &AppState,
    req: ZoneIntakeRequest,
) -> Result<Vec<CustomerIntake>, ApiError> {
    let zone_code = validate_code(req.zone_code, "zone_code")?;

    let db = state.db();
    let intakes = with_retry(state.retry(), "list_intake", || async move {
        db.intake().list_for_zone(zone_code).await
    })
    .await?;

    Ok(intakes)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
