//! # Truck Repository
//!
//! Load/unload movements of bottles between warehouse and truck.

use chrono::NaiveDate;
use reparto_core::validation::validate_new_truck_movement;
use reparto_core::{NewTruckMovement, TruckMovement};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct TruckRepository {
    pool: SqlitePool,
}

impl TruckRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TruckRepository { pool }
    }

    pub async fn record(&self, movement: &NewTruckMovement) -> DbResult<TruckMovement> {
        validate_new_truck_movement(movement)?;

        let result = sqlx::query(
            "INSERT INTO truck_movements
                (movement_date, agent_code, product, zone_code, quantity, kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(movement.movement_date)
        .bind(movement.agent_code)
        .bind(movement.product)
        .bind(movement.zone_code)
        .bind(movement.quantity)
        .bind(movement.kind)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            id,
            agent_code = movement.agent_code,
            product = %movement.product,
            quantity = movement.quantity,
            kind = ?movement.kind,
            "Truck movement recorded"
        );

        Ok(TruckMovement {
            id,
            movement_date: movement.movement_date,
            agent_code: movement.agent_code,
            product: movement.product,
            zone_code: movement.zone_code,
            quantity: movement.quantity,
            kind: movement.kind,
        })
    }

    /// An agent's movements on one date, in the order recorded.
    pub async fn list_for_agent_date(
        &self,
        agent_code: i64,
        movement_date: NaiveDate,
    ) -> DbResult<Vec<TruckMovement>> {
        debug!(agent_code, %movement_date, "Listing truck movements");

        let rows = sqlx::query_as::<_, TruckMovement>(
            "SELECT id, movement_date, agent_code, product, zone_code, quantity, kind
             FROM truck_movements
             WHERE agent_code = ?1 AND movement_date = ?2
             ORDER BY id",
        )
        .bind(agent_code)
        .bind(movement_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
