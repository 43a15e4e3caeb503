//! # Intake Repository
//!
//! Prospective customers captured by agents on the route. Rows are only
//! inserted and listed; turning one into a customer is an office task.

use chrono::Utc;
use reparto_core::validation::validate_new_intake;
use reparto_core::{CustomerIntake, NewCustomerIntake};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct IntakeRepository {
    pool: SqlitePool,
}

impl IntakeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        IntakeRepository { pool }
    }

    pub async fn create(&self, intake: &NewCustomerIntake) -> DbResult<CustomerIntake> {
        validate_new_intake(intake)?;

        let created_at = Utc::now();
        let business_name = intake.business_name.trim().to_string();

        let result = sqlx::query(
            "INSERT INTO customer_intake
                (business_name, locality, phone, bottle_product, quantity,
                 zone_code, route_sequence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&business_name)
        .bind(&intake.locality)
        .bind(&intake.phone)
        .bind(intake.bottle_product)
        .bind(intake.quantity)
        .bind(intake.zone_code)
        .bind(intake.route_sequence)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(id, zone_code = intake.zone_code, "Customer intake recorded");

        Ok(CustomerIntake {
            id,
            business_name,
            locality: intake.locality.clone(),
            phone: intake.phone.clone(),
            bottle_product: intake.bottle_product,
            quantity: intake.quantity,
            zone_code: intake.zone_code,
            route_sequence: intake.route_sequence,
            created_at,
        })
    }

    /// Intake rows for a zone, oldest first.
    pub async fn list_for_zone(&self, zone_code: i64) -> DbResult<Vec<CustomerIntake>> {
        let rows = sqlx::query_as::<_, CustomerIntake>(
            "SELECT id, business_name, locality, phone, bottle_product, quantity,
                    zone_code, route_sequence, created_at
             FROM customer_intake
             WHERE zone_code = ?1
             ORDER BY id",
        )
        .bind(zone_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use reparto_core::ProductCode;

    fn prospect(name: &str, quantity: i64) -> NewCustomerIntake {
        NewCustomerIntake {
            business_name: name.to_string(),
            locality: Some("Sunchales".to_string()),
            phone: Some("3493-420000".to_string()),
            bottle_product: ProductCode::A4,
            quantity,
            zone_code: 7,
            route_sequence: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.intake().create(&prospect("  Almacen Norte ", 2)).await.unwrap();
        assert_eq!(created.business_name, "Almacen Norte");

        let rows = db.intake().list_for_zone(7).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, created.id);
        assert!(db.intake().list_for_zone(8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.intake().create(&prospect("Kiosco", 0)).await.is_err());
    }
}
