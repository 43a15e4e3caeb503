//! # Price Repository
//!
//! Unit prices per product. Only reports read them; settlement amounts are
//! always unit counts.

use reparto_core::validation::validate_non_negative;
use reparto_core::{ProductCode, ProductPrice};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct PriceRepository {
    pool: SqlitePool,
}

impl PriceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PriceRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<ProductPrice>> {
        let prices = sqlx::query_as::<_, ProductPrice>(
            "SELECT product, price_cents FROM product_prices ORDER BY product",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(prices)
    }

    pub async fn get(&self, product: ProductCode) -> DbResult<Option<ProductPrice>> {
        let price = sqlx::query_as::<_, ProductPrice>(
            "SELECT product, price_cents FROM product_prices WHERE product = ?1",
        )
        .bind(product)
        .fetch_optional(&self.pool)
        .await?;

        Ok(price)
    }

    /// Sets (or replaces) a product's unit price.
    pub async fn set_price(&self, product: ProductCode, price_cents: i64) -> DbResult<ProductPrice> {
        validate_non_negative(price_cents, "price_cents")?;

        sqlx::query(
            "INSERT INTO product_prices (product, price_cents) VALUES (?1, ?2)
             ON CONFLICT(product) DO UPDATE SET price_cents = excluded.price_cents",
        )
        .bind(product)
        .bind(price_cents)
        .execute(&self.pool)
        .await?;

        info!(%product, price_cents, "Price updated");
        Ok(ProductPrice {
            product,
            price_cents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_set_price_replaces() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.prices().get(ProductCode::A4).await.unwrap().is_none());

        db.prices().set_price(ProductCode::A4, 1_200).await.unwrap();
        db.prices().set_price(ProductCode::A4, 1_350).await.unwrap();
        db.prices().set_price(ProductCode::A3, 900).await.unwrap();

        let prices = db.prices().list().await.unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].product, ProductCode::A3);
        assert_eq!(prices[1].price_cents, 1_350);
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.prices().set_price(ProductCode::A3, -1).await.is_err());
    }
}
