//! # Ledger Repository
//!
//! Customers (the route-sheet header) and their per-product visit line
//! items.
//!
//! ## Tables
//! ```text
//! customers                          visit_line_items
//! ┌───────────────┬────────────┐     ┌───────────────┬─────────┬────────────┐
//! │ customer_code │ balance_a3 │◄────│ customer_code │ product │ units_sold │
//! │ zone_code     │ balance_a4 │     │ agent_code    │         │ cash/ccte  │
//! │ visited       │ route_seq  │     └───────────────┴─────────┴────────────┘
//! └───────────────┴────────────┘       UNIQUE(customer_code, product)
//! ```
//!
//! The balance lives only on the customer row. Line items are joined to it
//! when read.
//!
//! Methods ending in `_tx` run on a caller-owned transaction connection and
//! are used by the reconciliation transaction.

use reparto_core::settlement::SettlementAmounts;
use reparto_core::validation::{validate_code, validate_new_customer};
use reparto_core::{Customer, CustomerMovement, NewCustomer, ProductCode, VisitLineItem};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

const CUSTOMER_COLUMNS: &str = "customer_code, name, address, locality, phone, zone_code, \
     route_sequence, visited, balance_a3, balance_a4";

/// Column holding the outstanding balance for `product`.
pub(crate) fn balance_column(product: ProductCode) -> &'static str {
    match product {
        ProductCode::A3 => "balance_a3",
        ProductCode::A4 => "balance_a4",
    }
}

/// Repository for customers and visit line items.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Adds a customer to a route sheet.
    pub async fn create_customer(&self, customer: &NewCustomer) -> DbResult<Customer> {
        validate_new_customer(customer)?;

        sqlx::query(
            "INSERT INTO customers
                (customer_code, name, address, locality, phone, zone_code,
                 route_sequence, visited, balance_a3, balance_a4)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
        )
        .bind(customer.customer_code)
        .bind(customer.name.trim())
        .bind(&customer.address)
        .bind(&customer.locality)
        .bind(&customer.phone)
        .bind(customer.zone_code)
        .bind(customer.route_sequence)
        .bind(customer.balance_a3)
        .bind(customer.balance_a4)
        .execute(&self.pool)
        .await?;

        info!(customer_code = customer.customer_code, zone_code = customer.zone_code, "Customer created");

        self.get_customer(customer.customer_code)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer.customer_code.to_string()))
    }

    pub async fn get_customer(&self, customer_code: i64) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE customer_code = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(customer_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Customers in a zone not yet visited, in delivery order.
    pub async fn pending_customers(&self, zone_code: i64) -> DbResult<Vec<Customer>> {
        validate_code(zone_code, "zone_code")?;
        debug!(zone_code, "Listing pending customers");

        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             WHERE zone_code = ?1 AND visited = 0
             ORDER BY route_sequence, customer_code"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(zone_code)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = customers.len(), "Pending customers");
        Ok(customers)
    }

    /// Clears the visited flag for every customer in a zone (start of a route day).
    pub async fn reset_zone_visits(&self, zone_code: i64) -> DbResult<u64> {
        let result = sqlx::query("UPDATE customers SET visited = 0 WHERE zone_code = ?1")
            .bind(zone_code)
            .execute(&self.pool)
            .await?;

        info!(zone_code, customers = result.rows_affected(), "Zone visits reset");
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// Puts a zeroed line item on the sheet for (customer, product).
    ///
    /// Re-provisioning an existing line resets its figures and reassigns it.
    pub async fn provision_line_item(
        &self,
        customer_code: i64,
        product: ProductCode,
        agent_code: i64,
        zone_code: i64,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO visit_line_items
                (customer_code, product, agent_code, zone_code,
                 units_sold, cash_collected, on_account_collected)
             VALUES (?1, ?2, ?3, ?4, 0, 0, 0)
             ON CONFLICT(customer_code, product) DO UPDATE SET
                agent_code = excluded.agent_code,
                zone_code = excluded.zone_code,
                units_sold = 0,
                cash_collected = 0,
                on_account_collected = 0",
        )
        .bind(customer_code)
        .bind(product)
        .bind(agent_code)
        .bind(zone_code)
        .execute(&self.pool)
        .await?;

        debug!(customer_code, %product, agent_code, zone_code, "Line item provisioned");
        Ok(())
    }

    pub async fn get_line_item(
        &self,
        customer_code: i64,
        product: ProductCode,
    ) -> DbResult<Option<VisitLineItem>> {
        let item = sqlx::query_as::<_, VisitLineItem>(
            "SELECT customer_code, product, agent_code, zone_code,
                    units_sold, cash_collected, on_account_collected
             FROM visit_line_items
             WHERE customer_code = ?1 AND product = ?2",
        )
        .bind(customer_code)
        .bind(product)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Current line items for a customer on an agent's zone, each with the
    /// authoritative balance from the customer header.
    pub async fn customer_movements(
        &self,
        customer_code: i64,
        agent_code: i64,
        zone_code: i64,
    ) -> DbResult<Vec<CustomerMovement>> {
        debug!(customer_code, agent_code, zone_code, "Loading customer movements");

        let movements = sqlx::query_as::<_, CustomerMovement>(
            "SELECT l.customer_code, l.product, l.units_sold, l.cash_collected,
                    l.on_account_collected,
                    CASE l.product WHEN 'A4' THEN c.balance_a4 ELSE c.balance_a3 END AS balance
             FROM visit_line_items l
             JOIN customers c ON c.customer_code = l.customer_code
             WHERE l.customer_code = ?1 AND l.agent_code = ?2 AND l.zone_code = ?3
             ORDER BY l.product",
        )
        .bind(customer_code)
        .bind(agent_code)
        .bind(zone_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    // =========================================================================
    // Transaction Helpers
    // =========================================================================

    /// Overwrites a line item's figures. Returns false if no line exists.
    pub(crate) async fn overwrite_line_item_tx(
        conn: &mut SqliteConnection,
        customer_code: i64,
        product: ProductCode,
        amounts: &SettlementAmounts,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE visit_line_items
             SET units_sold = ?1, cash_collected = ?2, on_account_collected = ?3
             WHERE customer_code = ?4 AND product = ?5",
        )
        .bind(amounts.units_sold)
        .bind(amounts.cash_collected)
        .bind(amounts.on_account_collected)
        .bind(customer_code)
        .bind(product)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn mark_visited_tx(
        conn: &mut SqliteConnection,
        customer_code: i64,
    ) -> DbResult<()> {
        sqlx::query("UPDATE customers SET visited = 1 WHERE customer_code = ?1")
            .bind(customer_code)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Reads `(balance, route_sequence)` for one product from the header.
    pub(crate) async fn header_balance_tx(
        conn: &mut SqliteConnection,
        customer_code: i64,
        product: ProductCode,
    ) -> DbResult<(i64, i64)> {
        let sql = format!(
            "SELECT {}, route_sequence FROM customers WHERE customer_code = ?1",
            balance_column(product)
        );
        let row: Option<(i64, i64)> = sqlx::query_as(&sql)
            .bind(customer_code)
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| DbError::not_found("Customer", customer_code.to_string()))
    }

    pub(crate) async fn set_balance_tx(
        conn: &mut SqliteConnection,
        customer_code: i64,
        product: ProductCode,
        balance: i64,
    ) -> DbResult<()> {
        let sql = format!(
            "UPDATE customers SET {} = ?1 WHERE customer_code = ?2",
            balance_column(product)
        );
        sqlx::query(&sql)
            .bind(balance)
            .bind(customer_code)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    pub(crate) fn new_customer(code: i64, zone: i64, seq: i64) -> NewCustomer {
        NewCustomer {
            customer_code: code,
            name: format!("Cliente {code}"),
            address: Some("San Martin 120".to_string()),
            locality: Some("Rafaela".to_string()),
            phone: None,
            zone_code: zone,
            route_sequence: seq,
            balance_a3: 0,
            balance_a4: 0,
        }
    }

    #[tokio::test]
    async fn test_pending_customers_in_route_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.ledger();

        ledger.create_customer(&new_customer(30, 7, 3)).await.unwrap();
        ledger.create_customer(&new_customer(10, 7, 1)).await.unwrap();
        ledger.create_customer(&new_customer(20, 7, 2)).await.unwrap();
        ledger.create_customer(&new_customer(40, 8, 1)).await.unwrap();

        let pending = ledger.pending_customers(7).await.unwrap();
        let codes: Vec<i64> = pending.iter().map(|c| c.customer_code).collect();
        assert_eq!(codes, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_movements_read_header_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.ledger();

        let mut customer = new_customer(42, 7, 1);
        customer.balance_a4 = 10;
        customer.balance_a3 = 3;
        ledger.create_customer(&customer).await.unwrap();
        ledger.provision_line_item(42, ProductCode::A4, 1, 7).await.unwrap();
        ledger.provision_line_item(42, ProductCode::A3, 1, 7).await.unwrap();

        let movements = ledger.customer_movements(42, 1, 7).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].product, ProductCode::A3);
        assert_eq!(movements[0].balance, 3);
        assert_eq!(movements[1].balance, 10);

        assert!(ledger.customer_movements(42, 2, 7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reprovision_resets_line() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.ledger();
        ledger.create_customer(&new_customer(42, 7, 1)).await.unwrap();
        ledger.provision_line_item(42, ProductCode::A4, 1, 7).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let updated = LedgerRepository::overwrite_line_item_tx(
            &mut conn,
            42,
            ProductCode::A4,
            &SettlementAmounts::new(5, 3, 2),
        )
        .await
        .unwrap();
        assert!(updated);
        drop(conn);

        ledger.provision_line_item(42, ProductCode::A4, 2, 7).await.unwrap();
        let item = ledger.get_line_item(42, ProductCode::A4).await.unwrap().unwrap();
        assert_eq!(item.units_sold, 0);
        assert_eq!(item.agent_code, 2);
    }
}
