//! # Expense Repository
//!
//! Expense categories and the expenses agents record against them.

use reparto_core::validation::{validate_code, validate_new_expense, validate_name};
use reparto_core::{Expense, ExpenseCategory, NewExpense};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// All categories, by code.
    pub async fn categories(&self) -> DbResult<Vec<ExpenseCategory>> {
        let categories = sqlx::query_as::<_, ExpenseCategory>(
            "SELECT code, description FROM expense_categories ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn create_category(&self, code: i64, description: &str) -> DbResult<ExpenseCategory> {
        validate_code(code, "code")?;
        let description = validate_name(description, "description")?;

        sqlx::query("INSERT INTO expense_categories (code, description) VALUES (?1, ?2)")
            .bind(code)
            .bind(&description)
            .execute(&self.pool)
            .await?;

        info!(code, "Expense category created");
        Ok(ExpenseCategory { code, description })
    }

    /// Records an expense. Unknown agents or categories fail the foreign key.
    pub async fn record(&self, expense: &NewExpense) -> DbResult<Expense> {
        validate_new_expense(expense)?;

        let result = sqlx::query(
            "INSERT INTO expenses (agent_code, expense_date, category_code, amount_cents)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(expense.agent_code)
        .bind(expense.expense_date)
        .bind(expense.category_code)
        .bind(expense.amount_cents)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            id,
            agent_code = expense.agent_code,
            category_code = expense.category_code,
            amount_cents = expense.amount_cents,
            "Expense recorded"
        );

        Ok(Expense {
            id,
            agent_code: expense.agent_code,
            expense_date: expense.expense_date,
            category_code: expense.category_code,
            amount_cents: expense.amount_cents,
        })
    }

    /// An agent's expenses, newest date first.
    pub async fn list_for_agent(&self, agent_code: i64) -> DbResult<Vec<Expense>> {
        debug!(agent_code, "Listing expenses");

        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT id, agent_code, expense_date, category_code, amount_cents
             FROM expenses
             WHERE agent_code = ?1
             ORDER BY expense_date DESC, id DESC",
        )
        .bind(agent_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use chrono::NaiveDate;

    fn expense(category_code: i64, day: u32, cents: i64) -> NewExpense {
        NewExpense {
            agent_code: 1,
            expense_date: NaiveDate::from_ymd_opt(2025, 4, day).unwrap(),
            category_code,
            amount_cents: cents,
        }
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.agents().create(1, "ana", "x").await.unwrap();
        db.expenses().create_category(2, "Combustible").await.unwrap();
        db.expenses().create_category(1, "Peajes").await.unwrap();

        let codes: Vec<i64> = db
            .expenses()
            .categories()
            .await
            .unwrap()
            .iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec![1, 2]);

        db.expenses().record(&expense(2, 10, 4_500)).await.unwrap();
        db.expenses().record(&expense(1, 14, 800)).await.unwrap();

        let listed = db.expenses().list_for_agent(1).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].amount_cents, 800);
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.agents().create(1, "ana", "x").await.unwrap();

        let err = db.expenses().record(&expense(99, 10, 100)).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_before_insert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.expenses().record(&expense(1, 10, 0)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
    }
}
