//! # Expense Commands

use reparto_core::validation::{parse_business_date, validate_code};
use reparto_core::{Expense, ExpenseCategory, NewExpense};
use reparto_db::with_retry;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    pub agent_code: i64,
    pub date: String,
    pub category_code: i64,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentExpensesRequest {
    pub agent_code: i64,
}

pub async fn list_expense_categories(state: &AppState) -> Result<Vec<ExpenseCategory>, ApiError> {
    let db = state.db();
    let categories = with_retry(state.retry(), "expense_categories", || async move {
        db.expenses().categories().await
    })
    .await?;

    Ok(categories)
}

/// Records an expense. An unknown category is rejected as an invalid
/// reference.
pub async fn record_expense(state: &AppState, input: ExpenseInput) -> Result<Expense, ApiError> {
    let expense = NewExpense {
        agent_code: input.agent_code,
        expense_date: parse_business_date(&input.date, "date")?,
        category_code: input.category_code,
        amount_cents: input.amount_cents,
    };
    debug!(agent_code = expense.agent_code, "record_expense called");

    let db = state.db();
    let expense = &expense;
    let stored = with_retry(state.retry(), "record_expense", || async move {
        db.expenses().record(expense).await
    })
    .await?;

    info!(expense_id = stored.id, amount_cents = stored.amount_cents, "Expense recorded");
    Ok(stored)
}

/// Newest first.
pub async fn list_expenses(
    state: &AppState,
    req: AgentExpensesRequest,
) -> Result<Vec<Expense>, ApiError> {
    let agent_code = validate_code(req.agent_code, "agent_code")?;

    let db = state.db();
    let expenses = with_retry(state.retry(), "list_expenses", || async move {
        db.expenses().list_for_agent(agent_code).await
    })
    .await?;

    Ok(expenses)
}
