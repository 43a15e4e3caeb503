//! # JSON-Lines Dispatcher
//!
//! One request per line in, one envelope per line out.
//!
//! ## Wire Format
//! ```text
//! → {"id": 7, "command": "pending_customers", "args": {"zone_code": 7}}
//! ← {"id":7,"success":true,"data":[{"customer_code":7001, ...}]}
//!
//! → {"command": "reconcile_visit", "args": {"customer_code": 42}}
//! ← {"success":false,"error":{"code":"VALIDATION_ERROR","message":"product is required"}}
//! ```
//!
//! `id` is optional and echoed back untouched so a client can pipeline
//! requests. Commands without arguments may omit `args`.
//!
//! ## Request Lifecycle
//! ```text
//! line ──► JSON? ──no──► VALIDATION_ERROR
//!            │
//!            ▼
//!        Command? ──no──► VALIDATION_ERROR (unknown command / bad args)
//!            │
//!            ▼
//!        commands::* ──► Result<T, ApiError> ──► ApiResponse ──► line
//! ```

use reparto_core::{VisitCorrectionInput, VisitEventInput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::commands::auth::LoginRequest;
use crate::commands::expense::{AgentExpensesRequest, ExpenseInput};
use crate::commands::intake::{IntakeInput, ZoneIntakeRequest};
use crate::commands::report::{DayReportRequest, MonthlySummaryRequest, SetPriceRequest};
use crate::commands::route::{CustomerMovementsRequest, ZoneRequest, ZonesRequest};
use crate::commands::stock::{RollforwardRequest, StockDateRequest, StockLevelInput};
use crate::commands::truck::{TruckMovementInput, TruckMovementsRequest};
use crate::commands::visit::DedupRequest;
use crate::commands::{auth, expense, intake, report, route, stock, truck, visit};
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Commands
// =============================================================================

/// Every command the route client can send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum Command {
    // Auth & route
    Login(LoginRequest),
    ListZones(ZonesRequest),
    PendingCustomers(ZoneRequest),
    CustomerMovements(CustomerMovementsRequest),
    StartRouteDay(ZoneRequest),

    // Visits
    ReconcileVisit(VisitEventInput),
    CorrectVisit(VisitCorrectionInput),
    DedupVisitLog(DedupRequest),

    // Stock
    RollforwardStock(RollforwardRequest),
    RecordStockLevel(StockLevelInput),
    GetStockLevel(StockDateRequest),

    // Expenses
    ListExpenseCategories,
    RecordExpense(ExpenseInput),
    ListExpenses(AgentExpensesRequest),

    // Reports & prices
    DayResults(DayReportRequest),
    DayMovements(DayReportRequest),
    MonthlySummary(MonthlySummaryRequest),
    ListPrices,
    SetPrice(SetPriceRequest),

    // Intake & trucks
    RegisterIntake(IntakeInput),
    ListIntake(ZoneIntakeRequest),
    RecordTruckMovement(TruckMovementInput),
    ListTruckMovements(TruckMovementsRequest),

    Health,
}

// =============================================================================
// Response Envelope
// =============================================================================

/// What the client receives for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        ApiResponse {
            id: None,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: ApiError) -> Self {
        ApiResponse {
            id: None,
            success: false,
            data: None,
            error: Some(error),
        }
    }

    fn with_id(mut self, id: Option<Value>) -> Self {
        self.id = id;
        self
    }
}

impl From<Result<Value, ApiError>> for ApiResponse {
    fn from(result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(error) => ApiResponse::err(error),
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Handles one request line.
pub async fn dispatch(state: &AppState, line: &str) -> ApiResponse {
    let mut request: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Request is not valid JSON");
            return ApiResponse::err(ApiError::validation(format!("Invalid JSON: {}", e)));
        }
    };

    let id = request.as_object_mut().and_then(|obj| obj.remove("id"));
    let name = request
        .get("command")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();

    let command: Command = match serde_json::from_value(request) {
        Ok(command) => command,
        Err(e) => {
            debug!(command = %name, error = %e, "Request rejected");
            return ApiResponse::err(ApiError::validation(format!("Invalid request: {}", e)))
                .with_id(id);
        }
    };

    let span = info_span!("command", request_id = %Uuid::new_v4(), command = %name);
    let result = execute(state, command).instrument(span).await;
    if let Err(ref e) = result {
        debug!(command = %name, code = ?e.code, "Command failed");
    }

    ApiResponse::from(result).with_id(id)
}

/// Runs a parsed command and serializes its result.
pub async fn execute(state: &AppState, command: Command) -> Result<Value, ApiError> {
    match command {
        Command::Login(req) => to_data(auth::login(state, req).await?),
        Command::ListZones(req) => to_data(route::list_zones(state, req).await?),
        Command::PendingCustomers(req) => to_data(route::pending_customers(state, req).await?),
        Command::CustomerMovements(req) => to_data(route::customer_movements(state, req).await?),
        Command::StartRouteDay(req) => to_data(route::start_route_day(state, req).await?),

        Command::ReconcileVisit(input) => to_data(visit::reconcile_visit(state, input).await?),
        Command::CorrectVisit(input) => to_data(visit::correct_visit(state, input).await?),
        Command::DedupVisitLog(req) => to_data(visit::dedup_visit_log(state, req).await?),

        Command::RollforwardStock(req) => to_data(stock::rollforward_stock(state, req).await?),
        Command::RecordStockLevel(input) => to_data(stock::record_stock_level(state, input).await?),
        Command::GetStockLevel(req) => to_data(stock::get_stock_level(state, req).await?),

        Command::ListExpenseCategories => to_data(expense::list_expense_categories(state).await?),
        Command::RecordExpense(input) => to_data(expense::record_expense(state, input).await?),
        Command::ListExpenses(req) => to_data(expense::list_expenses(state, req).await?),

        Command::DayResults(req) => to_data(report::day_results(state, req).await?),
        Command::DayMovements(req) => to_data(report::day_movements(state, req).await?),
        Command::MonthlySummary(req) => to_data(report::monthly_summary(state, req).await?),
        Command::ListPrices => to_data(report::list_prices(state).await?),
        Command::SetPrice(req) => to_data(report::set_price(state, req).await?),

        Command::RegisterIntake(input) => to_data(intake::register_intake(state, input).await?),
        Command::ListIntake(req) => to_data(intake::list_intake(state, req).await?),
        Command::RecordTruckMovement(input) => {
            to_data(truck::record_truck_movement(state, input).await?)
        }
        Command::ListTruckMovements(req) => to_data(truck::list_truck_movements(state, req).await?),

        Command::Health => to_data(serde_json::json!({ "database": state.db().health_check().await })),
    }
}

fn to_data<T: Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!("Failed to serialize response: {}", e);
        ApiError::internal("Failed to serialize response")
    })
}

// =============================================================================
// Serve Loop
// =============================================================================

/// Reads requests from `reader` until EOF, writing one envelope per line.
///
/// Requests on one stream are handled in order. Run several streams (or
/// several processes on the same database) for concurrent agents.
pub async fn serve<R, W>(state: &AppState, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = dispatch(state, &line).await;
        let mut out = match serde_json::to_string(&response) {
            Ok(out) => out,
            Err(e) => {
                warn!(error = %e, "Failed to encode response envelope");
                r#"{"success":false,"error":{"code":"INTERNAL","message":"Failed to encode response"}}"#
                    .to_string()
            }
        };
        out.push('\n');

        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
        handled += 1;
    }

    info!(handled, "Input closed, stopping");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_parsing() {
        let command: Command = serde_json::from_value(json!({
            "command": "pending_customers",
            "args": { "zone_code": 7 }
        }))
        .unwrap();
        assert!(matches!(command, Command::PendingCustomers(ZoneRequest { zone_code: 7 })));

        let command: Command =
            serde_json::from_value(json!({ "command": "list_prices" })).unwrap();
        assert!(matches!(command, Command::ListPrices));
    }

    #[test]
    fn test_visit_args_may_be_incomplete_on_the_wire() {
        // Missing fields are reported by validation, not by serde.
        let command: Command = serde_json::from_value(json!({
            "command": "reconcile_visit",
            "args": { "customer_code": 42 }
        }))
        .unwrap();
        assert!(matches!(command, Command::ReconcileVisit(input) if input.product.is_none()));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let parsed: Result<Command, _> =
            serde_json::from_value(json!({ "command": "drop_tables", "args": {} }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(ApiResponse::ok(json!([1, 2]))).unwrap();
        assert_eq!(ok, json!({ "success": true, "data": [1, 2] }));

        let err = serde_json::to_value(
            ApiResponse::err(ApiError::validation("date is required")).with_id(Some(json!(3))),
        )
        .unwrap();
        assert_eq!(
            err,
            json!({
                "id": 3,
                "success": false,
                "error": { "code": "VALIDATION_ERROR", "message": "date is required" }
            })
        );
    }
}
