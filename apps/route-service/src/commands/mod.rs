//! # Route Commands
//!
//! Every operation the route client can invoke.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── auth.rs     ◄─── Agent login
//! ├── route.rs    ◄─── Zones, pending customers, customer line items
//! ├── visit.rs    ◄─── Reconcile / correct a visit, log de-duplication
//! ├── stock.rs    ◄─── Stock levels and rollforward
//! ├── expense.rs  ◄─── Expense categories and expenses
//! ├── report.rs   ◄─── Day results, day movements, monthly summary, prices
//! ├── intake.rs   ◄─── New-customer intake
//! └── truck.rs    ◄─── Truck load/unload movements
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  {"command":"pending_customers","args":{"zone_code":7}}                │
//! │         │                                                               │
//! │         │ (dispatch.rs: serde picks the variant)                        │
//! │         ▼                                                               │
//! │  pub async fn pending_customers(                                        │
//! │      state: &AppState,                ◄── shared, cheap to clone       │
//! │      req: PendingCustomersRequest,    ◄── typed args                   │
//! │  ) -> Result<Vec<Customer>, ApiError>                                   │
//! │         │                                                               │
//! │         │ (JSON serialization)                                          │
//! │         ▼                                                               │
//! │  {"success":true,"data":[...]}                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retries
//! Reads and single-statement writes go through
//! [`reparto_db::with_retry`]. The visit reconciliation and correction
//! transactions never do: a client retries those with the same idempotency
//! key.

pub mod auth;
pub mod expense;
pub mod intake;
pub mod report;
pub mod route;
pub mod stock;
pub mod truck;
pub mod visit;
