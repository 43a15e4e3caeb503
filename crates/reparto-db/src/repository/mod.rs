//! # Repository Module
//!
//! Database repository implementations for Reparto.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  route-service command                                                 │
//! │       │                                                                 │
//! │       │  db.ledger().pending_customers(zone)                           │
//! │       ▼                                                                 │
//! │  LedgerRepository ── owns the SQL for customers + line items           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Repositories hold a pool clone and run single statements.             │
//! │  Multi-statement work goes through `Reconciler` or                     │
//! │  `StockRepository::rollforward`, which own their transactions and      │
//! │  call the `*_tx` helpers exposed here.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`AgentRepository`](agent::AgentRepository) - Credentials and zones
//! - [`LedgerRepository`](ledger::LedgerRepository) - Customers and line items
//! - [`SettlementRepository`](settlement::SettlementRepository) - Daily aggregates
//! - [`VisitLogRepository`](visit_log::VisitLogRepository) - Completion log
//! - [`StockRepository`](stock::StockRepository) - Stock levels
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Expenses
//! - [`PriceRepository`](price::PriceRepository) - Price list
//! - [`IntakeRepository`](intake::IntakeRepository) - New-customer intake
//! - [`TruckRepository`](truck::TruckRepository) - Truck loads/unloads
//! - [`ReportRepository`](report::ReportRepository) - Read-only reports

pub mod agent;
pub mod expense;
pub mod intake;
pub mod ledger;
pub mod price;
pub mod report;
pub mod settlement;
pub mod stock;
pub mod truck;
pub mod visit_log;
