//! # reparto-db: Database Layer for Reparto
//!
//! Storage for route sheets, settlements, the visit log and stock, on
//! SQLite through sqlx. Every multi-statement write runs here, inside one
//! transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Reparto Data Flow                                │
//! │                                                                         │
//! │  route-service command (reconcile_visit)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    reparto-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌────────────────┐  ┌──────────────────┐  │   │
//! │  │   │   Database    │  │  Repositories  │  │    Reconciler    │  │   │
//! │  │   │   (pool.rs)   │  │  ledger, log,  │  │  visit + fix-up  │  │   │
//! │  │   │  SqlitePool   │◄─│  settlement,   │◄─│  transactions    │  │   │
//! │  │   │  WAL + busy   │  │  stock, ...    │  │                  │  │   │
//! │  │   └───────────────┘  └────────────────┘  └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   retry::with_retry ── single statements and reads only        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/route-service/reparto.db                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (ledger, visit log, ...)
//! - [`reconcile`] - Visit reconciliation and correction transactions
//! - [`retry`] - Backoff executor for idempotent operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reparto_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("reparto.db")).await?;
//!
//! let pending = db.ledger().pending_customers(7).await?;
//! let outcome = db.reconciler().reconcile_visit(&event).await?;
//! let day = db.reports().day_results(2, 7, date).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod reconcile;
pub mod repository;
pub mod retry;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use reconcile::{CorrectionOutcome, Reconciler};
pub use retry::with_retry;

// Repository re-exports for convenience
pub use repository::ledger::LedgerRepository;
pub use repository::report::ReportRepository;
pub use repository::visit_log::{DedupScope, VisitLogRepository};
