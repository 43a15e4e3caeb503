//! # reparto-core: Pure Settlement Logic for Reparto
//!
//! This crate holds every rule of the daily settlement workflow as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Reparto Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Route client (agent's phone)                    │   │
//! │  │    Login ──► Zones ──► Customers ──► Visit ──► Day results      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON commands                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    route-service commands                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ reparto-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌────────────┐ ┌─────────┐ ┌──────────────────┐ │   │
//! │  │   │  types   │ │ settlement │ │  dedup  │ │ visit/validation │ │   │
//! │  │   │ Customer │ │ balances   │ │ latest  │ │ input → event    │ │   │
//! │  │   │ LogEntry │ │ aggregates │ │ per key │ │                  │ │   │
//! │  │   └──────────┘ └────────────┘ └─────────┘ └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 reparto-db (Database Layer)                     │   │
//! │  │     SQLite queries, migrations, the reconciliation transaction  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Customer, VisitLogEntry, DailySettlement, ...)
//! - [`visit`] - Visit events and corrections, built from raw client input
//! - [`settlement`] - Balance recurrence and aggregate folding
//! - [`dedup`] - Visit log de-duplication (latest entry per key wins)
//! - [`report`] - Read-side projections (day results, monthly summary)
//! - [`money`] - Integer money used to price unit counts
//! - [`retry`] - Retry policy for idempotent storage operations
//! - [`validation`] - Field-level input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use reparto_core::settlement::{next_balance, SettlementAmounts};
//!
//! // Customer owes 10 bottles; sells 5, collects 3 cash and 2 on account
//! let amounts = SettlementAmounts::new(5, 3, 2);
//! assert_eq!(next_balance(10, &amounts).unwrap(), 10);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dedup;
pub mod error;
pub mod money;
pub mod report;
pub mod retry;
pub mod settlement;
pub mod types;
pub mod validation;
pub mod visit;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use visit::{VisitCorrection, VisitCorrectionInput, VisitEvent, VisitEventInput};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Wire format for business dates (`2025-04-14`).
pub const BUSINESS_DATE_FORMAT: &str = "%Y-%m-%d";

/// Maximum length of the free-text reason attached to a visit.
pub const MAX_REASON_LEN: usize = 200;

/// Maximum length of a client-generated idempotency key.
///
/// UUIDs (36 chars) and ULIDs (26 chars) both fit.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 64;

/// Maximum length of names (agents, customers, expense categories).
pub const MAX_NAME_LEN: usize = 120;
