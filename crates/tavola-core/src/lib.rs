//! # tavola-core: Pure Cash Desk Logic
//!
//! This crate holds the business rules of the Tavola cash desk as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tavola Cash Desk Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 tavola-desk (services + config)                 │   │
//! │  │  open_register, record_movement, summarize_register, audit     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tavola-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │reconcile  │  │   │
//! │  │   │ Register  │  │   Money   │  │ summarize │  │ Balanced  │  │   │
//! │  │   │ Movement  │  │  (cents)  │  │  policy   │  │ Surplus   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORE • NO CLOCK • PURE FUNCTIONS                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tavola-db (Document Store Layer)                │   │
//! │  │          MemoryStore, SqliteStore, typed repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CashRegister, CashMovement, CashAudit, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`ledger`] - Summary aggregation and the adjustment policy
//! - [`reconciliation`] - Counted vs expected classification, denominations
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashSet;
//! use chrono::Utc;
//! use tavola_core::ledger::{summarize, AdjustmentMode};
//! use tavola_core::{Actor, CashRegister, Money, MovementType, NewMovement, PaymentMethod, Scope};
//!
//! let actor = Actor::new("u1");
//! let mut register = CashRegister::open(
//!     &Scope::new("t1", "b1"),
//!     "Main",
//!     Money::from_cents(10_000),
//!     &actor,
//!     Utc::now(),
//!     None,
//! );
//! register.id = "reg-1".to_string();
//!
//! let movements = vec![
//!     NewMovement::new(MovementType::Sale, Money::from_cents(5_000), PaymentMethod::Cash, "Table 4")
//!         .into_movement("reg-1", &actor, Utc::now()),
//!     NewMovement::new(MovementType::Expense, Money::from_cents(2_000), PaymentMethod::Cash, "Ice")
//!         .into_movement("reg-1", &actor, Utc::now()),
//! ];
//!
//! let summary = summarize(&register, &movements, &HashSet::new(), &AdjustmentMode::default()).unwrap();
//! assert_eq!(summary.expected_balance.to_string(), "130.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod reconciliation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{AdjustmentMode, AdjustmentPolicy, CashRegisterSummary, LedgerEntry};
pub use money::Money;
pub use reconciliation::{reconcile, AuditStatus, Denominations, Reconciliation};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a register name.
pub const MAX_REGISTER_NAME_LEN: usize = 100;

/// Maximum length of a movement description or reference.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Maximum length of opening, closing or audit notes.
pub const MAX_NOTES_LEN: usize = 1_000;

/// Largest single amount accepted from an operator, in cents (1,000,000,000.00).
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;
