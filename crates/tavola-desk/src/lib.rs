//! # tavola-desk: Cash Desk Services
//!
//! The register lifecycle, movement recorder, summary service and audit
//! engine, wired to a document store, plus the ambient pieces
//! (configuration, logging, errors).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tavola Cash Desk Architecture                      │
//! │                                                                         │
//! │   Admin UI event handler (open, sell, count, close)                     │
//! │       │                                                                 │
//! │  ┌────▼────────────────────────────────────────────────────────────┐   │
//! │  │               ★ tavola-desk (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   CashDesk ─┬─ RegisterLifecycle   open / close / list          │   │
//! │  │             ├─ MovementRecorder    record / list                │   │
//! │  │             ├─ SummaryService      summarize_register           │   │
//! │  │             └─ AuditEngine         perform / list / latest      │   │
//! │  │                                                                 │   │
//! │  │   CashError ──► Notification (dismissable)                      │   │
//! │  └──────┬──────────────────────────────────────┬───────────────────┘   │
//! │         │                                      │                        │
//! │  ┌──────▼──────────────┐            ┌──────────▼───────────────────┐   │
//! │  │    tavola-core      │            │         tavola-db            │   │
//! │  │ summarize, reconcile│            │ DocumentStore, repositories  │   │
//! │  └─────────────────────┘            └──────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tavola_desk::{telemetry, CashDesk, DeskConfig, OpenRegister};
//!
//! telemetry::init_tracing();
//! let config = DeskConfig::load(None)?;
//! let desk = CashDesk::from_config(&config).await?;
//!
//! let register = desk
//!     .registers()
//!     .open_register(&scope, &actor, OpenRegister::from_input("Bar", "100.00", None)?)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod clock;
pub mod config;
pub mod desk;
pub mod error;
pub mod movement;
pub mod orders;
pub mod register;
pub mod summary;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditEngine, AuditRequest};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DeskConfig, StoreBackend, WriteMode};
pub use desk::{CashDesk, CashDeskBuilder, DeskOptions};
pub use error::{CashError, CashResult, ErrorKind, Notification};
pub use movement::MovementRecorder;
pub use orders::{OrderDirectory, StoreOrderDirectory};
pub use register::{CloseRegister, ClosedRegister, OpenRegister, RegisterLifecycle};
pub use summary::{RegisterSnapshot, SummaryService};
