//! # tavola-db: Document Store Layer for the Tavola Cash Desk
//!
//! Tenant-scoped document storage with a memory and a SQLite backend,
//! plus the typed repositories the desk services use.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tavola Cash Desk Data Flow                       │
//! │                                                                         │
//! │  tavola-desk service (record_movement)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tavola-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  Repositories │    │ DocumentStore │    │  Migrations  │  │   │
//! │  │   │               │    │   (trait)     │    │  (embedded)  │  │   │
//! │  │   │ RegisterRepo  │───►│ MemoryStore   │    │              │  │   │
//! │  │   │ MovementRepo  │    │ SqliteStore ──┼───►│ 001_docs.sql │  │   │
//! │  │   │ AuditRepo     │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Document store contract and backends
//! - [`pool`] - SQLite connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Entity repositories
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tavola_db::{Database, DbConfig, RegisterRepository};
//!
//! let db = Database::new(DbConfig::new("tavola.db")).await?;
//! let registers = RegisterRepository::new(Arc::new(db.documents()));
//! let open = registers.list_open(&scope).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::{
    CollectionRef, Document, DocumentKey, DocumentStore, MemoryStore, Precondition, SqliteStore,
};

pub use repository::{
    AuditRepository, MovementRepository, OrderRepository, RegisterRepository, Versioned,
};
