//! # Cash Desk
//!
//! The facade the admin UI talks to, and the shared context behind it.
//!
//! ## Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              CashDesk                                   │
//! │                                                                         │
//! │   registers()      movements()       summaries()       audits()        │
//! │  RegisterLifecycle MovementRecorder  SummaryService    AuditEngine      │
//! │        │                 │                 │                │           │
//! │        └─────────────────┴────────┬────────┴────────────────┘           │
//! │                                   ▼                                     │
//! │                         Arc<DeskContext>                                │
//! │      repositories · OrderDirectory · Clock · AdjustmentPolicy           │
//! │                     DeskOptions (write mode, guards)                    │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                      Arc<dyn DocumentStore>                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::info;

use crate::audit::AuditEngine;
use crate::clock::{Clock, SystemClock};
use crate::config::{DeskConfig, StoreBackend, WriteMode};
use crate::error::{CashError, CashResult};
use crate::movement::MovementRecorder;
use crate::orders::{OrderDirectory, StoreOrderDirectory};
use crate::register::RegisterLifecycle;
use crate::summary::SummaryService;
use tavola_core::ledger::{self, CashRegisterSummary};
use tavola_core::{AdjustmentMode, AdjustmentPolicy, CashMovement, CashRegister, Scope};
use tavola_db::{
    AuditRepository, Database, DbConfig, DocumentStore, MemoryStore, MovementRepository,
    OrderRepository, RegisterRepository,
};

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeskOptions {
    pub write_mode: WriteMode,
    pub single_open_register: bool,
    pub validate_denominations: bool,
}

impl Default for DeskOptions {
    fn default() -> Self {
        DeskOptions {
            write_mode: WriteMode::Lenient,
            single_open_register: false,
            validate_denominations: true,
        }
    }
}

impl From<&DeskConfig> for DeskOptions {
    fn from(config: &DeskConfig) -> Self {
        DeskOptions {
            write_mode: config.guard.write_mode,
            single_open_register: config.guard.single_open_register,
            validate_denominations: config.audit.validate_denominations,
        }
    }
}

// =============================================================================
// Shared Context
// =============================================================================

#[derive(Debug)]
pub(crate) struct DeskContext {
    pub registers: RegisterRepository,
    pub movements: MovementRepository,
    pub audits: AuditRepository,
    pub orders: Arc<dyn OrderDirectory>,
    pub clock: Arc<dyn Clock>,
    pub policy: Arc<dyn AdjustmentPolicy>,
    pub options: DeskOptions,
}

/// A register's movements plus what was derived from them at read time.
pub(crate) struct LedgerView {
    pub movements: Vec<CashMovement>,
    pub cancelled: HashSet<String>,
    pub summary: CashRegisterSummary,
}

impl DeskContext {
    /// Reads the register's movements, asks the orders collaborator which
    /// of their orders are cancelled, and aggregates.
    pub async fn ledger(&self, scope: &Scope, register: &CashRegister) -> CashResult<LedgerView> {
        let movements = self.movements.list_for_register(scope, &register.id).await?;
        let cancelled = self.cancelled_orders(scope, &movements).await?;

        let summary = ledger::summarize(register, &movements, &cancelled, self.policy.as_ref())?;

        Ok(LedgerView {
            movements,
            cancelled,
            summary,
        })
    }

    /// Cancelled orders among those the movements reference.
    pub async fn cancelled_orders(
        &self,
        scope: &Scope,
        movements: &[CashMovement],
    ) -> CashResult<HashSet<String>> {
        let order_ids: HashSet<String> = movements
            .iter()
            .filter_map(|m| m.order_id.clone())
            .collect();
        if order_ids.is_empty() {
            return Ok(HashSet::new());
        }
        self.orders.cancelled_orders(scope, &order_ids).await
    }

    /// Loads a register, mapping absence to `NotFound`.
    pub async fn load_register(&self, scope: &Scope, register_id: &str) -> CashResult<(i64, CashRegister)> {
        let found = self
            .registers
            .get(scope, register_id)
            .await?
            .ok_or_else(|| CashError::not_found("CashRegister", register_id))?;
        Ok((found.version, found.value))
    }
}

// =============================================================================
// Cash Desk
// =============================================================================

#[derive(Debug, Clone)]
pub struct CashDesk {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    options: DeskOptions,
    registers: RegisterLifecycle,
    movements: MovementRecorder,
    summaries: SummaryService,
    audits: AuditEngine,
}

impl CashDesk {
    pub fn builder(store: Arc<dyn DocumentStore>) -> CashDeskBuilder {
        CashDeskBuilder::new(store)
    }

    /// Opens the configured store (running migrations for SQLite) and wires
    /// the services with the configured policy and guards.
    pub async fn from_config(config: &DeskConfig) -> CashResult<Self> {
        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite => {
                let path = config.store.database_path().ok_or_else(|| {
                    CashError::Config("No database path configured or discoverable".into())
                })?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let db = Database::new(
                    DbConfig::new(path)
                        .max_connections(config.store.max_connections)
                        .connect_timeout(StdDuration::from_secs(10)),
                )
                .await?;
                Arc::new(db.documents())
            }
        };

        info!(
            backend = %config.store.backend,
            adjustment_policy = %config.ledger.adjustment_policy,
            write_mode = %config.guard.write_mode,
            "Cash desk ready"
        );

        Ok(CashDesk::builder(store)
            .adjustment_mode(config.ledger.adjustment_policy)
            .options(DeskOptions::from(config))
            .build())
    }

    pub fn registers(&self) -> &RegisterLifecycle {
        &self.registers
    }

    pub fn movements(&self) -> &MovementRecorder {
        &self.movements
    }

    pub fn summaries(&self) -> &SummaryService {
        &self.summaries
    }

    pub fn audits(&self) -> &AuditEngine {
        &self.audits
    }

    pub fn options(&self) -> DeskOptions {
        self.options
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Order records in the same store, for seeding and back-office tools.
    pub fn order_records(&self) -> OrderRepository {
        OrderRepository::new(self.store())
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct CashDeskBuilder {
    store: Arc<dyn DocumentStore>,
    orders: Option<Arc<dyn OrderDirectory>>,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn AdjustmentPolicy>,
    options: DeskOptions,
}

impl CashDeskBuilder {
    fn new(store: Arc<dyn DocumentStore>) -> Self {
        CashDeskBuilder {
            store,
            orders: None,
            clock: Arc::new(SystemClock),
            policy: Arc::new(AdjustmentMode::default()),
            options: DeskOptions::default(),
        }
    }

    /// Replaces the store-backed orders lookup.
    pub fn orders(mut self, orders: Arc<dyn OrderDirectory>) -> Self {
        self.orders = Some(orders);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(mut self, policy: Arc<dyn AdjustmentPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn adjustment_mode(self, mode: AdjustmentMode) -> Self {
        self.policy(Arc::new(mode))
    }

    pub fn options(mut self, options: DeskOptions) -> Self {
        self.options = options;
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.options.write_mode = mode;
        self
    }

    pub fn single_open_register(mut self, on: bool) -> Self {
        self.options.single_open_register = on;
        self
    }

    pub fn validate_denominations(mut self, on: bool) -> Self {
        self.options.validate_denominations = on;
        self
    }

    pub fn build(self) -> CashDesk {
        let store = self.store;
        let orders = self.orders.unwrap_or_else(|| {
            Arc::new(StoreOrderDirectory::new(OrderRepository::new(Arc::clone(&store))))
        });

        let context = Arc::new(DeskContext {
            registers: RegisterRepository::new(Arc::clone(&store)),
            movements: MovementRepository::new(Arc::clone(&store)),
            audits: AuditRepository::new(Arc::clone(&store)),
            orders,
            clock: Arc::clone(&self.clock),
            policy: self.policy,
            options: self.options,
        });

        CashDesk {
            store,
            clock: self.clock,
            options: self.options,
            registers: RegisterLifecycle::new(Arc::clone(&context)),
            movements: MovementRecorder::new(Arc::clone(&context)),
            summaries: SummaryService::new(Arc::clone(&context)),
            audits: AuditEngine::new(context),
        }
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::register::OpenRegister;
    use tavola_core::{Money, MovementType, NewMovement, PaymentMethod};

    #[tokio::test]
    async fn test_from_config_memory() {
        let mut config = DeskConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.guard.write_mode = WriteMode::Strict;

        let desk = CashDesk::from_config(&config).await.unwrap();
        assert_eq!(desk.options().write_mode, WriteMode::Strict);
        assert!(desk.options().validate_denominations);
    }

    #[tokio::test]
    async fn test_injected_clock_stamps_registers() {
        let (desk, clock) = desk();
        clock.advance(chrono::Duration::minutes(5));

        let register = desk
            .registers()
            .open_register(&scope(), &cashier(), OpenRegister::new("Main", Money::zero()))
            .await
            .unwrap();
        assert_eq!(register.opened_at, desk.clock().now());
        assert_eq!(desk.clock().now(), clock.now());
    }

    #[tokio::test]
    async fn test_from_config_sqlite_file() {
        let dir = std::env::temp_dir().join(format!("tavola-desk-db-{}", std::process::id()));
        let mut config = DeskConfig::default();
        config.store.path = Some(dir.join("desk.db"));

        let desk = CashDesk::from_config(&config).await.unwrap();
        let register = desk
            .registers()
            .open_register(&scope(), &cashier(), OpenRegister::new("Main", Money::from_major_minor(100, 0)))
            .await
            .unwrap();
        desk.movements()
            .record_movement(
                &scope(),
                &cashier(),
                &register.id,
                NewMovement::new(MovementType::Sale, Money::from_cents(500), PaymentMethod::Card, "Table 4"),
            )
            .await
            .unwrap();

        let snapshot = desk.summaries().summarize_register(&scope(), &register.id).await.unwrap();
        assert_eq!(snapshot.summary.expected_balance, Money::from_cents(10_500));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_ledger_skips_order_lookup_without_orders() {
        #[derive(Debug)]
        struct Unreachable;

        #[async_trait::async_trait]
        impl OrderDirectory for Unreachable {
            async fn cancelled_orders(&self, _: &Scope, _: &HashSet<String>) -> CashResult<HashSet<String>> {
                Err(CashError::Transport("orders service down".into()))
            }
        }

        let (desk, _) = desk_with(|b| b.orders(Arc::new(Unreachable)));
        let register = desk
            .registers()
            .open_register(&scope(), &cashier(), OpenRegister::new("Main", Money::zero()))
            .await
            .unwrap();

        // no movement references an order, so the directory is never asked
        let snapshot = desk.summaries().summarize_register(&scope(), &register.id).await.unwrap();
        assert_eq!(snapshot.summary.expected_balance, Money::zero());
    }
}
