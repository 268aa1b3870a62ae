//! # Register Lifecycle
//!
//! Opens and closes cash registers and guards the state machine.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open_register ──► ┌────────┐   close_register   ┌──────────┐          │
//! │                     │  OPEN  │ ─────────────────► │  CLOSED  │          │
//! │                     └────────┘                    └──────────┘          │
//! │                      movements,                    terminal: no         │
//! │                      audits allowed                reopen, no writes    │
//! │                                                                         │
//! │  Close freezes: expected (from the ledger at call time), counted,       │
//! │  difference = counted − expected.                                       │
//! │                                                                         │
//! │  Strict mode: the close is a compare-and-set on the register version   │
//! │  read before the ledger was summed. A movement or close that landed    │
//! │  in between makes the close fail instead of freezing a stale balance.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::WriteMode;
use crate::desk::DeskContext;
use crate::error::{CashError, CashResult};
use tavola_core::ledger::{self, CashRegisterSummary};
use tavola_core::validation::{
    normalize_notes, parse_amount, validate_actor, validate_counted_total,
    validate_initial_balance, validate_notes, validate_register_name, validate_scope,
};
use tavola_core::{Actor, CashRegister, Money, Reconciliation, RegisterClosing, RegisterStatus, Scope};
use tavola_db::DbError;

// =============================================================================
// Requests / Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRegister {
    pub name: String,
    pub initial_balance: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OpenRegister {
    pub fn new(name: impl Into<String>, initial_balance: Money) -> Self {
        OpenRegister {
            name: name.into(),
            initial_balance,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builds a request from form text; a non-numeric balance is a
    /// validation error on `initial_balance`.
    pub fn from_input(name: &str, initial_balance: &str, notes: Option<&str>) -> CashResult<Self> {
        Ok(OpenRegister {
            name: name.to_string(),
            initial_balance: parse_amount("initial_balance", initial_balance)?,
            notes: notes.map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseRegister {
    /// What the operator counted in the drawer.
    pub actual_balance: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CloseRegister {
    pub fn new(actual_balance: Money) -> Self {
        CloseRegister {
            actual_balance,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The closed register and the figures frozen with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedRegister {
    pub register: CashRegister,
    pub summary: CashRegisterSummary,
    pub reconciliation: Reconciliation,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct RegisterLifecycle {
    ctx: Arc<DeskContext>,
}

impl RegisterLifecycle {
    pub(crate) fn new(ctx: Arc<DeskContext>) -> Self {
        RegisterLifecycle { ctx }
    }

    pub async fn open_register(
        &self,
        scope: &Scope,
        actor: &Actor,
        request: OpenRegister,
    ) -> CashResult<CashRegister> {
        debug!(scope = %scope, name = %request.name, "open_register");

        validate_scope(scope)?;
        validate_actor(actor)?;
        validate_register_name(&request.name)?;
        validate_initial_balance(request.initial_balance)?;
        validate_notes(request.notes.as_deref())?;

        if self.ctx.options.single_open_register {
            if let Some(existing) = self.ctx.registers.list_open(scope).await?.into_iter().next() {
                warn!(scope = %scope, register_id = %existing.id, "Register already open in branch");
                return Err(CashError::AlreadyOpen {
                    register_id: existing.id,
                });
            }
        }

        let mut register = CashRegister::open(
            scope,
            &request.name,
            request.initial_balance,
            actor,
            self.ctx.clock.now(),
            normalize_notes(request.notes),
        );
        register.id = self.ctx.registers.create(&register).await?;

        info!(
            register_id = %register.id,
            name = %register.name,
            initial_balance = %register.initial_balance,
            opened_by = %actor.user_id,
            "Register opened"
        );

        Ok(register)
    }

    pub async fn close_register(
        &self,
        scope: &Scope,
        actor: &Actor,
        register_id: &str,
        request: CloseRegister,
    ) -> CashResult<ClosedRegister> {
        debug!(register_id = %register_id, actual = %request.actual_balance, "close_register");

        validate_scope(scope)?;
        validate_actor(actor)?;
        validate_counted_total("actual_balance", request.actual_balance)?;
        validate_notes(request.notes.as_deref())?;

        let (version, mut register) = self.ctx.load_register(scope, register_id).await?;
        register.ensure_open("close")?;

        let view = self.ctx.ledger(scope, &register).await?;

        let reconciliation = register.close(RegisterClosing {
            expected_balance: view.summary.expected_balance,
            actual_balance: request.actual_balance,
            closed_by: actor.user_id.clone(),
            closed_at: self.ctx.clock.now(),
            notes: normalize_notes(request.notes),
        })?;

        match self.ctx.options.write_mode {
            WriteMode::Lenient => {
                self.ctx.registers.close(&register).await?;
            }
            WriteMode::Strict => {
                match self.ctx.registers.close_versioned(&register, version).await {
                    Ok(_) => {}
                    Err(DbError::VersionConflict { .. }) => {
                        return Err(self.explain_conflict(scope, register_id).await);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let summary = ledger::summarize(&register, &view.movements, &view.cancelled, self.ctx.policy.as_ref())?;

        info!(
            register_id = %register.id,
            expected = %reconciliation.expected,
            actual = %reconciliation.actual,
            difference = %reconciliation.difference,
            status = ?reconciliation.status,
            closed_by = %actor.user_id,
            "Register closed"
        );

        Ok(ClosedRegister {
            register,
            summary,
            reconciliation,
        })
    }

    /// A strict close lost its compare-and-set. If someone else closed the
    /// register it is the ordinary "already closed" error; otherwise the
    /// ledger moved under us.
    async fn explain_conflict(&self, scope: &Scope, register_id: &str) -> CashError {
        match self.ctx.load_register(scope, register_id).await {
            Ok((_, current)) if current.status == RegisterStatus::Closed => {
                warn!(register_id, "Register closed concurrently");
                CashError::InvalidState {
                    register_id: register_id.to_string(),
                    status: RegisterStatus::Closed,
                    operation: "close".to_string(),
                }
            }
            Ok(_) => {
                warn!(register_id, "Register ledger changed during close");
                CashError::ConcurrentModification {
                    register_id: register_id.to_string(),
                }
            }
            Err(e) => e,
        }
    }

    pub async fn get_register(&self, scope: &Scope, register_id: &str) -> CashResult<CashRegister> {
        let (_, register) = self.ctx.load_register(scope, register_id).await?;
        Ok(register)
    }

    /// Every register in the branch, oldest first.
    pub async fn list_registers(&self, scope: &Scope) -> CashResult<Vec<CashRegister>> {
        validate_scope(scope)?;
        Ok(self.ctx.registers.list(scope).await?)
    }

    /// The most recently opened register that is still open.
    pub async fn find_open_register(&self, scope: &Scope) -> CashResult<Option<CashRegister>> {
        validate_scope(scope)?;
        Ok(self.ctx.registers.list_open(scope).await?.pop())
    }
}

// =============================================================================
// Tests
// =============================================================================
