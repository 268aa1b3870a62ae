//! # Audit Engine
//!
//! Point-in-time reconciliation of counted cash against the ledger.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  perform_audit(register_id, counted_total, denominations?, notes?)      │
//! │       │                                                                 │
//! │       ├── counted_total < 0?               → ValidationError            │
//! │       ├── Σ(face × count) ≠ counted_total? → ValidationError (Mismatch) │
//! │       │     (only when validate_denominations is on)                    │
//! │       ├── register closed?                 → InvalidState               │
//! │       │                                                                 │
//! │       ├── expected = summary.expected_balance (now)                     │
//! │       ├── difference = counted − expected                               │
//! │       │     = 0 → balanced   > 0 → surplus   < 0 → shortage             │
//! │       │                                                                 │
//! │       └── append immutable CashAudit (register untouched)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::WriteMode;
use crate::desk::DeskContext;
use crate::error::{CashError, CashResult};
use tavola_core::validation::{
    normalize_notes, validate_actor, validate_counted_total, validate_notes, validate_scope,
};
use tavola_core::{reconcile, Actor, CashAudit, Denominations, Money, RegisterStatus, Scope};
use tavola_db::{DbError, RegisterRepository};

const PERFORM_AUDIT: &str = "perform an audit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRequest {
    pub counted_total: Money,
    #[serde(default)]
    pub denominations: Option<Denominations>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AuditRequest {
    pub fn new(counted_total: Money) -> Self {
        AuditRequest {
            counted_total,
            denominations: None,
            notes: None,
        }
    }

    pub fn with_denominations(mut self, denominations: Denominations) -> Self {
        self.denominations = Some(denominations);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AuditEngine {
    ctx: Arc<DeskContext>,
}

impl AuditEngine {
    pub(crate) fn new(ctx: Arc<DeskContext>) -> Self {
        AuditEngine { ctx }
    }

    pub async fn perform_audit(
        &self,
        scope: &Scope,
        actor: &Actor,
        register_id: &str,
        request: AuditRequest,
    ) -> CashResult<CashAudit> {
        debug!(register_id = %register_id, counted = %request.counted_total, "perform_audit");

        validate_scope(scope)?;
        validate_actor(actor)?;
        validate_counted_total("counted_total", request.counted_total)?;
        validate_notes(request.notes.as_deref())?;

        let denominations = request.denominations.filter(|d| !d.is_empty());
        if let Some(breakdown) = &denominations {
            if self.ctx.options.validate_denominations {
                breakdown.verify(request.counted_total)?;
            }
        }

        let (_, register) = self.ctx.load_register(scope, register_id).await?;
        register.ensure_open(PERFORM_AUDIT)?;

        let view = self.ctx.ledger(scope, &register).await?;
        let result = reconcile(view.summary.expected_balance, request.counted_total)?;

        let mut audit = CashAudit::from_reconciliation(
            register_id,
            result,
            denominations,
            normalize_notes(request.notes),
            actor,
            self.ctx.clock.now(),
        );

        audit.id = match self.ctx.options.write_mode {
            WriteMode::Lenient => self.ctx.audits.record(scope, &audit).await?,
            WriteMode::Strict => {
                let guard = RegisterRepository::open_check(scope, register_id);
                match self.ctx.audits.record_guarded(scope, &audit, &guard).await {
                    Ok(id) => id,
                    Err(DbError::PreconditionFailed { .. }) => {
                        warn!(register_id, "Register closed before audit was written");
                        return Err(CashError::InvalidState {
                            register_id: register_id.to_string(),
                            status: RegisterStatus::Closed,
                            operation: PERFORM_AUDIT.to_string(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        info!(
            audit_id = %audit.id,
            register_id = %register_id,
            expected = %audit.expected_cash,
            counted = %audit.actual_cash,
            difference = %audit.difference,
            status = ?audit.status,
            "Audit recorded"
        );

        Ok(audit)
    }

    /// Audits of a register, oldest first.
    pub async fn list_audits(&self, scope: &Scope, register_id: &str) -> CashResult<Vec<CashAudit>> {
        self.ctx.load_register(scope, register_id).await?;
        Ok(self.ctx.audits.list_for_register(scope, register_id).await?)
    }

    pub async fn latest_audit(&self, scope: &Scope, register_id: &str) -> CashResult<Option<CashAudit>> {
        self.ctx.load_register(scope, register_id).await?;
        Ok(self.ctx.audits.latest_for_register(scope, register_id).await?)
    }
}
