//! Summary reads: a register, its aggregated totals, its raw ledger and its
//! latest audit, taken from one read of the movement list.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::desk::DeskContext;
use crate::error::CashResult;
use tavola_core::ledger::{self, CashRegisterSummary, LedgerEntry};
use tavola_core::validation::validate_scope;
use tavola_core::{CashAudit, CashRegister, Scope};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSnapshot {
    pub register: CashRegister,
    pub summary: CashRegisterSummary,
    /// Every movement, in creation order, voided ones included.
    pub entries: Vec<LedgerEntry>,
    /// Informational; audits never reset the expected balance.
    pub latest_audit: Option<CashAudit>,
}

#[derive(Debug, Clone)]
pub struct SummaryService {
    ctx: Arc<DeskContext>,
}

impl SummaryService {
    pub(crate) fn new(ctx: Arc<DeskContext>) -> Self {
        SummaryService { ctx }
    }

    pub async fn summarize_register(&self, scope: &Scope, register_id: &str) -> CashResult<RegisterSnapshot> {
        validate_scope(scope)?;

        let (_, register) = self.ctx.load_register(scope, register_id).await?;
        let view = self.ctx.ledger(scope, &register).await?;
        let latest_audit = self.ctx.audits.latest_for_register(scope, register_id).await?;

        debug!(
            register_id,
            expected = %view.summary.expected_balance,
            movements = view.summary.movement_count,
            voided = view.summary.voided_count,
            "Register summarized"
        );

        Ok(RegisterSnapshot {
            entries: ledger::entries(&view.movements, &view.cancelled),
            summary: view.summary,
            register,
            latest_audit,
        })
    }
}
