//! Audit repository: immutable reconciliation snapshots.

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::{collections, decode, encode};
use crate::error::DbResult;
use crate::store::{CollectionRef, DocumentStore, Precondition};
use tavola_core::{CashAudit, Scope};

#[derive(Debug, Clone)]
pub struct AuditRepository {
    store: Arc<dyn DocumentStore>,
}

impl AuditRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        AuditRepository { store }
    }

    fn collection(scope: &Scope) -> CollectionRef {
        CollectionRef::new(scope, collections::AUDITS)
    }

    pub async fn record(&self, scope: &Scope, audit: &CashAudit) -> DbResult<String> {
        let id = self
            .store
            .append(&Self::collection(scope), encode(audit)?)
            .await?;
        debug!(audit_id = %id, register_id = %audit.register_id, "Audit recorded");
        Ok(id)
    }

    pub async fn record_guarded(
        &self,
        scope: &Scope,
        audit: &CashAudit,
        guard: &Precondition,
    ) -> DbResult<String> {
        let id = self
            .store
            .append_guarded(&Self::collection(scope), encode(audit)?, guard)
            .await?;
        debug!(audit_id = %id, register_id = %audit.register_id, "Audit recorded (guarded)");
        Ok(id)
    }

    /// Audits of a register, oldest first.
    pub async fn list_for_register(&self, scope: &Scope, register_id: &str) -> DbResult<Vec<CashAudit>> {
        let docs = self
            .store
            .query_eq(&Self::collection(scope), "register_id", &json!(register_id))
            .await?;
        let mut audits = docs
            .into_iter()
            .map(decode::<CashAudit>)
            .collect::<DbResult<Vec<_>>>()?;
        audits.sort_by(|a, b| {
            a.performed_at
                .cmp(&b.performed_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(audits)
    }

    pub async fn latest_for_register(
        &self,
        scope: &Scope,
        register_id: &str,
    ) -> DbResult<Option<CashAudit>> {
        Ok(self.list_for_register(scope, register_id).await?.pop())
    }
}
