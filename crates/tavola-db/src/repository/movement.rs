//! Movement repository: the append-only ledger.
//!
//! Movements are never updated or deleted. A movement whose order is
//! cancelled stays here and is voided at read time by the ledger.

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::{collections, decode, encode};
use crate::error::DbResult;
use crate::store::{CollectionRef, DocumentStore, Precondition};
use tavola_core::ledger::sort_movements;
use tavola_core::{CashMovement, Scope};

#[derive(Debug, Clone)]
pub struct MovementRepository {
    store: Arc<dyn DocumentStore>,
}

impl MovementRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        MovementRepository { store }
    }

    fn collection(scope: &Scope) -> CollectionRef {
        CollectionRef::new(scope, collections::MOVEMENTS)
    }

    /// Appends a movement unconditionally; returns its id.
    pub async fn record(&self, scope: &Scope, movement: &CashMovement) -> DbResult<String> {
        let id = self
            .store
            .append(&Self::collection(scope), encode(movement)?)
            .await?;

        debug!(
            movement_id = %id,
            register_id = %movement.register_id,
            amount = %movement.amount,
            "Movement recorded"
        );
        Ok(id)
    }

    /// Appends a movement only while `guard` holds.
    pub async fn record_guarded(
        &self,
        scope: &Scope,
        movement: &CashMovement,
        guard: &Precondition,
    ) -> DbResult<String> {
        let id = self
            .store
            .append_guarded(&Self::collection(scope), encode(movement)?, guard)
            .await?;

        debug!(
            movement_id = %id,
            register_id = %movement.register_id,
            amount = %movement.amount,
            "Movement recorded (guarded)"
        );
        Ok(id)
    }

    /// Every movement of a register, in creation order.
    pub async fn list_for_register(
        &self,
        scope: &Scope,
        register_id: &str,
    ) -> DbResult<Vec<CashMovement>> {
        let docs = self
            .store
            .query_eq(&Self::collection(scope), "register_id", &json!(register_id))
            .await?;
        let mut movements = docs
            .into_iter()
            .map(decode::<CashMovement>)
            .collect::<DbResult<Vec<_>>>()?;
        sort_movements(&mut movements);
        Ok(movements)
    }
}
