//! # Movement Recorder
//!
//! Append-only writer for the register ledger. There is no update or delete;
//! a mistake is corrected with a compensating adjustment.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_movement(register_id, NewMovement)                              │
//! │       │                                                                 │
//! │       ├── validate (amount > 0, description, direction only on adj.)    │
//! │       ├── load register ──► missing? NotFound                           │
//! │       ├── register closed? ──► InvalidState                             │
//! │       │                                                                 │
//! │       ├── lenient: append                                               │
//! │       └── strict:  append only while register.status == "open"         │
//! │                    (atomic in the store; also bumps the register        │
//! │                     version so an in-flight strict close retries)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::WriteMode;
use crate::desk::DeskContext;
use crate::error::{CashError, CashResult};
use tavola_core::ledger::{self, LedgerEntry};
use tavola_core::validation::{validate_actor, validate_new_movement, validate_scope};
use tavola_core::{Actor, CashMovement, NewMovement, RegisterStatus, Scope};
use tavola_db::{DbError, RegisterRepository};

const RECORD_MOVEMENT: &str = "record a movement";

#[derive(Debug, Clone)]
pub struct MovementRecorder {
    ctx: Arc<DeskContext>,
}

impl MovementRecorder {
    pub(crate) fn new(ctx: Arc<DeskContext>) -> Self {
        MovementRecorder { ctx }
    }

    /// Appends a movement to an open register and returns it with its
    /// store-assigned id and server timestamp.
    pub async fn record_movement(
        &self,
        scope: &Scope,
        actor: &Actor,
        register_id: &str,
        movement: NewMovement,
    ) -> CashResult<CashMovement> {
        debug!(
            register_id = %register_id,
            movement_type = ?movement.movement_type,
            amount = %movement.amount,
            "record_movement"
        );

        validate_scope(scope)?;
        validate_actor(actor)?;
        validate_new_movement(&movement)?;

        let (_, register) = self.ctx.load_register(scope, register_id).await?;
        register.ensure_open(RECORD_MOVEMENT)?;

        let mut movement = movement.into_movement(register_id, actor, self.ctx.clock.now());

        movement.id = match self.ctx.options.write_mode {
            WriteMode::Lenient => self.ctx.movements.record(scope, &movement).await?,
            WriteMode::Strict => {
                let guard = RegisterRepository::open_guard(scope, register_id);
                match self.ctx.movements.record_guarded(scope, &movement, &guard).await {
                    Ok(id) => id,
                    Err(DbError::PreconditionFailed { .. }) => {
                        warn!(register_id, "Register closed before movement was written");
                        return Err(CashError::InvalidState {
                            register_id: register_id.to_string(),
                            status: RegisterStatus::Closed,
                            operation: RECORD_MOVEMENT.to_string(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        info!(
            movement_id = %movement.id,
            register_id = %register_id,
            movement_type = ?movement.movement_type,
            amount = %movement.amount,
            method = ?movement.payment_method,
            order_id = movement.order_id.as_deref().unwrap_or("-"),
            "Movement recorded"
        );

        Ok(movement)
    }

    /// The raw ledger, in creation order, with cancelled-order movements
    /// flagged as voided.
    pub async fn list_movements(&self, scope: &Scope, register_id: &str) -> CashResult<Vec<LedgerEntry>> {
        let (_, register) = self.ctx.load_register(scope, register_id).await?;
        let movements = self.ctx.movements.list_for_register(scope, &register.id).await?;
        let cancelled = self.ctx.cancelled_orders(scope, &movements).await?;
        Ok(ledger::entries(&movements, &cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::desk::fixtures::*;
    use crate::error::ErrorKind;
    use crate::register::{CloseRegister, OpenRegister};
    use chrono::Duration;
    use serde_json::json;
    use tavola_core::{
        AdjustmentDirection, Money, MovementType, OrderRecord, OrderStatus, PaymentMethod,
        ValidationError,
    };

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn sale(amount: i64) -> NewMovement {
        NewMovement::new(MovementType::Sale, cents(amount), PaymentMethod::Cash, "Table 7")
    }

    async fn open(desk: &crate::CashDesk) -> String {
        desk.registers()
            .open_register(&scope(), &cashier(), OpenRegister::new("Main", cents(10_000)))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_record_movement() {
        let (desk, clock) = desk();
        let register_id = open(&desk).await;

        let movement = desk
            .movements()
            .record_movement(
                &scope(),
                &cashier(),
                &register_id,
                sale(2_500).for_order("ord-1", Some("#41".into())).with_reference("pos-3"),
            )
            .await
            .unwrap();

        assert!(!movement.id.is_empty());
        assert_eq!(movement.register_id, register_id);
        assert_eq!(movement.created_by, "u-cashier");
        assert_eq!(movement.created_at, clock.now());
        assert_eq!(movement.order_id.as_deref(), Some("ord-1"));
        assert_eq!(movement.reference.as_deref(), Some("pos-3"));
    }

    #[tokio::test]
    async fn test_amount_must_be_positive() {
        let (desk, _) = desk();
        let register_id = open(&desk).await;

        for amount in [0, -500] {
            let err = desk
                .movements()
                .record_movement(&scope(), &cashier(), &register_id, sale(amount))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                CashError::Validation(ValidationError::MustBePositive { .. })
            ));
        }

        assert!(desk
            .movements()
            .list_movements(&scope(), &register_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_direction_only_on_adjustments() {
        let (desk, _) = desk();
        let register_id = open(&desk).await;

        let err = desk
            .movements()
            .record_movement(
                &scope(),
                &cashier(),
                &register_id,
                sale(100).directed(AdjustmentDirection::Increase),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        desk.movements()
            .record_movement(
                &scope(),
                &cashier(),
                &register_id,
                NewMovement::new(MovementType::Adjustment, cents(100), PaymentMethod::Cash, "Recount")
                    .directed(AdjustmentDirection::Decrease),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_register() {
        let (desk, _) = desk();
        let err = desk
            .movements()
            .record_movement(&scope(), &cashier(), "nope", sale(100))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = desk.movements().list_movements(&scope(), "nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_flags_cancelled_orders() {
        let (desk, clock) = desk();
        let register_id = open(&desk).await;
        let orders = desk.order_records();
        orders
            .upsert(
                &scope(),
                &OrderRecord {
                    id: "X".into(),
                    order_number: Some("#12".into()),
                    status: OrderStatus::Completed,
                },
            )
            .await
            .unwrap();

        desk.movements()
            .record_movement(&scope(), &cashier(), &register_id, sale(3_000).for_order("X", None))
            .await
            .unwrap();
        clock.advance(Duration::minutes(1));
        desk.movements()
            .record_movement(&scope(), &cashier(), &register_id, sale(1_000))
            .await
            .unwrap();

        orders.set_status(&scope(), "X", OrderStatus::Cancelled).await.unwrap();

        let entries = desk.movements().list_movements(&scope(), &register_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].voided);
        assert_eq!(entries[0].movement.amount, cents(3_000));
        assert!(!entries[1].voided);
    }

    #[tokio::test]
    async fn test_lenient_movement_can_land_after_close() {
        let (desk, store) = interfering_desk(WriteMode::Lenient);
        let register_id = open(&desk).await;

        // another terminal closes between our status read and our append
        store.interfere(
            Before::Append,
            RegisterRepository::key(&scope(), &register_id),
            json!({ "status": "closed" }),
        );

        desk.movements()
            .record_movement(&scope(), &cashier(), &register_id, sale(100))
            .await
            .unwrap();
        assert_eq!(
            desk.movements().list_movements(&scope(), &register_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_strict_movement_rejected_after_concurrent_close() {
        let (desk, store) = interfering_desk(WriteMode::Strict);
        let register_id = open(&desk).await;

        store.interfere(
            Before::Append,
            RegisterRepository::key(&scope(), &register_id),
            json!({ "status": "closed" }),
        );

        let err = desk
            .movements()
            .record_movement(&scope(), &cashier(), &register_id, sale(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CashError::InvalidState { status: RegisterStatus::Closed, .. }));
        assert!(desk
            .movements()
            .list_movements(&scope(), &register_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_strict_concurrent_movements_all_land() {
        let (desk, _) = desk_with(|b| b.write_mode(WriteMode::Strict));
        let register_id = open(&desk).await;

        let mut handles = Vec::new();
        for i in 1..=8 {
            let desk = desk.clone();
            let register_id = register_id.clone();
            handles.push(tokio::spawn(async move {
                desk.movements()
                    .record_movement(&scope(), &cashier(), &register_id, sale(i * 100))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snapshot = desk.summaries().summarize_register(&scope(), &register_id).await.unwrap();
        assert_eq!(snapshot.summary.movement_count, 8);
        assert_eq!(snapshot.summary.total_sales, cents(3_600));

        desk.registers()
            .close_register(&scope(), &cashier(), &register_id, CloseRegister::new(cents(13_600)))
            .await
            .unwrap();
    }
}
