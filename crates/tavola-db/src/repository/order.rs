//! Order repository.
//!
//! Orders belong to the ordering subsystem; the cash desk only reads their
//! status. `upsert` and `set_status` exist so the desk can be seeded and
//! tested without that service.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::{collections, decode, encode};
use crate::error::DbResult;
use crate::store::{CollectionRef, DocumentStore};
use tavola_core::{OrderRecord, OrderStatus, Scope};

#[derive(Debug, Clone)]
pub struct OrderRepository {
    store: Arc<dyn DocumentStore>,
}

impl OrderRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        OrderRepository { store }
    }

    fn collection(scope: &Scope) -> CollectionRef {
        CollectionRef::new(scope, collections::ORDERS)
    }

    /// Writes an order under its own id.
    pub async fn upsert(&self, scope: &Scope, order: &OrderRecord) -> DbResult<()> {
        self.store
            .set(&Self::collection(scope).doc(&order.id), encode(order)?)
            .await?;
        Ok(())
    }

    pub async fn get(&self, scope: &Scope, order_id: &str) -> DbResult<Option<OrderRecord>> {
        self.store
            .get(&Self::collection(scope).doc(order_id))
            .await?
            .map(decode)
            .transpose()
    }

    /// Changes an order's status. `NotFound` if the order is unknown.
    pub async fn set_status(&self, scope: &Scope, order_id: &str, status: OrderStatus) -> DbResult<()> {
        self.store
            .update(
                &Self::collection(scope).doc(order_id),
                json!({ "status": status.as_str() }),
            )
            .await?;
        debug!(order_id, status = status.as_str(), "Order status changed");
        Ok(())
    }

    /// Which of `order_ids` are cancelled. Unknown ids are not cancelled.
    pub async fn cancelled_among(
        &self,
        scope: &Scope,
        order_ids: &HashSet<String>,
    ) -> DbResult<HashSet<String>> {
        if order_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let docs = self
            .store
            .query_eq(
                &Self::collection(scope),
                "status",
                &json!(OrderStatus::Cancelled.as_str()),
            )
            .await?;

        Ok(docs
            .into_iter()
            .map(|doc| doc.id)
            .filter(|id| order_ids.contains(id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::store::MemoryStore;

    fn order(id: &str, status: OrderStatus) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            order_number: Some(format!("#{id}")),
            status,
        }
    }

    #[tokio::test]
    async fn test_cancelled_among() {
        let repo = OrderRepository::new(Arc::new(MemoryStore::new()));
        let scope = Scope::new("t1", "b1");
        repo.upsert(&scope, &order("A", OrderStatus::Completed)).await.unwrap();
        repo.upsert(&scope, &order("B", OrderStatus::Cancelled)).await.unwrap();
        repo.upsert(&scope, &order("C", OrderStatus::Cancelled)).await.unwrap();

        let asked: HashSet<String> = ["A", "B", "Z"].iter().map(|s| s.to_string()).collect();
        let cancelled = repo.cancelled_among(&scope, &asked).await.unwrap();
        assert_eq!(cancelled, ["B".to_string()].into_iter().collect::<HashSet<_>>());

        repo.set_status(&scope, "A", OrderStatus::Cancelled).await.unwrap();
        let cancelled = repo.cancelled_among(&scope, &asked).await.unwrap();
        assert_eq!(cancelled.len(), 2);
        assert_eq!(
            repo.get(&scope, "A").await.unwrap().unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_set_status_unknown_order() {
        let repo = OrderRepository::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            repo.set_status(&Scope::new("t1", "b1"), "nope", OrderStatus::Cancelled)
                .await,
            Err(DbError::NotFound { .. })
        ));
    }
}
