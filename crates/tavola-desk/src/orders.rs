//! Orders collaborator.
//!
//! The desk never owns orders. It only needs to know which of the orders its
//! movements reference have been cancelled, so their movements can be shown
//! as voided and left out of the totals.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;

use crate::error::CashResult;
use tavola_core::Scope;
use tavola_db::OrderRepository;

#[async_trait]
pub trait OrderDirectory: Send + Sync + fmt::Debug {
    /// The subset of `order_ids` whose order is cancelled.
    ///
    /// Unknown ids are treated as not cancelled.
    async fn cancelled_orders(
        &self,
        scope: &Scope,
        order_ids: &HashSet<String>,
    ) -> CashResult<HashSet<String>>;
}

/// Reads order status from the shared document store.
#[derive(Debug, Clone)]
pub struct StoreOrderDirectory {
    orders: OrderRepository,
}

impl StoreOrderDirectory {
    pub fn new(orders: OrderRepository) -> Self {
        StoreOrderDirectory { orders }
    }
}

#[async_trait]
impl OrderDirectory for StoreOrderDirectory {
    async fn cancelled_orders(
        &self,
        scope: &Scope,
        order_ids: &HashSet<String>,
    ) -> CashResult<HashSet<String>> {
        Ok(self.orders.cancelled_among(scope, order_ids).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tavola_core::{OrderRecord, OrderStatus};
    use tavola_db::MemoryStore;

    #[tokio::test]
    async fn test_store_directory() {
        let repo = OrderRepository::new(Arc::new(MemoryStore::new()));
        let scope = Scope::new("t1", "b1");
        for (id, status) in [("A", OrderStatus::Completed), ("B", OrderStatus::Cancelled)] {
            repo.upsert(
                &scope,
                &OrderRecord {
                    id: id.to_string(),
                    order_number: None,
                    status,
                },
            )
            .await
            .unwrap();
        }

        let directory = StoreOrderDirectory::new(repo);
        let ids: HashSet<String> = ["A".to_string(), "B".to_string()].into_iter().collect();
        let cancelled = directory.cancelled_orders(&scope, &ids).await.unwrap();

        assert_eq!(cancelled.len(), 1);
        assert!(cancelled.contains("B"));
    }
}
