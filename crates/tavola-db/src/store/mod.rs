//! # Document Store
//!
//! The tenant-scoped document store every repository writes through.
//!
//! ## Key Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Document Tree                                   │
//! │                                                                         │
//! │  {tenant_id}/{branch_id}/{collection}/{id}                             │
//! │                                                                         │
//! │  t1/main/cash_registers/8c1e…   { status: "open", … }    version 3     │
//! │  t1/main/cash_movements/41aa…   { register_id: "8c1e…" } version 1     │
//! │  t1/main/cash_audits/77f0…      { register_id: "8c1e…" } version 1     │
//! │  t1/main/orders/ord-17          { status: "cancelled" }  version 2     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Versions
//! Every write to a document increments its `version` (starting at 1).
//! `update_versioned` is a compare-and-set on that number, and
//! `append_guarded` bumps the guard document's version while inserting,
//! so a later compare-and-set against the guard sees the append. A
//! precondition built `without_bump` checks the guard and leaves its
//! version alone.
//!
//! ## Backends
//! - [`MemoryStore`] - `RwLock<HashMap>`; tests and ephemeral use
//! - [`SqliteStore`] - `documents` table with JSON1 functions

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{DbError, DbResult};
use tavola_core::Scope;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// =============================================================================
// Keys
// =============================================================================

/// A collection within one tenant branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub scope: Scope,
    pub collection: String,
}

impl CollectionRef {
    pub fn new(scope: &Scope, collection: &str) -> Self {
        CollectionRef {
            scope: scope.clone(),
            collection: collection.to_string(),
        }
    }

    pub fn doc(&self, id: &str) -> DocumentKey {
        DocumentKey {
            scope: self.scope.clone(),
            collection: self.collection.clone(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.collection)
    }
}

/// Full path of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub scope: Scope,
    pub collection: String,
    pub id: String,
}

impl DocumentKey {
    pub fn new(scope: &Scope, collection: &str, id: &str) -> Self {
        CollectionRef::new(scope, collection).doc(id)
    }

    pub fn collection_ref(&self) -> CollectionRef {
        CollectionRef {
            scope: self.scope.clone(),
            collection: self.collection.clone(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.collection, self.id)
    }
}

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub version: i64,
    pub data: Value,
}

/// Condition checked atomically by [`DocumentStore::append_guarded`].
///
/// `key`'s top-level `field` must equal `equals`. With `bump_version` set
/// (the default) a successful append also bumps `key`'s version, so a
/// compare-and-set on `key` that read before the append fails.
#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
    pub key: DocumentKey,
    pub field: String,
    pub equals: Value,
    pub bump_version: bool,
}

impl Precondition {
    pub fn field_equals(key: DocumentKey, field: &str, equals: impl Into<Value>) -> Self {
        Precondition {
            key,
            field: field.to_string(),
            equals: equals.into(),
            bump_version: true,
        }
    }

    /// Checks the condition without touching the guard document's version.
    pub fn without_bump(mut self) -> Self {
        self.bump_version = false;
        self
    }

    pub(crate) fn holds(&self, data: &Value) -> bool {
        field_matches(data, &self.field, &self.equals)
    }
}

// =============================================================================
// Contract
// =============================================================================

/// Operations every backend provides, with identical semantics.
///
/// No operation guarantees result order; callers sort.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Backend name for logs.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &DocumentKey) -> DbResult<Option<Document>>;

    /// Creates or overwrites; returns the new version.
    async fn set(&self, key: &DocumentKey, data: Value) -> DbResult<i64>;

    /// RFC 7396 merge patch. `NotFound` if the document is missing.
    async fn update(&self, key: &DocumentKey, patch: Value) -> DbResult<i64>;

    /// As `update`, but fails with `VersionConflict` unless the stored
    /// version equals `expected_version`.
    async fn update_versioned(
        &self,
        key: &DocumentKey,
        expected_version: i64,
        patch: Value,
    ) -> DbResult<i64>;

    /// Inserts with a generated id; returns the id.
    async fn append(&self, collection: &CollectionRef, data: Value) -> DbResult<String>;

    /// Checks `precondition`, bumps the guard document's version (unless
    /// the precondition opts out) and inserts, all or nothing.
    async fn append_guarded(
        &self,
        collection: &CollectionRef,
        data: Value,
        precondition: &Precondition,
    ) -> DbResult<String>;

    /// Documents whose top-level `field` equals `value`. Null never matches.
    async fn query_eq(
        &self,
        collection: &CollectionRef,
        field: &str,
        value: &Value,
    ) -> DbResult<Vec<Document>>;

    async fn list(&self, collection: &CollectionRef) -> DbResult<Vec<Document>>;
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// RFC 7396 JSON merge patch, applied in place.
///
/// Objects merge recursively, `null` removes a member, anything else
/// replaces the target.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(target_map) = target {
        for (name, value) in patch_map {
            if value.is_null() {
                target_map.remove(name);
            } else {
                merge_patch(target_map.entry(name.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

pub(crate) fn field_matches(data: &Value, field: &str, value: &Value) -> bool {
    !value.is_null() && data.get(field).is_some_and(|v| v == value)
}

/// Field names are spliced into JSON paths, so only plain identifiers pass.
pub(crate) fn validate_field(field: &str) -> DbResult<()> {
    let ok = !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(DbError::QueryFailed(format!("invalid field name '{}'", field)))
    }
}

/// Document bodies are JSON objects; the id lives in the key.
pub(crate) fn ensure_object(data: &Value) -> DbResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(DbError::Serialization("document body must be a JSON object".to_string()))
    }
}

// =============================================================================
// Contract Tests (run against every backend)
// =============================================================================

#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn registers() -> CollectionRef {
        CollectionRef::new(&Scope::new("t1", "b1"), "cash_registers")
    }

    pub async fn get_set_update(store: &dyn DocumentStore) {
        let key = registers().doc("r1");
        assert!(store.get(&key).await.unwrap().is_none());

        assert_eq!(store.set(&key, json!({"name": "Bar", "status": "open"})).await.unwrap(), 1);
        let v = store
            .update(&key, json!({"status": "closed", "closed_by": "u2"}))
            .await
            .unwrap();
        assert_eq!(v, 2);

        let doc = store.get(&key).await.unwrap().unwrap();
        assert_eq!(doc.id, "r1");
        assert_eq!(doc.version, 2);
        assert_eq!(doc.data, json!({"name": "Bar", "status": "closed", "closed_by": "u2"}));

        assert_eq!(store.set(&key, json!({"name": "Bar 2"})).await.unwrap(), 3);
        let doc = store.get(&key).await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"name": "Bar 2"}));
    }

    pub async fn merge_patch_semantics(store: &dyn DocumentStore) {
        let key = registers().doc("r1");
        store
            .set(&key, json!({"a": 1, "nested": {"x": 1, "y": 2}, "gone": true}))
            .await
            .unwrap();
        store
            .update(&key, json!({"nested": {"y": null, "z": 3}, "gone": null}))
            .await
            .unwrap();

        let doc = store.get(&key).await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"a": 1, "nested": {"x": 1, "z": 3}}));
    }

    pub async fn update_missing_is_not_found(store: &dyn DocumentStore) {
        let key = registers().doc("nope");
        assert!(matches!(
            store.update(&key, json!({"a": 1})).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            store.update_versioned(&key, 1, json!({"a": 1})).await,
            Err(DbError::NotFound { .. })
        ));
    }

    pub async fn versioned_update(store: &dyn DocumentStore) {
        let key = registers().doc("r1");
        store.set(&key, json!({"status": "open"})).await.unwrap();

        assert_eq!(
            store.update_versioned(&key, 1, json!({"status": "closed"})).await.unwrap(),
            2
        );

        let err = store
            .update_versioned(&key, 1, json!({"status": "closed"}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    pub async fn append_and_query(store: &dyn DocumentStore) {
        let movements = CollectionRef::new(&Scope::new("t1", "b1"), "cash_movements");
        let a = store
            .append(&movements, json!({"register_id": "r1", "amount": 5000}))
            .await
            .unwrap();
        let b = store
            .append(&movements, json!({"register_id": "r2", "amount": 100}))
            .await
            .unwrap();
        store
            .append(&movements, json!({"register_id": "r1", "amount": 2000, "order_id": null}))
            .await
            .unwrap();
        assert_ne!(a, b);

        let r1 = store.query_eq(&movements, "register_id", &json!("r1")).await.unwrap();
        assert_eq!(r1.len(), 2);
        assert!(r1.iter().all(|d| d.data["register_id"] == "r1"));

        let by_amount = store.query_eq(&movements, "amount", &json!(100)).await.unwrap();
        assert_eq!(by_amount.len(), 1);
        assert_eq!(by_amount[0].id, b);

        let nulls = store.query_eq(&movements, "order_id", &Value::Null).await.unwrap();
        assert!(nulls.is_empty());

        assert_eq!(store.list(&movements).await.unwrap().len(), 3);
    }

    pub async fn scopes_are_isolated(store: &dyn DocumentStore) {
        let here = CollectionRef::new(&Scope::new("t1", "b1"), "cash_registers");
        let other_branch = CollectionRef::new(&Scope::new("t1", "b2"), "cash_registers");
        let other_tenant = CollectionRef::new(&Scope::new("t2", "b1"), "cash_registers");

        store.append(&here, json!({"status": "open"})).await.unwrap();
        store.append(&other_branch, json!({"status": "open"})).await.unwrap();
        store.append(&other_tenant, json!({"status": "open"})).await.unwrap();

        assert_eq!(store.list(&here).await.unwrap().len(), 1);
        assert_eq!(
            store.query_eq(&here, "status", &json!("open")).await.unwrap().len(),
            1
        );
    }

    pub async fn guarded_append(store: &dyn DocumentStore) {
        let regs = registers();
        let movements = CollectionRef::new(&regs.scope, "cash_movements");
        let guard_key = regs.doc("r1");
        store.set(&guard_key, json!({"status": "open"})).await.unwrap();

        let guard = Precondition::field_equals(guard_key.clone(), "status", "open");
        store
            .append_guarded(&movements, json!({"register_id": "r1"}), &guard)
            .await
            .unwrap();
        assert_eq!(store.get(&guard_key).await.unwrap().unwrap().version, 2);

        store.update(&guard_key, json!({"status": "closed"})).await.unwrap();
        let err = store
            .append_guarded(&movements, json!({"register_id": "r1"}), &guard)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::PreconditionFailed { .. }));
        assert_eq!(store.list(&movements).await.unwrap().len(), 1);

        let missing = Precondition::field_equals(regs.doc("ghost"), "status", "open");
        assert!(matches!(
            store.append_guarded(&movements, json!({}), &missing).await,
            Err(DbError::NotFound { .. })
        ));
        assert_eq!(store.list(&movements).await.unwrap().len(), 1);
    }

    /// An unbumped guard still refuses, but leaves the guard's version alone.
    pub async fn guarded_append_without_bump(store: &dyn DocumentStore) {
        let regs = registers();
        let audits = CollectionRef::new(&regs.scope, "cash_audits");
        let key = regs.doc("r1");
        store.set(&key, json!({"status": "open"})).await.unwrap();

        let seen = store.get(&key).await.unwrap().unwrap().version;
        let check = Precondition::field_equals(key.clone(), "status", "open").without_bump();
        store.append_guarded(&audits, json!({"register_id": "r1"}), &check).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap().version, seen);

        store
            .update_versioned(&key, seen, json!({"status": "closed"}))
            .await
            .unwrap();
        assert!(matches!(
            store.append_guarded(&audits, json!({}), &check).await,
            Err(DbError::PreconditionFailed { .. })
        ));
        assert_eq!(store.list(&audits).await.unwrap().len(), 1);
    }

    /// A guarded append between read and compare-and-set makes the CAS fail.
    pub async fn guarded_append_invalidates_cas(store: &dyn DocumentStore) {
        let regs = registers();
        let movements = CollectionRef::new(&regs.scope, "cash_movements");
        let key = regs.doc("r1");
        store.set(&key, json!({"status": "open"})).await.unwrap();

        let seen = store.get(&key).await.unwrap().unwrap().version;
        let guard = Precondition::field_equals(key.clone(), "status", "open");
        store.append_guarded(&movements, json!({}), &guard).await.unwrap();

        assert!(matches!(
            store.update_versioned(&key, seen, json!({"status": "closed"})).await,
            Err(DbError::VersionConflict { .. })
        ));
    }

    pub async fn rejects_non_object_and_bad_fields(store: &dyn DocumentStore) {
        let regs = registers();
        assert!(matches!(
            store.append(&regs, json!([1, 2])).await,
            Err(DbError::Serialization(_))
        ));
        assert!(store.query_eq(&regs, "status') OR 1=1 --", &json!("x")).await.is_err());
    }

    pub async fn concurrent_cas_has_one_winner(store: Arc<dyn DocumentStore>) {
        let key = registers().doc("r1");
        store.set(&key, json!({"status": "open"})).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_versioned(&key, 1, json!({"status": "closed", "closed_by": format!("u{i}")}))
                    .await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    /// Expands to one `#[tokio::test]` per contract check.
    ///
    /// `$make` is an async fn returning `Arc<dyn DocumentStore>`.
    macro_rules! store_contract_tests {
        ($make:path) => {
            #[tokio::test]
            async fn contract_get_set_update() {
                crate::store::contract::get_set_update($make().await.as_ref()).await;
            }

            #[tokio::test]
            async fn contract_merge_patch_semantics() {
                crate::store::contract::merge_patch_semantics($make().await.as_ref()).await;
            }

            #[tokio::test]
            async fn contract_update_missing_is_not_found() {
                crate::store::contract::update_missing_is_not_found($make().await.as_ref()).await;
            }

            #[tokio::test]
            async fn contract_versioned_update() {
                crate::store::contract::versioned_update($make().await.as_ref()).await;
            }

            #[tokio::test]
            async fn contract_append_and_query() {
                crate::store::contract::append_and_query($make().await.as_ref()).await;
            }

            #[tokio::test]
            async fn contract_scopes_are_isolated() {
                crate::store::contract::scopes_are_isolated($make().await.as_ref()).await;
            }

            #[tokio::test]
            async fn contract_guarded_append() {
                crate::store::contract::guarded_append($make().await.as_ref()).await;
            }

            #[tokio::test]
            async fn contract_guarded_append_without_bump() {
                crate::store::contract::guarded_append_without_bump($make().await.as_ref())
                    .await;
            }

            #[tokio::test]
            async fn contract_guarded_append_invalidates_cas() {
                crate::store::contract::guarded_append_invalidates_cas($make().await.as_ref())
                    .await;
            }

            #[tokio::test]
            async fn contract_rejects_non_object_and_bad_fields() {
                crate::store::contract::rejects_non_object_and_bad_fields($make().await.as_ref())
                    .await;
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn contract_concurrent_cas_has_one_winner() {
                crate::store::contract::concurrent_cas_has_one_winner($make().await).await;
            }
        };
    }

    pub(crate) use store_contract_tests;
}
