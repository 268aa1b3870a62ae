//! In-memory document store.
//!
//! A single `RwLock` guards the whole map, so every write (including the
//! check-bump-insert of `append_guarded`) is atomic with respect to other
//! writers.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    ensure_object, field_matches, merge_patch, validate_field, CollectionRef, Document,
    DocumentKey, DocumentStore, Precondition,
};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
struct Entry {
    version: i64,
    data: Value,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<DocumentKey, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn to_document(key: &DocumentKey, entry: &Entry) -> Document {
        Document {
            id: key.id.clone(),
            version: entry.version,
            data: entry.data.clone(),
        }
    }

    fn in_collection<'a>(
        map: &'a HashMap<DocumentKey, Entry>,
        collection: &'a CollectionRef,
    ) -> impl Iterator<Item = (&'a DocumentKey, &'a Entry)> + 'a {
        map.iter().filter(move |(key, _)| {
            key.scope == collection.scope && key.collection == collection.collection
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &DocumentKey) -> DbResult<Option<Document>> {
        let map = self.documents.read().await;
        Ok(map.get(key).map(|entry| Self::to_document(key, entry)))
    }

    async fn set(&self, key: &DocumentKey, data: Value) -> DbResult<i64> {
        ensure_object(&data)?;
        let mut map = self.documents.write().await;
        let version = map.get(key).map_or(1, |e| e.version + 1);
        map.insert(key.clone(), Entry { version, data });
        Ok(version)
    }

    async fn update(&self, key: &DocumentKey, patch: Value) -> DbResult<i64> {
        ensure_object(&patch)?;
        let mut map = self.documents.write().await;
        let entry = map
            .get_mut(key)
            .ok_or_else(|| DbError::not_found(&key.collection, &key.id))?;

        merge_patch(&mut entry.data, &patch);
        entry.version += 1;
        Ok(entry.version)
    }

    async fn update_versioned(
        &self,
        key: &DocumentKey,
        expected_version: i64,
        patch: Value,
    ) -> DbResult<i64> {
        ensure_object(&patch)?;
        let mut map = self.documents.write().await;
        let entry = map
            .get_mut(key)
            .ok_or_else(|| DbError::not_found(&key.collection, &key.id))?;

        if entry.version != expected_version {
            return Err(DbError::VersionConflict {
                key: key.to_string(),
                expected: expected_version,
                actual: entry.version,
            });
        }

        merge_patch(&mut entry.data, &patch);
        entry.version += 1;
        Ok(entry.version)
    }

    async fn append(&self, collection: &CollectionRef, data: Value) -> DbResult<String> {
        ensure_object(&data)?;
        let id = Uuid::new_v4().to_string();
        let mut map = self.documents.write().await;
        map.insert(collection.doc(&id), Entry { version: 1, data });
        Ok(id)
    }

    async fn append_guarded(
        &self,
        collection: &CollectionRef,
        data: Value,
        precondition: &Precondition,
    ) -> DbResult<String> {
        ensure_object(&data)?;
        let mut map = self.documents.write().await;

        let guard = map.get_mut(&precondition.key).ok_or_else(|| {
            DbError::not_found(&precondition.key.collection, &precondition.key.id)
        })?;
        if !precondition.holds(&guard.data) {
            debug!(key = %precondition.key, field = %precondition.field, "Guarded append refused");
            return Err(DbError::PreconditionFailed {
                key: precondition.key.to_string(),
                field: precondition.field.clone(),
            });
        }
        if precondition.bump_version {
            guard.version += 1;
        }

        let id = Uuid::new_v4().to_string();
        map.insert(collection.doc(&id), Entry { version: 1, data });
        Ok(id)
    }

    async fn query_eq(
        &self,
        collection: &CollectionRef,
        field: &str,
        value: &Value,
    ) -> DbResult<Vec<Document>> {
        validate_field(field)?;
        let map = self.documents.read().await;
        Ok(Self::in_collection(&map, collection)
            .filter(|(_, entry)| field_matches(&entry.data, field, value))
            .map(|(key, entry)| Self::to_document(key, entry))
            .collect())
    }

    async fn list(&self, collection: &CollectionRef) -> DbResult<Vec<Document>> {
        let map = self.documents.read().await;
        Ok(Self::in_collection(&map, collection)
            .map(|(key, entry)| Self::to_document(key, entry))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract::store_contract_tests;
    use std::sync::Arc;

    async fn make_store() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryStore::new())
    }

    store_contract_tests!(make_store);
}
