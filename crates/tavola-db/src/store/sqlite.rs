//! # SQLite Document Store
//!
//! Documents live in a single `documents` table as JSON text.
//!
//! ## Query Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation          SQL                                                 │
//! │  ─────────────────  ─────────────────────────────────────────────────   │
//! │  set                INSERT … ON CONFLICT DO UPDATE SET version + 1      │
//! │  update             UPDATE … SET data = json_patch(data, ?)             │
//! │  update_versioned   UPDATE … WHERE version = ?                          │
//! │  append_guarded     BEGIN; UPDATE guard WHERE field = ?; INSERT; COMMIT │
//! │  query_eq           WHERE json_extract(data, path) =                    │
//! │                           json_extract(?, '$')                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `json_patch` implements RFC 7396, matching [`super::merge_patch`].
//! Comparing through `json_extract` on both sides makes strings, numbers
//! and booleans compare the same way they do in the in-memory backend,
//! and a JSON null extracts to SQL NULL, which never compares equal.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{
    ensure_object, validate_field, CollectionRef, Document, DocumentKey, DocumentStore,
    Precondition,
};
use crate::error::{DbError, DbResult};

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    version: i64,
    data: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> DbResult<Self> {
        Ok(Document {
            id: row.id,
            version: row.version,
            data: serde_json::from_str(&row.data)?,
        })
    }
}

fn json_path(field: &str) -> DbResult<String> {
    validate_field(field)?;
    Ok(format!("$.\"{}\"", field))
}

/// Document store over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    async fn current_version(&self, key: &DocumentKey) -> DbResult<Option<i64>> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM documents
             WHERE tenant_id = ? AND branch_id = ? AND collection = ? AND id = ?",
        )
        .bind(&key.scope.tenant_id)
        .bind(&key.scope.branch_id)
        .bind(&key.collection)
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(version)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &DocumentKey) -> DbResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, version, data FROM documents
             WHERE tenant_id = ? AND branch_id = ? AND collection = ? AND id = ?",
        )
        .bind(&key.scope.tenant_id)
        .bind(&key.scope.branch_id)
        .bind(&key.collection)
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Document::try_from).transpose()
    }

    async fn set(&self, key: &DocumentKey, data: Value) -> DbResult<i64> {
        ensure_object(&data)?;
        let body = serde_json::to_string(&data)?;

        let sql = format!(
            "INSERT INTO documents (tenant_id, branch_id, collection, id, version, data)
             VALUES (?, ?, ?, ?, 1, ?)
             ON CONFLICT (tenant_id, branch_id, collection, id) DO UPDATE SET
                 data = excluded.data,
                 version = documents.version + 1,
                 updated_at = {NOW}
             RETURNING version"
        );
        let version: i64 = sqlx::query_scalar(&sql)
            .bind(&key.scope.tenant_id)
            .bind(&key.scope.branch_id)
            .bind(&key.collection)
            .bind(&key.id)
            .bind(body)
            .fetch_one(&self.pool)
            .await?;

        Ok(version)
    }

    async fn update(&self, key: &DocumentKey, patch: Value) -> DbResult<i64> {
        ensure_object(&patch)?;
        let body = serde_json::to_string(&patch)?;

        let sql = format!(
            "UPDATE documents
             SET data = json_patch(data, ?), version = version + 1, updated_at = {NOW}
             WHERE tenant_id = ? AND branch_id = ? AND collection = ? AND id = ?
             RETURNING version"
        );
        let version: Option<i64> = sqlx::query_scalar(&sql)
            .bind(body)
            .bind(&key.scope.tenant_id)
            .bind(&key.scope.branch_id)
            .bind(&key.collection)
            .bind(&key.id)
            .fetch_optional(&self.pool)
            .await?;

        version.ok_or_else(|| DbError::not_found(&key.collection, &key.id))
    }

    async fn update_versioned(
        &self,
        key: &DocumentKey,
        expected_version: i64,
        patch: Value,
    ) -> DbResult<i64> {
        ensure_object(&patch)?;
        let body = serde_json::to_string(&patch)?;

        let sql = format!(
            "UPDATE documents
             SET data = json_patch(data, ?), version = version + 1, updated_at = {NOW}
             WHERE tenant_id = ? AND branch_id = ? AND collection = ? AND id = ?
               AND version = ?
             RETURNING version"
        );
        let version: Option<i64> = sqlx::query_scalar(&sql)
            .bind(body)
            .bind(&key.scope.tenant_id)
            .bind(&key.scope.branch_id)
            .bind(&key.collection)
            .bind(&key.id)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(version) = version {
            return Ok(version);
        }

        // Nothing matched: either the document is gone or someone won the race.
        match self.current_version(key).await? {
            None => Err(DbError::not_found(&key.collection, &key.id)),
            Some(actual) => Err(DbError::VersionConflict {
                key: key.to_string(),
                expected: expected_version,
                actual,
            }),
        }
    }

    async fn append(&self, collection: &CollectionRef, data: Value) -> DbResult<String> {
        ensure_object(&data)?;
        let body = serde_json::to_string(&data)?;
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO documents (tenant_id, branch_id, collection, id, version, data)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(&collection.scope.tenant_id)
        .bind(&collection.scope.branch_id)
        .bind(&collection.collection)
        .bind(&id)
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn append_guarded(
        &self,
        collection: &CollectionRef,
        data: Value,
        precondition: &Precondition,
    ) -> DbResult<String> {
        ensure_object(&data)?;
        let body = serde_json::to_string(&data)?;
        let path = json_path(&precondition.field)?;
        let expected = serde_json::to_string(&precondition.equals)?;
        let guard = &precondition.key;
        let id = Uuid::new_v4().to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::Internal(format!("begin transaction: {e}")))?;

        // Take the write lock first so the check and the insert see the same
        // state. An unbumped guard adds zero but still takes the lock.
        let sql = format!(
            "UPDATE documents
             SET version = version + ?,
                 updated_at = CASE WHEN ? THEN {NOW} ELSE updated_at END
             WHERE tenant_id = ? AND branch_id = ? AND collection = ? AND id = ?
               AND json_extract(data, ?) = json_extract(?, '$')
             RETURNING version"
        );
        let matched: Option<i64> = sqlx::query_scalar(&sql)
            .bind(i64::from(precondition.bump_version))
            .bind(precondition.bump_version)
            .bind(&guard.scope.tenant_id)
            .bind(&guard.scope.branch_id)
            .bind(&guard.collection)
            .bind(&guard.id)
            .bind(&path)
            .bind(&expected)
            .fetch_optional(&mut *tx)
            .await?;

        if matched.is_none() {
            let exists: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM documents
                 WHERE tenant_id = ? AND branch_id = ? AND collection = ? AND id = ?",
            )
            .bind(&guard.scope.tenant_id)
            .bind(&guard.scope.branch_id)
            .bind(&guard.collection)
            .bind(&guard.id)
            .fetch_optional(&mut *tx)
            .await?;

            debug!(key = %guard, field = %precondition.field, "Guarded append refused");
            return Err(match exists {
                None => DbError::not_found(&guard.collection, &guard.id),
                Some(_) => DbError::PreconditionFailed {
                    key: guard.to_string(),
                    field: precondition.field.clone(),
                },
            });
        }

        sqlx::query(
            "INSERT INTO documents (tenant_id, branch_id, collection, id, version, data)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(&collection.scope.tenant_id)
        .bind(&collection.scope.branch_id)
        .bind(&collection.collection)
        .bind(&id)
        .bind(body)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::Internal(format!("commit transaction: {e}")))?;

        Ok(id)
    }

    async fn query_eq(
        &self,
        collection: &CollectionRef,
        field: &str,
        value: &Value,
    ) -> DbResult<Vec<Document>> {
        let path = json_path(field)?;
        let expected = serde_json::to_string(value)?;

        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, version, data FROM documents
             WHERE tenant_id = ? AND branch_id = ? AND collection = ?
               AND json_extract(data, ?) = json_extract(?, '$')",
        )
        .bind(&collection.scope.tenant_id)
        .bind(&collection.scope.branch_id)
        .bind(&collection.collection)
        .bind(path)
        .bind(expected)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    async fn list(&self, collection: &CollectionRef) -> DbResult<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, version, data FROM documents
             WHERE tenant_id = ? AND branch_id = ? AND collection = ?",
        )
        .bind(&collection.scope.tenant_id)
        .bind(&collection.scope.branch_id)
        .bind(&collection.collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }
}
