//! # Register Repository
//!
//! Store operations for cash registers.
//!
//! ## Register Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Register Lifecycle                                │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── create() → append { status: "open", initial_balance, … }       │
//! │                                                                         │
//! │  2. RECORD / AUDIT (other repositories, register stays open)           │
//! │     └── open_guard() → precondition for guarded appends                │
//! │                                                                         │
//! │  3. CLOSE (terminal)                                                   │
//! │     └── close()            plain merge patch          (lenient)        │
//! │     └── close_versioned()  compare-and-set on version (strict)         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::{collections, decode, decode_versioned, encode, Versioned};
use crate::error::{DbError, DbResult};
use crate::store::{CollectionRef, DocumentKey, DocumentStore, Precondition};
use tavola_core::{CashRegister, RegisterStatus, Scope};

/// Repository for cash register documents.
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    store: Arc<dyn DocumentStore>,
}

impl RegisterRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        RegisterRepository { store }
    }

    fn collection(scope: &Scope) -> CollectionRef {
        CollectionRef::new(scope, collections::REGISTERS)
    }

    pub fn key(scope: &Scope, register_id: &str) -> DocumentKey {
        Self::collection(scope).doc(register_id)
    }

    /// Persists a freshly opened register; returns its generated id.
    pub async fn create(&self, register: &CashRegister) -> DbResult<String> {
        let scope = register.scope();
        let id = self
            .store
            .append(&Self::collection(&scope), encode(register)?)
            .await?;

        debug!(register_id = %id, scope = %scope, "Register created");
        Ok(id)
    }

    /// Gets a register with the version it was read at.
    pub async fn get(
        &self,
        scope: &Scope,
        register_id: &str,
    ) -> DbResult<Option<Versioned<CashRegister>>> {
        self.store
            .get(&Self::key(scope, register_id))
            .await?
            .map(decode_versioned)
            .transpose()
    }

    /// As [`Self::get`], but a missing register is `NotFound`.
    pub async fn find(&self, scope: &Scope, register_id: &str) -> DbResult<Versioned<CashRegister>> {
        self.get(scope, register_id)
            .await?
            .ok_or_else(|| DbError::not_found("CashRegister", register_id))
    }

    /// All registers in the branch, oldest first.
    pub async fn list(&self, scope: &Scope) -> DbResult<Vec<CashRegister>> {
        let docs = self.store.list(&Self::collection(scope)).await?;
        let mut registers = docs
            .into_iter()
            .map(decode::<CashRegister>)
            .collect::<DbResult<Vec<_>>>()?;
        sort_by_opened(&mut registers);
        Ok(registers)
    }

    /// Registers currently open in the branch, oldest first.
    pub async fn list_open(&self, scope: &Scope) -> DbResult<Vec<CashRegister>> {
        let docs = self
            .store
            .query_eq(
                &Self::collection(scope),
                "status",
                &json!(RegisterStatus::Open.as_str()),
            )
            .await?;
        let mut registers = docs
            .into_iter()
            .map(decode::<CashRegister>)
            .collect::<DbResult<Vec<_>>>()?;
        sort_by_opened(&mut registers);
        Ok(registers)
    }

    /// Writes the frozen closing fields of `closed` without a version check.
    pub async fn close(&self, closed: &CashRegister) -> DbResult<i64> {
        let key = Self::key(&closed.scope(), &closed.id);
        let version = self.store.update(&key, closing_patch(closed)).await?;
        debug!(register_id = %closed.id, version, "Register closed");
        Ok(version)
    }

    /// Writes the closing fields only if the register is still at
    /// `expected_version`.
    pub async fn close_versioned(&self, closed: &CashRegister, expected_version: i64) -> DbResult<i64> {
        let key = Self::key(&closed.scope(), &closed.id);
        let version = self
            .store
            .update_versioned(&key, expected_version, closing_patch(closed))
            .await?;
        debug!(register_id = %closed.id, version, "Register closed (versioned)");
        Ok(version)
    }

    /// Precondition "register is open", for guarded appends.
    pub fn open_guard(scope: &Scope, register_id: &str) -> Precondition {
        Precondition::field_equals(
            Self::key(scope, register_id),
            "status",
            RegisterStatus::Open.as_str(),
        )
    }

    /// "Register is open" without bumping its version. For writes that do
    /// not feed the expected balance, so they never fail a concurrent close.
    pub fn open_check(scope: &Scope, register_id: &str) -> Precondition {
        Self::open_guard(scope, register_id).without_bump()
    }
}

fn closing_patch(closed: &CashRegister) -> serde_json::Value {
    json!({
        "status": closed.status,
        "closed_by": closed.closed_by,
        "closed_at": closed.closed_at,
        "expected_balance": closed.expected_balance,
        "actual_balance": closed.actual_balance,
        "difference": closed.difference,
        "closing_notes": closed.closing_notes,
    })
}

fn sort_by_opened(registers: &mut [CashRegister]) {
    registers.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};
    use tavola_core::{Actor, Money, RegisterClosing};

    fn repo() -> RegisterRepository {
        RegisterRepository::new(Arc::new(MemoryStore::new()))
    }

    fn register(name: &str, minutes: i64) -> CashRegister {
        CashRegister::open(
            &Scope::new("t1", "b1"),
            name,
            Money::from_cents(10_000),
            &Actor::new("u1"),
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes),
            None,
        )
    }

    fn closed(mut reg: CashRegister) -> CashRegister {
        reg.close(RegisterClosing {
            expected_balance: Money::from_cents(13_000),
            actual_balance: Money::from_cents(12_500),
            closed_by: "u2".into(),
            closed_at: Utc::now(),
            notes: Some("short".into()),
        })
        .unwrap();
        reg
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = repo();
        let scope = Scope::new("t1", "b1");
        let id = repo.create(&register("Bar", 0)).await.unwrap();

        let got = repo.find(&scope, &id).await.unwrap();
        assert_eq!(got.version, 1);
        assert_eq!(got.value.id, id);
        assert_eq!(got.value.name, "Bar");
        assert_eq!(got.value.status, RegisterStatus::Open);

        assert!(repo.get(&scope, "missing").await.unwrap().is_none());
        assert!(matches!(
            repo.find(&scope, "missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_writes_frozen_fields() {
        let repo = repo();
        let scope = Scope::new("t1", "b1");
        let id = repo.create(&register("Bar", 0)).await.unwrap();

        let mut reg = repo.find(&scope, &id).await.unwrap().value;
        reg = closed(reg);
        repo.close(&reg).await.unwrap();

        let stored = repo.find(&scope, &id).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.value.status, RegisterStatus::Closed);
        assert_eq!(stored.value.difference, Some(Money::from_cents(-500)));
        assert_eq!(stored.value.initial_balance, Money::from_cents(10_000));
        assert!(repo.list_open(&scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_versioned_conflict() {
        let repo = repo();
        let scope = Scope::new("t1", "b1");
        let id = repo.create(&register("Bar", 0)).await.unwrap();
        let read = repo.find(&scope, &id).await.unwrap();

        let reg = closed(read.value.clone());
        repo.close_versioned(&reg, read.version).await.unwrap();
        assert!(matches!(
            repo.close_versioned(&reg, read.version).await,
            Err(DbError::VersionConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_opened_at() {
        let repo = repo();
        let scope = Scope::new("t1", "b1");
        repo.create(&register("Late", 30)).await.unwrap();
        repo.create(&register("Early", 0)).await.unwrap();
        repo.create(&register("Middle", 10)).await.unwrap();

        let names: Vec<_> = repo
            .list(&scope)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Early", "Middle", "Late"]);
        assert_eq!(repo.list_open(&scope).await.unwrap().len(), 3);
    }
}
