//! # Repository Module
//!
//! Typed repositories over the document store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Entity ↔ Document Mapping                            │
//! │                                                                         │
//! │  CashRegister { id: "r1", name: "Bar", … }                             │
//! │       │ encode(): serialize, strip "id"                                 │
//! │       ▼                                                                 │
//! │  t1/b1/cash_registers/r1 → { "name": "Bar", … }   version 1            │
//! │       │ decode(): deserialize, inject document id                       │
//! │       ▼                                                                 │
//! │  CashRegister { id: "r1", name: "Bar", … }                             │
//! │                                                                         │
//! │  Listing methods sort explicitly; the store returns no order.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`RegisterRepository`] - Register open/close, open-register lookup
//! - [`MovementRepository`] - Append-only ledger entries
//! - [`AuditRepository`] - Append-only audit snapshots
//! - [`OrderRepository`] - Order status reads (and writes for seeding/tests)

pub mod audit;
pub mod movement;
pub mod order;
pub mod register;

pub use audit::AuditRepository;
pub use movement::MovementRepository;
pub use order::OrderRepository;
pub use register::RegisterRepository;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DbError, DbResult};
use crate::store::Document;

/// Collection names.
pub mod collections {
    pub const REGISTERS: &str = "cash_registers";
    pub const MOVEMENTS: &str = "cash_movements";
    pub const AUDITS: &str = "cash_audits";
    pub const ORDERS: &str = "orders";
}

/// An entity together with the document version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: i64,
    pub value: T,
}

pub(crate) fn decode<T: DeserializeOwned>(doc: Document) -> DbResult<T> {
    let mut data = doc.data;
    match data.as_object_mut() {
        Some(map) => {
            map.insert("id".to_string(), Value::String(doc.id));
        }
        None => {
            return Err(DbError::Serialization(format!(
                "document {} is not an object",
                doc.id
            )))
        }
    }
    Ok(serde_json::from_value(data)?)
}

pub(crate) fn decode_versioned<T: DeserializeOwned>(doc: Document) -> DbResult<Versioned<T>> {
    let version = doc.version;
    Ok(Versioned {
        version,
        value: decode(doc)?,
    })
}

pub(crate) fn encode<T: Serialize>(entity: &T) -> DbResult<Value> {
    let mut data = serde_json::to_value(entity)?;
    if let Some(map) = data.as_object_mut() {
        map.remove("id");
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Thing {
        #[serde(default)]
        id: String,
        name: String,
    }

    #[test]
    fn test_encode_strips_id_and_decode_injects_it() {
        let data = encode(&Thing {
            id: "ignored".into(),
            name: "a".into(),
        })
        .unwrap();
        assert_eq!(data, json!({"name": "a"}));

        let thing: Thing = decode(Document {
            id: "doc-1".into(),
            version: 4,
            data,
        })
        .unwrap();
        assert_eq!(thing.id, "doc-1");
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let res: DbResult<Thing> = decode(Document {
            id: "x".into(),
            version: 1,
            data: json!(3),
        });
        assert!(matches!(res, Err(DbError::Serialization(_))));
    }
}
