//! # Cash Desk Errors
//!
//! What every service operation returns, and how it is shown.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Cash Desk                          │
//! │                                                                         │
//! │  ValidationError ──┐                                                    │
//! │  CoreError ────────┼──► CashError ──► kind() ──► ErrorKind              │
//! │  DbError ──────────┘        │                                           │
//! │                             ▼                                           │
//! │                       Notification { code, message, dismissable }       │
//! │                                                                         │
//! │  Transport failures are logged with their detail and shown with a      │
//! │  generic message; the operator retries from the UI.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use tavola_core::{CoreError, RegisterStatus, ValidationError};
use tavola_db::DbError;

// =============================================================================
// Error Kind
// =============================================================================

/// The taxonomy callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed input (negative amount, empty name, non-numeric balance)
    Validation,
    /// Referenced register/movement/audit does not exist
    NotFound,
    /// Register in the wrong lifecycle state
    InvalidState,
    /// Store or network failure
    Transport,
    /// Bad or unreadable configuration
    Configuration,
}

// =============================================================================
// Cash Error
// =============================================================================

#[derive(Debug, Error)]
pub enum CashError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// ## When This Occurs
    /// - Recording a movement or audit against a closed register
    /// - Closing a register twice
    #[error("Register {register_id} is {status}, cannot {operation}")]
    InvalidState {
        register_id: String,
        status: RegisterStatus,
        operation: String,
    },

    /// A branch already has an open register (single-open policy).
    #[error("Register {register_id} is already open in this branch")]
    AlreadyOpen { register_id: String },

    /// A strict write lost a race; the register changed since it was read.
    #[error("Register {register_id} was modified concurrently, reload and retry")]
    ConcurrentModification { register_id: String },

    #[error("Store unavailable: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CashError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        CashError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CashError::Validation(_) => ErrorKind::Validation,
            CashError::NotFound { .. } => ErrorKind::NotFound,
            CashError::InvalidState { .. }
            | CashError::AlreadyOpen { .. }
            | CashError::ConcurrentModification { .. } => ErrorKind::InvalidState,
            CashError::Transport(_) => ErrorKind::Transport,
            CashError::Config(_) => ErrorKind::Configuration,
        }
    }
}

/// Store errors the services do not map themselves.
///
/// ## Error Mapping
/// ```text
/// DbError::NotFound            → CashError::NotFound
/// DbError::VersionConflict     → CashError::ConcurrentModification
/// DbError::PreconditionFailed  → CashError::ConcurrentModification
/// everything else              → CashError::Transport
/// ```
impl From<DbError> for CashError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CashError::NotFound { entity, id },
            DbError::VersionConflict { key, .. } | DbError::PreconditionFailed { key, .. } => {
                CashError::ConcurrentModification { register_id: key }
            }
            other => CashError::Transport(other.to_string()),
        }
    }
}

impl From<CoreError> for CashError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRegisterStatus {
                register_id,
                status,
                operation,
            } => CashError::InvalidState {
                register_id,
                status,
                operation: operation.to_string(),
            },
            CoreError::Validation(e) => CashError::Validation(e),
        }
    }
}

impl From<std::io::Error> for CashError {
    fn from(err: std::io::Error) -> Self {
        CashError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for CashError {
    fn from(err: toml::de::Error) -> Self {
        CashError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CashError {
    fn from(err: toml::ser::Error) -> Self {
        CashError::Config(err.to_string())
    }
}

pub type CashResult<T> = Result<T, CashError>;

// =============================================================================
// Notification
// =============================================================================

/// The dismissable message the admin UI renders for a failed operation.
///
/// ```json
/// { "code": "INVALID_STATE", "message": "Register r1 is closed, cannot close", "dismissable": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub code: ErrorKind,
    pub message: String,
    pub dismissable: bool,
}

impl From<&CashError> for Notification {
    fn from(err: &CashError) -> Self {
        let message = match err {
            CashError::Transport(detail) => {
                tracing::error!(error = %detail, "Cash desk store failure");
                "The register service is unavailable. Please try again.".to_string()
            }
            CashError::Config(detail) => {
                tracing::error!(error = %detail, "Cash desk configuration failure");
                "The cash desk is misconfigured. Contact support.".to_string()
            }
            other => other.to_string(),
        };

        Notification {
            code: err.kind(),
            message,
            dismissable: true,
        }
    }
}

impl From<CashError> for Notification {
    fn from(err: CashError) -> Self {
        Notification::from(&err)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let validation: CashError = ValidationError::Required {
            field: "name".into(),
        }
        .into();
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(CashError::not_found("CashRegister", "r1").kind(), ErrorKind::NotFound);
        assert_eq!(
            CashError::AlreadyOpen {
                register_id: "r1".into()
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(CashError::Transport("x".into()).kind(), ErrorKind::Transport);
        assert_eq!(CashError::Config("x".into()).kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_db_error_mapping() {
        let err: CashError = DbError::not_found("CashRegister", "r1").into();
        assert!(matches!(err, CashError::NotFound { .. }));

        let err: CashError = DbError::PoolExhausted.into();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err: CashError = DbError::VersionConflict {
            key: "t/b/cash_registers/r1".into(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(err, CashError::ConcurrentModification { .. }));
    }

    #[test]
    fn test_core_error_mapping() {
        let err: CashError = CoreError::InvalidRegisterStatus {
            register_id: "r1".into(),
            status: RegisterStatus::Closed,
            operation: "close",
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.to_string(), "Register r1 is closed, cannot close");
    }

    #[test]
    fn test_notification_rendering() {
        let note = Notification::from(CashError::InvalidState {
            register_id: "r1".into(),
            status: RegisterStatus::Closed,
            operation: "record a movement".into(),
        });
        assert!(note.dismissable);
        assert_eq!(note.message, "Register r1 is closed, cannot record a movement");

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["code"], "INVALID_STATE");
    }

    #[test]
    fn test_transport_notification_hides_detail() {
        let note = Notification::from(CashError::Transport("disk I/O error at 0x3f".into()));
        assert_eq!(note.code, ErrorKind::Transport);
        assert!(!note.message.contains("0x3f"));
    }
}
