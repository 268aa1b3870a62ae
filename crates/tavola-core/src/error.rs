//! # Error Types
//!
//! Domain-specific error types for tavola-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tavola-core errors (this file)                                        │
//! │  ├── CoreError        - Register state machine violations              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tavola-db errors (separate crate)                                     │
//! │  └── DbError          - Document store failures                        │
//! │                                                                         │
//! │  tavola-desk errors                                                    │
//! │  ├── CashError        - What services return (taxonomy + kind())       │
//! │  └── Notification     - What the UI shows (dismissable)                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CashError → Notification          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::RegisterStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Register is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Recording a movement against a closed register
    /// - Auditing a closed register
    /// - Closing a register twice
    #[error("Register {register_id} is {status}, cannot {operation}")]
    InvalidRegisterStatus {
        register_id: String,
        status: RegisterStatus,
        operation: &'static str,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet requirements.
/// Used for early validation before anything is written.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or positive.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., non-numeric amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two values that must agree do not.
    ///
    /// ## When This Occurs
    /// - Denomination breakdown does not add up to the counted total
    #[error("{field} mismatch: expected {expected}, got {actual}")]
    Mismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Numeric value outside the accepted range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Arithmetic overflow while computing a value from input.
    #[error("{field} is too large")]
    Overflow { field: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustBeNonNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Mismatch { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Overflow { field } => field,
        }
    }

    /// Re-labels the error with a different field name.
    ///
    /// `Money::from_str` reports errors against `amount`; callers parsing a
    /// specific input (e.g. `initial_balance`) rename it.
    pub fn with_field(self, name: &str) -> Self {
        let field = name.to_string();
        match self {
            ValidationError::Required { .. } => ValidationError::Required { field },
            ValidationError::TooLong { max, .. } => ValidationError::TooLong { field, max },
            ValidationError::MustBePositive { .. } => ValidationError::MustBePositive { field },
            ValidationError::MustBeNonNegative { .. } => {
                ValidationError::MustBeNonNegative { field }
            }
            ValidationError::InvalidFormat { reason, .. } => {
                ValidationError::InvalidFormat { field, reason }
            }
            ValidationError::Mismatch {
                expected, actual, ..
            } => ValidationError::Mismatch {
                field,
                expected,
                actual,
            },
            ValidationError::OutOfRange { min, max, .. } => {
                ValidationError::OutOfRange { field, min, max }
            }
            ValidationError::Overflow { .. } => ValidationError::Overflow { field },
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidRegisterStatus {
            register_id: "reg-1".to_string(),
            status: RegisterStatus::Closed,
            operation: "record a movement",
        };
        assert_eq!(
            err.to_string(),
            "Register reg-1 is closed, cannot record a movement"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::Mismatch {
            field: "denominations".to_string(),
            expected: "130.00".to_string(),
            actual: "125.00".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "denominations mismatch: expected 130.00, got 125.00"
        );
    }

    #[test]
    fn test_with_field_relabels() {
        let err = ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: "must be a number".to_string(),
        }
        .with_field("initial_balance");
        assert_eq!(err.field(), "initial_balance");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
