//! # Validation Module
//!
//! Input validation for cash desk operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Admin UI                                                     │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate operator feedback                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: tavola-desk services                                         │
//! │  ├── Type validation (deserialization, Money parsing)                  │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Document store                                               │
//! │  ├── json_valid CHECK constraint                                       │
//! │  └── Versioned / guarded writes                                        │
//! │                                                                         │
//! │  Every check here runs before anything is written.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tavola_core::money::Money;
//! use tavola_core::validation::{validate_movement_amount, validate_register_name};
//!
//! validate_register_name("Front counter").unwrap();
//! validate_movement_amount(Money::from_cents(5_000)).unwrap();
//! assert!(validate_movement_amount(Money::zero()).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Actor, MovementType, NewMovement, Scope};
use crate::{MAX_AMOUNT_CENTS, MAX_DESCRIPTION_LEN, MAX_NOTES_LEN, MAX_REGISTER_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize, required: bool) -> ValidationResult<()> {
    let value = value.trim();

    if required && value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a register name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most MAX_REGISTER_NAME_LEN (100) characters
///
/// ## Example
/// ```rust
/// use tavola_core::validation::validate_register_name;
///
/// assert!(validate_register_name("Bar").is_ok());
/// assert!(validate_register_name("   ").is_err());
/// ```
pub fn validate_register_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, MAX_REGISTER_NAME_LEN, true)
}

/// Validates a movement description. Required, at most 500 characters.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    validate_text("description", description, MAX_DESCRIPTION_LEN, true)
}

/// Validates optional free-text notes (opening, closing, audit).
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(n) => validate_text("notes", n, MAX_NOTES_LEN, false),
        None => Ok(()),
    }
}

/// Trims notes and turns blank input into `None`.
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

pub fn validate_actor(actor: &Actor) -> ValidationResult<()> {
    if actor.user_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "user_id".to_string(),
        });
    }
    Ok(())
}

pub fn validate_scope(scope: &Scope) -> ValidationResult<()> {
    if scope.tenant_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "tenant_id".to_string(),
        });
    }
    if scope.branch_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "branch_id".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Monetary Validators
// =============================================================================

/// Parses operator-entered decimal text into Money.
///
/// Errors are labelled with `field` instead of the generic `amount`.
///
/// ## Example
/// ```rust
/// use tavola_core::validation::parse_amount;
///
/// assert_eq!(parse_amount("initial_balance", "100").unwrap().cents(), 10_000);
/// assert_eq!(
///     parse_amount("initial_balance", "abc").unwrap_err().field(),
///     "initial_balance"
/// );
/// ```
pub fn parse_amount(field: &str, raw: &str) -> ValidationResult<Money> {
    if raw.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    raw.parse::<Money>().map_err(|e| e.with_field(field))
}

fn validate_ceiling(field: &str, amount: Money, min: i64) -> ValidationResult<()> {
    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

/// Opening float. Zero is allowed; negative is not.
pub fn validate_initial_balance(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: "initial_balance".to_string(),
        });
    }
    validate_ceiling("initial_balance", amount, 0)
}

/// Movement amounts are stored unsigned and must be strictly positive.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Register: Record Movement                                              │
/// │                                                                         │
/// │  Operator enters amount: "50"                                          │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  parse_amount("amount", "50") → 5000 cents                             │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_movement_amount(5000) ← THIS FUNCTION                        │
/// │       │                                                                 │
/// │       ├── amount <= 0? → Error: "amount must be positive"              │
/// │       ├── amount > MAX_AMOUNT_CENTS? → Error: out of range             │
/// │       │                                                                 │
/// │       └── OK → append to ledger                                        │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_movement_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    validate_ceiling("amount", amount, 1)
}

/// A physical count: zero or more.
pub fn validate_counted_total(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }
    validate_ceiling(field, amount, 0)
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Everything a movement must satisfy before it reaches the ledger.
pub fn validate_new_movement(movement: &NewMovement) -> ValidationResult<()> {
    validate_movement_amount(movement.amount)?;
    validate_description(&movement.description)?;

    if movement.adjustment_direction.is_some()
        && movement.movement_type != MovementType::Adjustment
    {
        return Err(ValidationError::InvalidFormat {
            field: "adjustment_direction".to_string(),
            reason: "only allowed on adjustment movements".to_string(),
        });
    }

    if let Some(order_id) = &movement.order_id {
        if order_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "order_id".to_string(),
            });
        }
    }

    if let Some(reference) = &movement.reference {
        validate_text("reference", reference, MAX_DESCRIPTION_LEN, false)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdjustmentDirection, PaymentMethod};

    #[test]
    fn test_validate_register_name() {
        assert!(validate_register_name("Front counter").is_ok());
        assert!(validate_register_name("").is_err());
        assert!(validate_register_name("   ").is_err());
        assert!(validate_register_name(&"A".repeat(100)).is_ok());
        assert!(validate_register_name(&"A".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_initial_balance() {
        assert!(validate_initial_balance(Money::zero()).is_ok());
        assert!(validate_initial_balance(Money::from_cents(10_000)).is_ok());
        assert!(validate_initial_balance(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_movement_amount() {
        assert!(validate_movement_amount(Money::from_cents(1)).is_ok());
        assert!(validate_movement_amount(Money::zero()).is_err());
        assert!(validate_movement_amount(Money::from_cents(-500)).is_err());
    }

    #[test]
    fn test_amount_ceiling() {
        let max = Money::from_cents(MAX_AMOUNT_CENTS);
        let over = Money::from_cents(MAX_AMOUNT_CENTS + 1);

        assert!(validate_movement_amount(max).is_ok());
        assert!(validate_initial_balance(max).is_ok());
        assert!(validate_counted_total("counted_total", max).is_ok());

        assert!(matches!(
            validate_movement_amount(over),
            Err(ValidationError::OutOfRange { min: 1, .. })
        ));
        assert!(matches!(
            validate_initial_balance(Money::from_cents(i64::MAX)),
            Err(ValidationError::OutOfRange { min: 0, .. })
        ));
        assert_eq!(
            validate_counted_total("actual_balance", over).unwrap_err().field(),
            "actual_balance"
        );
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("amount", "50").unwrap().cents(), 5_000);
        assert_eq!(parse_amount("amount", "12.5").unwrap().cents(), 1_250);

        let err = parse_amount("actual_balance", "").unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
        assert_eq!(err.field(), "actual_balance");

        let err = parse_amount("actual_balance", "12,50").unwrap_err();
        assert_eq!(err.field(), "actual_balance");
    }

    #[test]
    fn test_validate_new_movement() {
        let ok = NewMovement::new(
            MovementType::Sale,
            Money::from_cents(5_000),
            PaymentMethod::Cash,
            "Table 4",
        );
        assert!(validate_new_movement(&ok).is_ok());

        let blank = NewMovement::new(MovementType::Sale, Money::from_cents(1), PaymentMethod::Cash, " ");
        assert!(matches!(
            validate_new_movement(&blank),
            Err(ValidationError::Required { .. })
        ));

        let misdirected = ok.clone().directed(AdjustmentDirection::Increase);
        assert!(matches!(
            validate_new_movement(&misdirected),
            Err(ValidationError::InvalidFormat { .. })
        ));

        let adjustment = NewMovement::new(
            MovementType::Adjustment,
            Money::from_cents(100),
            PaymentMethod::Cash,
            "Till correction",
        )
        .directed(AdjustmentDirection::Decrease);
        assert!(validate_new_movement(&adjustment).is_ok());
    }

    #[test]
    fn test_actor_and_scope() {
        assert!(validate_actor(&Actor::new("u1")).is_ok());
        assert!(validate_actor(&Actor::new(" ")).is_err());
        assert!(validate_scope(&Scope::new("t1", "b1")).is_ok());
        assert_eq!(
            validate_scope(&Scope::new("t1", "")).unwrap_err().field(),
            "branch_id"
        );
    }

    #[test]
    fn test_notes() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some(&"x".repeat(1_001))).is_err());
        assert_eq!(normalize_notes(Some("  ".to_string())), None);
        assert_eq!(normalize_notes(Some(" ok ".to_string())).as_deref(), Some("ok"));
    }
}
