//! # Reconciliation
//!
//! Compares counted cash against the expected balance and classifies the
//! result.
//!
//! ```text
//! difference = counted - expected
//!
//!   difference == 0  →  Balanced
//!   difference  > 0  →  Surplus   (more cash than the ledger explains)
//!   difference  < 0  →  Shortage  (cash is missing)
//! ```
//!
//! Both sides are integer cents, so the balanced case is an exact
//! comparison with no tolerance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Audit Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Balanced,
    Surplus,
    Shortage,
}

impl AuditStatus {
    /// Classifies a difference. Total: every input maps to exactly one status.
    pub fn classify(difference: Money) -> Self {
        match difference.cents().signum() {
            0 => AuditStatus::Balanced,
            1 => AuditStatus::Surplus,
            _ => AuditStatus::Shortage,
        }
    }
}

/// Outcome of comparing a count with the expected balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub expected: Money,
    pub actual: Money,
    pub difference: Money,
    pub status: AuditStatus,
}

/// Fails with `Overflow` when `actual - expected` leaves the `i64` range.
pub fn reconcile(expected: Money, actual: Money) -> Result<Reconciliation, ValidationError> {
    let difference = actual
        .checked_sub(expected)
        .ok_or_else(|| ValidationError::Overflow {
            field: "difference".to_string(),
        })?;
    Ok(Reconciliation {
        expected,
        actual,
        difference,
        status: AuditStatus::classify(difference),
    })
}

// =============================================================================
// Denominations
// =============================================================================

/// Operator's physical count, keyed by face value in cents.
///
/// ```json
/// { "bills": { "2000": 6, "1000": 1 }, "coins": { "100": 3 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Denominations {
    #[serde(default)]
    pub bills: BTreeMap<i64, u32>,
    #[serde(default)]
    pub coins: BTreeMap<i64, u32>,
}

impl Denominations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bill(mut self, face_cents: i64, count: u32) -> Self {
        *self.bills.entry(face_cents).or_insert(0) += count;
        self
    }

    pub fn coin(mut self, face_cents: i64, count: u32) -> Self {
        *self.coins.entry(face_cents).or_insert(0) += count;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bills.values().chain(self.coins.values()).all(|c| *c == 0)
    }

    /// Σ(face × count) over bills and coins.
    ///
    /// Face values must be positive. Overflow is reported rather than
    /// wrapped, since counts are operator input.
    pub fn total(&self) -> Result<Money, ValidationError> {
        let overflow = || ValidationError::Overflow {
            field: "denominations".to_string(),
        };

        let mut total = Money::zero();
        for (face, count) in self.bills.iter().chain(self.coins.iter()) {
            if *face <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "denomination".to_string(),
                });
            }
            let line = Money::from_cents(*face)
                .checked_mul(i64::from(*count))
                .ok_or_else(overflow)?;
            total = total.checked_add(line).ok_or_else(overflow)?;
        }
        Ok(total)
    }

    /// Fails with `Mismatch` unless the breakdown adds up to `counted`.
    pub fn verify(&self, counted: Money) -> Result<(), ValidationError> {
        let total = self.total()?;
        if total != counted {
            return Err(ValidationError::Mismatch {
                field: "denominations".to_string(),
                expected: counted.to_string(),
                actual: total.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_balanced() {
        let r = reconcile(Money::from_cents(13_000), Money::from_cents(13_000)).unwrap();
        assert_eq!(r.status, AuditStatus::Balanced);
        assert!(r.difference.is_zero());
    }

    #[test]
    fn test_reconcile_shortage() {
        let r = reconcile(Money::from_cents(13_000), Money::from_cents(12_500)).unwrap();
        assert_eq!(r.status, AuditStatus::Shortage);
        assert_eq!(r.difference.to_string(), "-5.00");
    }

    #[test]
    fn test_reconcile_surplus() {
        let r = reconcile(Money::from_cents(13_000), Money::from_cents(13_001)).unwrap();
        assert_eq!(r.status, AuditStatus::Surplus);
        assert_eq!(r.difference.cents(), 1);
    }

    /// Exactly one status per pair, and its sign matches the difference.
    #[test]
    fn test_classification_is_total() {
        let samples = [-100_000, -101, -1, 0, 1, 99, 100_000];
        for expected in samples {
            for counted in samples {
                let r = reconcile(Money::from_cents(expected), Money::from_cents(counted)).unwrap();
                let by_sign = match r.difference.cents() {
                    d if d == 0 => AuditStatus::Balanced,
                    d if d > 0 => AuditStatus::Surplus,
                    _ => AuditStatus::Shortage,
                };
                assert_eq!(r.status, by_sign, "expected={expected} counted={counted}");
                assert_eq!(r.difference.cents(), counted - expected);
            }
        }
    }

    #[test]
    fn test_reconcile_overflow_is_reported() {
        let err = reconcile(Money::from_cents(i64::MIN + 1), Money::from_cents(100_000)).unwrap_err();
        assert!(matches!(err, ValidationError::Overflow { .. }));
        assert_eq!(err.field(), "difference");
    }

    #[test]
    fn test_denomination_total() {
        let d = Denominations::new().bill(2_000, 6).bill(1_000, 1).coin(100, 3).coin(5, 0);
        assert_eq!(d.total().unwrap().cents(), 13_300);
        assert!(d.verify(Money::from_cents(13_300)).is_ok());
    }

    #[test]
    fn test_denomination_mismatch() {
        let d = Denominations::new().bill(5_000, 2);
        let err = d.verify(Money::from_cents(13_000)).unwrap_err();
        assert!(matches!(err, ValidationError::Mismatch { .. }));
        assert_eq!(
            err.to_string(),
            "denominations mismatch: expected 130.00, got 100.00"
        );
    }

    #[test]
    fn test_denomination_rejects_bad_face_value() {
        let d = Denominations::new().coin(0, 3);
        assert!(matches!(d.total(), Err(ValidationError::MustBePositive { .. })));
    }

    #[test]
    fn test_denomination_overflow() {
        let d = Denominations::new().bill(i64::MAX, 2);
        assert!(matches!(d.total(), Err(ValidationError::Overflow { .. })));
    }

    #[test]
    fn test_denominations_json_keys() {
        let d = Denominations::new().bill(2_000, 6).coin(50, 2);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["bills"]["2000"], 6);

        let back: Denominations = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_empty_denominations() {
        assert!(Denominations::new().is_empty());
        assert!(Denominations::new().coin(5, 0).is_empty());
        assert_eq!(Denominations::new().total().unwrap(), Money::zero());
    }
}
