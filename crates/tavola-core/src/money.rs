//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Reconciliation compares a counted drawer against an expected balance: │
//! │    expected = 100.00 + 50.10 - 20.20                                   │
//! │    in f64:   129.89999999999998  ❌ never "balanced"                    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    10000 + 5010 - 2020 = 12990 cents                                   │
//! │    counted 12990 cents → difference 0 → BALANCED                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tavola_core::money::Money;
//!
//! // Create from cents (preferred)
//! let initial = Money::from_cents(10_000); // 100.00
//!
//! // Parse operator input
//! let counted: Money = "129.90".parse().unwrap();
//!
//! assert_eq!((counted - initial).cents(), 2_990);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Differences and adjustment effects can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serialized as an integer**: Every persisted amount is fixed-point
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  CashRegister.initial_balance ──┐                                       │
/// │                                 ├──► Summary.expected_balance ──┐       │
/// │  CashMovement.amount (ledger) ──┘                               │       │
/// │                                                                 ▼       │
/// │  Operator count (denominations) ──► CashAudit.actual_cash ──► difference│
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use tavola_core::money::Money;
    ///
    /// let amount = Money::from_cents(1099); // Represents 10.99
    /// assert_eq!(amount.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -5.50, not -4.50.
    ///
    /// ```rust
    /// use tavola_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(130, 0).cents(), 13_000);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a count, returning `None` on overflow.
    ///
    /// Used for denomination totals where the count comes from operator
    /// input and cannot be trusted to stay small.
    ///
    /// ```rust
    /// use tavola_core::money::Money;
    ///
    /// let twenty = Money::from_cents(2_000);
    /// assert_eq!(twenty.checked_mul(3), Some(Money::from_cents(6_000)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_mul(2), None);
    /// ```
    #[inline]
    pub fn checked_mul(&self, count: i64) -> Option<Self> {
        self.0.checked_mul(count).map(Money)
    }

    /// Adds two values, returning `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtracts, returning `None` on overflow.
    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Self> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Negates, returning `None` for `i64::MIN` cents.
    #[inline]
    pub fn checked_neg(&self) -> Option<Self> {
        self.0.checked_neg().map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering (`130.00`, `-5.00`).
///
/// Tenants use different currencies, so no symbol is printed. Localized
/// formatting belongs to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Parses decimal text such as `"130"`, `"130.5"` or `"-5.00"`.
///
/// ## Rules
/// - Optional leading `+` or `-`
/// - Digits with at most one `.` and at most two fractional digits
/// - Anything else is a [`ValidationError::InvalidFormat`]
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };

        let (major, minor) = digits.split_once('.').unwrap_or((digits, ""));

        if major.is_empty() && minor.is_empty() {
            return Err(invalid("must be a number"));
        }
        if !major.chars().all(|c| c.is_ascii_digit()) || !minor.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("must be a number"));
        }
        if minor.len() > 2 {
            return Err(invalid("must have at most two decimal places"));
        }

        let overflow = || ValidationError::Overflow {
            field: "amount".to_string(),
        };

        let major_value: i64 = if major.is_empty() {
            0
        } else {
            major.parse().map_err(|_| overflow())?
        };
        let minor_value: i64 = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().map_err(|_| overflow())? * 10,
            _ => minor.parse().map_err(|_| overflow())?,
        };

        let cents = major_value
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor_value))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by i64 (denomination × count).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, count: i64) -> Self {
        Money(self.0 * count)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(13_000).to_string(), "130.00");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-500).to_string(), "-5.00");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!("130".parse::<Money>().unwrap().cents(), 13_000);
        assert_eq!("130.00".parse::<Money>().unwrap().cents(), 13_000);
        assert_eq!("130.5".parse::<Money>().unwrap().cents(), 13_050);
        assert_eq!(" 0.05 ".parse::<Money>().unwrap().cents(), 5);
        assert_eq!("-5.00".parse::<Money>().unwrap().cents(), -500);
        assert_eq!("+2".parse::<Money>().unwrap().cents(), 200);
        assert_eq!(".75".parse::<Money>().unwrap().cents(), 75);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("12,50".parse::<Money>().is_err());
        assert!("1.234".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
        assert!(matches!(
            "99999999999999999999".parse::<Money>(),
            Err(ValidationError::Overflow { .. })
        ));
    }

    #[test]
    fn test_parse_display_agree() {
        for cents in [0, 1, 99, 100, 12_345, -1, -12_345] {
            let money = Money::from_cents(cents);
            assert_eq!(money.to_string().parse::<Money>().unwrap(), money);
        }
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((b - a).cents(), -500);
        assert_eq!((-a).cents(), -1000);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_checked_ops() {
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_neg(), None);
        assert_eq!(Money::from_cents(-250).checked_neg(), Some(Money::from_cents(250)));
        assert_eq!(Money::from_cents(2).checked_mul(4), Some(Money::from_cents(8)));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
    }

    /// The float version of this sum is 129.89999999999998; cents are exact.
    #[test]
    fn test_no_float_drift() {
        let expected = Money::from_cents(10_000) + Money::from_cents(5_010) - Money::from_cents(2_020);
        let counted: Money = "129.90".parse().unwrap();
        assert!((counted - expected).is_zero());
    }

    #[test]
    fn test_serializes_as_integer_cents() {
        let json = serde_json::to_string(&Money::from_cents(13_000)).unwrap();
        assert_eq!(json, "13000");
    }
}
