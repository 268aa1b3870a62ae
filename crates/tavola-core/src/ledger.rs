//! # Ledger Aggregation
//!
//! Pure reduction of a register's movement ledger into a summary.
//!
//! ## Expected Balance
//! ```text
//! expected = initial
//!          + income + sales + deposits          (inflows)
//!          - expense - refunds - withdrawals    (outflows)
//!          + adjustment effect                  (policy decides the sign)
//! ```
//!
//! Movements whose linked order has been cancelled are voided: they stay
//! in the raw entry list but contribute nothing to any total.
//!
//! ## Determinism
//! `summarize` has no side effects and uses ordered maps, so the same
//! input snapshot always yields identical output.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{AdjustmentDirection, CashMovement, CashRegister, Flow, MovementType, PaymentMethod};

// =============================================================================
// Adjustment Policy
// =============================================================================

/// Decides how an adjustment movement moves the expected balance.
///
/// Amounts are stored unsigned, so an adjustment on its own says nothing
/// about direction. Implementations return the signed effect.
pub trait AdjustmentPolicy: Send + Sync + fmt::Debug {
    fn signed_amount(&self, movement: &CashMovement) -> Money;
}

/// Built-in adjustment policies, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentMode {
    /// Adjustments are reported in `total_adjustments` only and never
    /// change the expected balance.
    #[default]
    NetZero,
    /// Every adjustment adds to the expected balance.
    Credit,
    /// The movement's `adjustment_direction` decides; none means zero.
    Directed,
}

impl AdjustmentPolicy for AdjustmentMode {
    fn signed_amount(&self, movement: &CashMovement) -> Money {
        match self {
            AdjustmentMode::NetZero => Money::zero(),
            AdjustmentMode::Credit => movement.amount,
            AdjustmentMode::Directed => match movement.adjustment_direction {
                Some(AdjustmentDirection::Increase) => movement.amount,
                Some(AdjustmentDirection::Decrease) => -movement.amount,
                None => Money::zero(),
            },
        }
    }
}

impl fmt::Display for AdjustmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustmentMode::NetZero => write!(f, "net_zero"),
            AdjustmentMode::Credit => write!(f, "credit"),
            AdjustmentMode::Directed => write!(f, "directed"),
        }
    }
}

impl FromStr for AdjustmentMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "net_zero" | "netzero" | "exclude" => Ok(AdjustmentMode::NetZero),
            "credit" | "add" => Ok(AdjustmentMode::Credit),
            "directed" | "signed" => Ok(AdjustmentMode::Directed),
            other => Err(ValidationError::InvalidFormat {
                field: "adjustment_policy".to_string(),
                reason: format!("unknown policy '{}'; use net_zero, credit or directed", other),
            }),
        }
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashRegisterSummary {
    pub total_income: Money,
    pub total_expense: Money,
    pub total_sales: Money,
    pub total_refunds: Money,
    pub total_withdrawals: Money,
    pub total_deposits: Money,
    /// Gross (unsigned) sum of adjustment amounts.
    pub total_adjustments: Money,
    /// Signed contribution of adjustments under the active policy.
    pub adjustment_effect: Money,
    /// Net signed flow per payment method.
    pub payment_method_totals: BTreeMap<PaymentMethod, Money>,
    pub expected_balance: Money,
    /// Frozen count once closed; otherwise the running expected balance.
    pub actual_balance: Money,
    /// Present only once the register is closed.
    pub difference: Option<Money>,
    pub movement_count: usize,
    pub voided_count: usize,
    pub voided_total: Money,
}

impl CashRegisterSummary {
    fn empty(initial_balance: Money) -> Self {
        CashRegisterSummary {
            total_income: Money::zero(),
            total_expense: Money::zero(),
            total_sales: Money::zero(),
            total_refunds: Money::zero(),
            total_withdrawals: Money::zero(),
            total_deposits: Money::zero(),
            total_adjustments: Money::zero(),
            adjustment_effect: Money::zero(),
            payment_method_totals: BTreeMap::new(),
            expected_balance: initial_balance,
            actual_balance: initial_balance,
            difference: None,
            movement_count: 0,
            voided_count: 0,
            voided_total: Money::zero(),
        }
    }

    /// Sum of inflow categories, `None` on overflow.
    pub fn inflows(&self) -> Option<Money> {
        self.total_income
            .checked_add(self.total_sales)?
            .checked_add(self.total_deposits)
    }

    /// Sum of outflow categories, `None` on overflow.
    pub fn outflows(&self) -> Option<Money> {
        self.total_expense
            .checked_add(self.total_refunds)?
            .checked_add(self.total_withdrawals)
    }

    pub fn total_for(&self, movement_type: MovementType) -> Money {
        match movement_type {
            MovementType::Income => self.total_income,
            MovementType::Expense => self.total_expense,
            MovementType::Sale => self.total_sales,
            MovementType::Refund => self.total_refunds,
            MovementType::Withdrawal => self.total_withdrawals,
            MovementType::Deposit => self.total_deposits,
            MovementType::Adjustment => self.total_adjustments,
        }
    }
}

/// A movement as presented in the raw ledger listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerEntry {
    pub movement: CashMovement,
    /// Linked order was cancelled; excluded from every total.
    pub voided: bool,
}

pub fn is_voided(movement: &CashMovement, cancelled_orders: &HashSet<String>) -> bool {
    movement
        .order_id
        .as_ref()
        .is_some_and(|id| cancelled_orders.contains(id))
}

/// Sorts movements by creation time (ties broken by id) in place.
///
/// The store does not guarantee return order.
pub fn sort_movements(movements: &mut [CashMovement]) {
    movements.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// The raw movement list, in creation order, with void flags.
pub fn entries(movements: &[CashMovement], cancelled_orders: &HashSet<String>) -> Vec<LedgerEntry> {
    let mut sorted = movements.to_vec();
    sort_movements(&mut sorted);
    sorted
        .into_iter()
        .map(|movement| {
            let voided = is_voided(&movement, cancelled_orders);
            LedgerEntry { movement, voided }
        })
        .collect()
}

/// Reduces a register's ledger into its summary in a single pass.
///
/// Movements for other registers are ignored. Totals are accumulated with
/// checked arithmetic; a ledger whose sums leave the `i64` range fails with
/// [`ValidationError::Overflow`].
pub fn summarize(
    register: &CashRegister,
    movements: &[CashMovement],
    cancelled_orders: &HashSet<String>,
    policy: &dyn AdjustmentPolicy,
) -> Result<CashRegisterSummary, ValidationError> {
    let mut summary = CashRegisterSummary::empty(register.initial_balance);

    for movement in movements.iter().filter(|m| m.register_id == register.id) {
        summary.movement_count += 1;

        if is_voided(movement, cancelled_orders) {
            summary.voided_count += 1;
            accumulate(&mut summary.voided_total, movement.amount, "voided_total")?;
            continue;
        }

        let amount = movement.amount;
        let (bucket, field) = match movement.movement_type {
            MovementType::Income => (&mut summary.total_income, "total_income"),
            MovementType::Expense => (&mut summary.total_expense, "total_expense"),
            MovementType::Sale => (&mut summary.total_sales, "total_sales"),
            MovementType::Refund => (&mut summary.total_refunds, "total_refunds"),
            MovementType::Withdrawal => (&mut summary.total_withdrawals, "total_withdrawals"),
            MovementType::Deposit => (&mut summary.total_deposits, "total_deposits"),
            MovementType::Adjustment => (&mut summary.total_adjustments, "total_adjustments"),
        };
        accumulate(bucket, amount, field)?;

        let signed = match movement.movement_type.flow() {
            Flow::Inflow => amount,
            Flow::Outflow => amount.checked_neg().ok_or_else(|| overflow("amount"))?,
            Flow::Adjustment => {
                let effect = policy.signed_amount(movement);
                accumulate(&mut summary.adjustment_effect, effect, "adjustment_effect")?;
                effect
            }
        };

        let method_total = summary
            .payment_method_totals
            .entry(movement.payment_method)
            .or_insert_with(Money::zero);
        accumulate(method_total, signed, "payment_method_totals")?;
    }

    let inflows = summary.inflows().ok_or_else(|| overflow("expected_balance"))?;
    let outflows = summary.outflows().ok_or_else(|| overflow("expected_balance"))?;
    summary.expected_balance = register
        .initial_balance
        .checked_add(inflows)
        .and_then(|b| b.checked_sub(outflows))
        .and_then(|b| b.checked_add(summary.adjustment_effect))
        .ok_or_else(|| overflow("expected_balance"))?;

    match register.actual_balance {
        Some(actual) if !register.is_open() => {
            summary.actual_balance = actual;
            summary.difference = register.difference;
        }
        _ => summary.actual_balance = summary.expected_balance,
    }

    Ok(summary)
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}

fn accumulate(total: &mut Money, amount: Money, field: &str) -> Result<(), ValidationError> {
    *total = total.checked_add(amount).ok_or_else(|| overflow(field))?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
