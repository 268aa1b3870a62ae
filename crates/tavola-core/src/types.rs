//! # Domain Types
//!
//! Core domain types used throughout the Tavola cash desk.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CashRegister   │   │  CashMovement   │   │   CashAudit     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  register_id    │   │  register_id ───┼──►    │
//! │  │  status         │   │  movement_type  │   │  expected_cash  │       │
//! │  │  initial_balance│   │  amount (>0)    │   │  actual_cash    │       │
//! │  │  difference     │   │  payment_method │   │  status         │       │
//! │  └─────────────────┘   │  order_id?      │   │  denominations? │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Registers own movements and audits by back-reference (register_id),   │
//! │  never by embedding. Everything is scoped to (tenant, branch).         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::reconciliation::{reconcile, AuditStatus, Denominations, Reconciliation};

// =============================================================================
// Scope & Identity
// =============================================================================

/// The (tenant, branch) pair every entity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Scope {
    pub tenant_id: String,
    pub branch_id: String,
}

impl Scope {
    pub fn new(tenant_id: impl Into<String>, branch_id: impl Into<String>) -> Self {
        Scope {
            tenant_id: tenant_id.into(),
            branch_id: branch_id.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.branch_id)
    }
}

/// The authenticated actor performing an operation.
///
/// Supplied by the identity provider; recorded as `opened_by`,
/// `closed_by`, `created_by` or `performed_by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
            display_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

// =============================================================================
// Register Status
// =============================================================================

/// Lifecycle state of a cash register.
///
/// ```text
///   open ──close──► closed   (terminal, no reopen)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegisterStatus {
    #[default]
    Open,
    Closed,
}

impl RegisterStatus {
    /// Value stored in the document's `status` field.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RegisterStatus::Open => "open",
            RegisterStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for RegisterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Movement Type
// =============================================================================

/// Category of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Income,
    Expense,
    Sale,
    Refund,
    Withdrawal,
    Deposit,
    Adjustment,
}

/// Direction a movement moves the expected balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Adds to the drawer: income, sale, deposit.
    Inflow,
    /// Takes from the drawer: expense, refund, withdrawal.
    Outflow,
    /// Sign decided by the configured adjustment policy.
    Adjustment,
}

impl MovementType {
    pub const ALL: [MovementType; 7] = [
        MovementType::Income,
        MovementType::Expense,
        MovementType::Sale,
        MovementType::Refund,
        MovementType::Withdrawal,
        MovementType::Deposit,
        MovementType::Adjustment,
    ];

    /// Amounts are stored unsigned; the sign comes from here.
    pub const fn flow(&self) -> Flow {
        match self {
            MovementType::Income | MovementType::Sale | MovementType::Deposit => Flow::Inflow,
            MovementType::Expense | MovementType::Refund | MovementType::Withdrawal => {
                Flow::Outflow
            }
            MovementType::Adjustment => Flow::Adjustment,
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash in the drawer.
    Cash,
    /// Card on a terminal.
    Card,
    /// Bank transfer.
    Transfer,
    /// Delivery or wallet app.
    App,
    Other,
}

/// Operator-chosen sign for an adjustment movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    Increase,
    Decrease,
}

// =============================================================================
// Cash Register
// =============================================================================

/// A physical or logical cash register for one shift.
///
/// `initial_balance` is immutable after creation. The closing fields
/// (`closed_*`, `expected_balance`, `actual_balance`, `difference`) are
/// written exactly once, by [`CashRegister::close`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashRegister {
    #[serde(default)]
    pub id: String,
    pub tenant_id: String,
    pub branch_id: String,
    pub name: String,
    pub status: RegisterStatus,
    pub initial_balance: Money,
    pub opened_by: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub closed_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Expected balance frozen at close.
    pub expected_balance: Option<Money>,
    /// Counted balance frozen at close.
    pub actual_balance: Option<Money>,
    /// `actual_balance - expected_balance`, frozen at close.
    pub difference: Option<Money>,
    pub closing_notes: Option<String>,
}

/// Inputs to the close transition.
#[derive(Debug, Clone)]
pub struct RegisterClosing {
    pub expected_balance: Money,
    pub actual_balance: Money,
    pub closed_by: String,
    pub closed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl CashRegister {
    /// Builds a freshly opened register. The id is assigned by the store.
    pub fn open(
        scope: &Scope,
        name: &str,
        initial_balance: Money,
        opened_by: &Actor,
        opened_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Self {
        CashRegister {
            id: String::new(),
            tenant_id: scope.tenant_id.clone(),
            branch_id: scope.branch_id.clone(),
            name: name.trim().to_string(),
            status: RegisterStatus::Open,
            initial_balance,
            opened_by: opened_by.user_id.clone(),
            opened_at,
            notes,
            closed_by: None,
            closed_at: None,
            expected_balance: None,
            actual_balance: None,
            difference: None,
            closing_notes: None,
        }
    }

    pub fn scope(&self) -> Scope {
        Scope::new(self.tenant_id.clone(), self.branch_id.clone())
    }

    pub fn is_open(&self) -> bool {
        self.status == RegisterStatus::Open
    }

    /// Fails with `InvalidRegisterStatus` unless the register is open.
    pub fn ensure_open(&self, operation: &'static str) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::InvalidRegisterStatus {
                register_id: self.id.clone(),
                status: self.status,
                operation,
            })
        }
    }

    /// The one irreversible transition: open → closed.
    ///
    /// Freezes the expected balance, the counted balance and their
    /// difference. Closing a closed register is an error; there is no
    /// reopen.
    pub fn close(&mut self, closing: RegisterClosing) -> CoreResult<Reconciliation> {
        self.ensure_open("close")?;

        if closing.actual_balance.is_negative() {
            return Err(ValidationError::MustBeNonNegative {
                field: "actual_balance".to_string(),
            }
            .into());
        }

        let result = reconcile(closing.expected_balance, closing.actual_balance)?;

        self.status = RegisterStatus::Closed;
        self.closed_by = Some(closing.closed_by);
        self.closed_at = Some(closing.closed_at);
        self.expected_balance = Some(result.expected);
        self.actual_balance = Some(result.actual);
        self.difference = Some(result.difference);
        self.closing_notes = closing.notes;

        Ok(result)
    }
}

// =============================================================================
// Cash Movement
// =============================================================================

/// One immutable ledger entry.
///
/// `amount` is always positive; its sign is implied by `movement_type`.
/// A movement linked to an order that is later cancelled stays in storage
/// and is reported as voided at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashMovement {
    #[serde(default)]
    pub id: String,
    pub register_id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub description: String,
    pub reference: Option<String>,
    pub order_id: Option<String>,
    pub order_number: Option<String>,
    /// Only meaningful for adjustments.
    pub adjustment_direction: Option<AdjustmentDirection>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for recording a movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMovement {
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub adjustment_direction: Option<AdjustmentDirection>,
}

impl NewMovement {
    pub fn new(
        movement_type: MovementType,
        amount: Money,
        payment_method: PaymentMethod,
        description: impl Into<String>,
    ) -> Self {
        NewMovement {
            movement_type,
            amount,
            payment_method,
            description: description.into(),
            reference: None,
            order_id: None,
            order_number: None,
            adjustment_direction: None,
        }
    }

    pub fn for_order(mut self, order_id: impl Into<String>, order_number: Option<String>) -> Self {
        self.order_id = Some(order_id.into());
        self.order_number = order_number;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn directed(mut self, direction: AdjustmentDirection) -> Self {
        self.adjustment_direction = Some(direction);
        self
    }

    /// Stamps the movement for a register.
    pub fn into_movement(
        self,
        register_id: &str,
        created_by: &Actor,
        created_at: DateTime<Utc>,
    ) -> CashMovement {
        CashMovement {
            id: String::new(),
            register_id: register_id.to_string(),
            movement_type: self.movement_type,
            amount: self.amount,
            payment_method: self.payment_method,
            description: self.description.trim().to_string(),
            reference: self.reference,
            order_id: self.order_id,
            order_number: self.order_number,
            adjustment_direction: self.adjustment_direction,
            created_by: created_by.user_id.clone(),
            created_at,
        }
    }
}

// =============================================================================
// Cash Audit
// =============================================================================

/// An immutable reconciliation snapshot taken while a register is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashAudit {
    #[serde(default)]
    pub id: String,
    pub register_id: String,
    #[ts(as = "String")]
    pub performed_at: DateTime<Utc>,
    pub performed_by: String,
    pub expected_cash: Money,
    pub actual_cash: Money,
    pub difference: Money,
    pub status: AuditStatus,
    pub denominations: Option<Denominations>,
    pub notes: Option<String>,
}

impl CashAudit {
    pub fn from_reconciliation(
        register_id: &str,
        result: Reconciliation,
        denominations: Option<Denominations>,
        notes: Option<String>,
        performed_by: &Actor,
        performed_at: DateTime<Utc>,
    ) -> Self {
        CashAudit {
            id: String::new(),
            register_id: register_id.to_string(),
            performed_at,
            performed_by: performed_by.user_id.clone(),
            expected_cash: result.expected,
            actual_cash: result.actual,
            difference: result.difference,
            status: result.status,
            denominations,
            notes,
        }
    }
}

// =============================================================================
// Orders (external collaborator)
// =============================================================================

/// Order status as published by the orders service.
///
/// Only `Cancelled` matters to the ledger; unknown statuses are accepted
/// so a new upstream status does not break reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown => "unknown",
        }
    }
}

/// The slice of an order record the cash desk reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(default)]
    pub id: String,
    pub order_number: Option<String>,
    pub status: OrderStatus,
}

// =============================================================================
// Unit Tests
// =============================================================================
