//! # Order Lifecycle State Machine
//!
//! The single transition table shared by sale orders and purchase orders.
//! Every status change in the system is checked here and nowhere else.
//!
//! ## Sale Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            ┌──────────► confirmed ──────► completed (terminal)          │
//! │            │               ▲    │                                       │
//! │   placed ──┼──► pended ────┘    └───────► cancelled (terminal)          │
//! │            │       │                          ▲                         │
//! │            │       └──────► rejected ◄──┐     │                         │
//! │            ├────────────────────────────┘     │                         │
//! │            └──────────────────────────────────┘                         │
//! │                                                                         │
//! │  confirmed → cancelled is additionally bounded by the cutoff window    │
//! │  (see [`ensure_cancellation_window`]).                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purchase Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   placed ──► confirmed ──► completed   (only via reconciliation)        │
//! │     │  │         ▲                                                      │
//! │     │  └─► pended┘──► cancelled                                         │
//! │     └───────────────► cancelled                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::cutoff::CutoffWindow;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::OrderPhase;

// =============================================================================
// Sale Order Status
// =============================================================================

/// The status of a sale order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleOrderStatus {
    /// Submitted by the buyer, awaiting back-office review.
    Placed,
    /// Accepted; counts as purchasing demand.
    Confirmed,
    /// On hold with a reason.
    Pended,
    /// Refused with a reason. Terminal.
    Rejected,
    /// Delivered and closed. Terminal.
    Completed,
    /// Withdrawn. Terminal.
    Cancelled,
}

impl SaleOrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [SaleOrderStatus; 6] = [
        SaleOrderStatus::Placed,
        SaleOrderStatus::Confirmed,
        SaleOrderStatus::Pended,
        SaleOrderStatus::Rejected,
        SaleOrderStatus::Completed,
        SaleOrderStatus::Cancelled,
    ];

    /// Returns the statuses reachable from `self`.
    pub const fn allowed_targets(&self) -> &'static [SaleOrderStatus] {
        use SaleOrderStatus::*;
        match self {
            Placed => &[Confirmed, Pended, Rejected, Cancelled],
            Pended => &[Confirmed, Rejected],
            Confirmed => &[Completed, Cancelled],
            Rejected | Completed | Cancelled => &[],
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Checks whether `self → to` is in the lifecycle table.
    pub fn can_transition_to(&self, to: SaleOrderStatus) -> bool {
        self.allowed_targets().contains(&to)
    }

    /// Validates `self → to` and returns the new status.
    pub fn transition_to(self, to: SaleOrderStatus) -> CoreResult<SaleOrderStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidTransition {
                entity: "sale order".to_string(),
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Returns the lowercase storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleOrderStatus::Placed => "placed",
            SaleOrderStatus::Confirmed => "confirmed",
            SaleOrderStatus::Pended => "pended",
            SaleOrderStatus::Rejected => "rejected",
            SaleOrderStatus::Completed => "completed",
            SaleOrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for SaleOrderStatus {
    fn default() -> Self {
        SaleOrderStatus::Placed
    }
}

impl fmt::Display for SaleOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleOrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SaleOrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "sale order status".to_string(),
                reason: format!("unknown status '{}'", s),
            })
    }
}

/// Enforces the time boundary on cancelling a confirmed sale order.
///
/// A confirmed `regular` order is part of its cycle's locked demand once that
/// window closes, so it can only be cancelled while the window it was placed
/// in is still the open one. Opening the next cycle does not unlock it.
/// Additional (and unclassified) orders stay cancellable until completion.
pub fn ensure_cancellation_window(
    order_number: &str,
    phase: OrderPhase,
    placed_at: DateTime<Utc>,
    window: &CutoffWindow,
) -> CoreResult<()> {
    if phase == OrderPhase::Regular && !(window.is_open() && placed_at >= window.opened_at) {
        return Err(CoreError::invalid_state(
            "sale order",
            order_number,
            "regular orders cannot be cancelled after their cutoff closed",
        ));
    }
    Ok(())
}

// =============================================================================
// Purchase Order Status
// =============================================================================

/// The status of a purchase order sent to a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    /// Generated, not yet acknowledged by the supplier.
    Placed,
    /// Supplier notified (or confirmed by phone); awaiting delivery.
    Confirmed,
    /// On hold.
    Pended,
    /// Withdrawn. Terminal.
    Cancelled,
    /// Goods received and ledger written. Terminal.
    Completed,
}

impl PurchaseOrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [PurchaseOrderStatus; 5] = [
        PurchaseOrderStatus::Placed,
        PurchaseOrderStatus::Confirmed,
        PurchaseOrderStatus::Pended,
        PurchaseOrderStatus::Cancelled,
        PurchaseOrderStatus::Completed,
    ];

    /// Returns the statuses reachable from `self`.
    pub const fn allowed_targets(&self) -> &'static [PurchaseOrderStatus] {
        use PurchaseOrderStatus::*;
        match self {
            Placed => &[Confirmed, Pended, Cancelled],
            Confirmed => &[Completed],
            Pended => &[Confirmed, Cancelled],
            Cancelled | Completed => &[],
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Checks whether `self → to` is in the lifecycle table.
    pub fn can_transition_to(&self, to: PurchaseOrderStatus) -> bool {
        self.allowed_targets().contains(&to)
    }

    /// Validates `self → to` and returns the new status.
    pub fn transition_to(self, to: PurchaseOrderStatus) -> CoreResult<PurchaseOrderStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidTransition {
                entity: "purchase order".to_string(),
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Validates an operator-requested transition.
    ///
    /// Same table as [`transition_to`](Self::transition_to), except that
    /// `completed` is never reachable this way: it is written only together
    /// with a ledger entry.
    pub fn manual_transition_to(
        self,
        order_number: &str,
        to: PurchaseOrderStatus,
    ) -> CoreResult<PurchaseOrderStatus> {
        if to == PurchaseOrderStatus::Completed {
            return Err(CoreError::invalid_state(
                "purchase order",
                order_number,
                "completion requires an inbound reconciliation",
            ));
        }
        self.transition_to(to)
    }

    /// Returns the lowercase storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Placed => "placed",
            PurchaseOrderStatus::Confirmed => "confirmed",
            PurchaseOrderStatus::Pended => "pended",
            PurchaseOrderStatus::Cancelled => "cancelled",
            PurchaseOrderStatus::Completed => "completed",
        }
    }
}

impl Default for PurchaseOrderStatus {
    fn default() -> Self {
        PurchaseOrderStatus::Placed
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PurchaseOrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "purchase order status".to_string(),
                reason: format!("unknown status '{}'", s),
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
