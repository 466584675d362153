//! # Domain Types
//!
//! Documents flowing through the cutoff engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SaleOrder     │   │  PurchaseOrder  │   │ PurchaseLedger  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  order_number   │   │  order_number   │   │  ledger_number  │       │
//! │  │  order_phase    │──►│  supplier       │──►│  po reference   │       │
//! │  │  items[]        │   │  items[] (qty)  │   │  items[] (cost) │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │        demand              what was asked        what arrived           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Buyer, supplier and product names are copied into each document at the
//! moment it is written, so later master-data edits never rewrite history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::status::{PurchaseOrderStatus, SaleOrderStatus};
use crate::validation::{validate_quantity, validate_unit_price, ValidationResult};

/// Opaque identity of whoever performs a state-changing call.
pub type ActorId = String;

// =============================================================================
// Order Phase
// =============================================================================

/// Permanent classification of a sale order relative to the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderPhase {
    /// Placed inside the open window, before the cutoff.
    Regular,
    /// Placed after the cutoff closed.
    Additional,
    /// Placed before the window opened.
    #[serde(rename = "none")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "none"))]
    Unclassified,
}

impl OrderPhase {
    /// Returns the storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderPhase::Regular => "regular",
            OrderPhase::Additional => "additional",
            OrderPhase::Unclassified => "none",
        }
    }
}

impl std::fmt::Display for OrderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale Order
// =============================================================================

/// Who placed a sale order, frozen at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BuyerSnapshot {
    pub name: String,
    /// Customer classification from the directory (e.g. "retail", "restaurant").
    pub buyer_type: String,
}

/// A line item in a sale order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub product_id: String,
    /// Product name at time of order (frozen).
    pub name: String,
    /// Packaging/size description at time of order (frozen).
    pub spec: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Always exactly `unit_price × quantity`.
    pub line_total: Money,
}

impl OrderItem {
    /// Creates a line item, computing the line total.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        spec: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> ValidationResult<Self> {
        let product_id = product_id.into();
        validate_quantity(quantity)?;
        validate_unit_price(unit_price)?;
        let line_total = unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| ValidationError::Overflow {
                field: format!("line total for {}", product_id),
            })?;

        Ok(OrderItem {
            product_id,
            name: name.into(),
            spec: spec.into(),
            quantity,
            unit_price,
            line_total,
        })
    }

    /// Verifies a submitted line item without recomputing anything.
    ///
    /// A mismatching `line_total` is rejected, never corrected.
    pub fn verify(&self) -> ValidationResult<()> {
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product id".to_string(),
            });
        }
        validate_quantity(self.quantity)?;
        validate_unit_price(self.unit_price)?;

        let expected = self
            .unit_price
            .checked_multiply_quantity(self.quantity)
            .ok_or_else(|| ValidationError::Overflow {
                field: format!("line total for {}", self.product_id),
            })?;

        if expected != self.line_total {
            return Err(ValidationError::LineTotalMismatch {
                product_id: self.product_id.clone(),
                expected: expected.minor(),
                actual: self.line_total.minor(),
            });
        }
        Ok(())
    }
}

/// A sale order as submitted by the storefront or a proxy-shopping operator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleOrder {
    pub buyer: BuyerSnapshot,
    pub items: Vec<OrderItem>,
    /// Must equal the sum of the items' line totals.
    pub final_amount: Money,
}

impl NewSaleOrder {
    /// Builds a submission from items, summing the final amount.
    pub fn from_items(buyer: BuyerSnapshot, items: Vec<OrderItem>) -> Self {
        let final_amount = items.iter().map(|i| i.line_total).sum();
        NewSaleOrder {
            buyer,
            items,
            final_amount,
        }
    }
}

/// A persisted sale order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleOrder {
    pub order_number: String,
    pub buyer: BuyerSnapshot,
    pub items: Vec<OrderItem>,
    pub final_amount: Money,
    pub item_count: i64,
    pub status: SaleOrderStatus,
    /// Assigned once at creation. Never recomputed.
    pub order_phase: OrderPhase,
    #[ts(as = "String")]
    pub placed_at: DateTime<Utc>,
    pub pended_reason: Option<String>,
    pub rejected_reason: Option<String>,
    pub processed_by: Option<ActorId>,
    #[ts(as = "Option<String>")]
    pub processed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version, bumped on every write.
    pub version: i64,
}

impl SaleOrder {
    /// Verifies every line item and the order-level totals.
    pub fn verify_totals(&self) -> ValidationResult<()> {
        verify_items_and_total(&self.items, self.final_amount)?;
        if self.item_count != self.items.len() as i64 {
            return Err(ValidationError::AmountMismatch {
                field: "item count".to_string(),
                expected: self.items.len() as i64,
                actual: self.item_count,
            });
        }
        Ok(())
    }
}

/// Checks that items are non-empty, individually valid, and sum to `final_amount`.
pub fn verify_items_and_total(items: &[OrderItem], final_amount: Money) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    let mut sum = Money::zero();
    for item in items {
        item.verify()?;
        sum = sum
            .checked_add(item.line_total)
            .ok_or_else(|| ValidationError::Overflow {
                field: "final amount".to_string(),
            })?;
    }

    if sum != final_amount {
        return Err(ValidationError::AmountMismatch {
            field: "final amount".to_string(),
            expected: sum.minor(),
            actual: final_amount.minor(),
        });
    }
    Ok(())
}

// =============================================================================
// Purchase Order
// =============================================================================

/// Delivery state of the supplier notification (the `smsSuccess` tri-state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Unsent,
    Success,
    Failed,
}

impl NotificationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unsent => "unsent",
            NotificationStatus::Success => "success",
            NotificationStatus::Failed => "failed",
        }
    }
}

/// Supplier identity frozen into a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierSnapshot {
    pub supplier_id: String,
    pub name: String,
    /// Phone numbers (or other addresses) the notification goes to.
    pub notification_recipients: Vec<String>,
}

/// A purchase order line. Quantity only: cost is fixed at reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseOrderItem {
    pub product_id: String,
    pub name: String,
    pub spec: String,
    pub quantity: i64,
}

/// A demand document sent to one supplier for one category and cycle.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseOrder {
    pub order_number: String,
    pub supplier: SupplierSnapshot,
    pub items: Vec<PurchaseOrderItem>,
    pub category: String,
    #[ts(as = "String")]
    pub cycle_date: NaiveDate,
    pub status: PurchaseOrderStatus,
    pub notification: NotificationStatus,
    #[ts(as = "Option<String>")]
    pub last_notified_at: Option<DateTime<Utc>>,
    pub last_notification_error: Option<String>,
    pub purchase_ledger_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<ActorId>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl PurchaseOrder {
    /// Total ordered units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// True when the order is waiting for a (re)send.
    pub fn awaits_notification(&self) -> bool {
        self.status == PurchaseOrderStatus::Placed
            && self.notification != NotificationStatus::Success
    }
}

// =============================================================================
// Purchase Ledger
// =============================================================================

/// What actually arrived for one product, at what cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLedgerItem {
    pub product_id: String,
    pub name: String,
    pub spec: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

impl PurchaseLedgerItem {
    /// Verifies `line_total == quantity × unit_price`.
    pub fn verify(&self) -> ValidationResult<()> {
        let expected = self
            .unit_price
            .checked_multiply_quantity(self.quantity)
            .ok_or_else(|| ValidationError::Overflow {
                field: format!("ledger line total for {}", self.product_id),
            })?;
        if expected != self.line_total {
            return Err(ValidationError::LineTotalMismatch {
                product_id: self.product_id.clone(),
                expected: expected.minor(),
                actual: self.line_total.minor(),
            });
        }
        Ok(())
    }
}

/// Immutable record of a physical receipt. One per completed purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLedger {
    pub ledger_number: String,
    pub purchase_order_number: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub items: Vec<PurchaseLedgerItem>,
    pub total_amount: Money,
    pub received_by: ActorId,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PurchaseLedger {
    /// Verifies every line and the ledger total.
    pub fn verify(&self) -> CoreResult<()> {
        let mut sum = Money::zero();
        for item in &self.items {
            item.verify()?;
            sum = sum
                .checked_add(item.line_total)
                .ok_or_else(|| ValidationError::Overflow {
                    field: "ledger total".to_string(),
                })?;
        }
        if sum != self.total_amount {
            return Err(ValidationError::AmountMismatch {
                field: "ledger total".to_string(),
                expected: sum.minor(),
                actual: self.total_amount.minor(),
            }
            .into());
        }
        Ok(())
    }
}

// =============================================================================
// External Collaborator Views
// =============================================================================

/// A product as returned by the catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogProduct {
    pub product_id: String,
    pub name: String,
    pub spec: String,
    pub category: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub purchase_price: Option<Money>,
    pub stock: Option<i64>,
}

/// A supplier or customer as returned by the company directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Company {
    pub business_id: String,
    pub name: String,
    pub notification_recipients: Vec<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
