//! # Inbound Reconciliation
//!
//! Builds the purchase ledger that records what physically arrived for a
//! confirmed purchase order, at what cost.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ReceivedLine[]  ──► validate_received_lines()   (no I/O, no mutation) │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  LedgerDraft::build(po, lines, catalog)                                 │
//! │        │   po.status == completed  → AlreadyCompleted                   │
//! │        │   po.status != confirmed  → InvalidState                       │
//! │        ▼                                                                │
//! │  draft.into_ledger(number, now)  ──► PurchaseLedger (immutable)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Received quantities and prices may differ from what was ordered. There is
//! no upper bound check against the purchase order.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::status::PurchaseOrderStatus;
use crate::types::{ActorId, CatalogProduct, PurchaseLedger, PurchaseLedgerItem, PurchaseOrder};
use crate::validation::{
    validate_actor, validate_item_count, validate_purchase_price, validate_received_quantity,
    ValidationResult,
};

/// One line of a physical receipt as keyed in at the dock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceivedLine {
    pub product_id: String,
    pub received_quantity: i64,
    pub actual_unit_price: Money,
}

/// Validates receipt lines before anything is read or written.
///
/// ## Rules
/// - At least one line
/// - `received_quantity >= 0`
/// - `actual_unit_price > 0`
/// - Each product at most once
pub fn validate_received_lines(lines: &[ReceivedLine]) -> ValidationResult<()> {
    validate_item_count(lines.len())?;

    let mut seen = HashSet::new();
    for line in lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product id".to_string(),
            });
        }
        validate_received_quantity(line.received_quantity)?;
        validate_purchase_price(line.actual_unit_price)?;
        if !seen.insert(line.product_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "product id".to_string(),
                value: line.product_id.clone(),
            });
        }
    }
    Ok(())
}

/// Checks that `po` can be reconciled right now.
pub fn ensure_reconcilable(po: &PurchaseOrder) -> CoreResult<()> {
    match po.status {
        PurchaseOrderStatus::Confirmed => Ok(()),
        PurchaseOrderStatus::Completed => Err(CoreError::AlreadyCompleted {
            order_number: po.order_number.clone(),
        }),
        other => Err(CoreError::invalid_state(
            "purchase order",
            &po.order_number,
            format!("only confirmed orders can be reconciled (status is {})", other),
        )),
    }
}

/// A ledger that has everything except its document number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDraft {
    pub purchase_order_number: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub items: Vec<PurchaseLedgerItem>,
    pub total_amount: Money,
    pub received_by: ActorId,
}

impl LedgerDraft {
    /// Builds a ledger draft for `po` from the received lines.
    ///
    /// Category comes from `catalog`, falling back to `default_category` for
    /// products the catalog no longer knows. Names prefer the purchase order's
    /// snapshot.
    pub fn build(
        po: &PurchaseOrder,
        lines: &[ReceivedLine],
        catalog: &HashMap<String, CatalogProduct>,
        default_category: &str,
        received_by: &str,
    ) -> CoreResult<Self> {
        validate_received_lines(lines)?;
        validate_actor(received_by)?;
        ensure_reconcilable(po)?;

        let mut items = Vec::with_capacity(lines.len());
        let mut total = Money::zero();

        for line in lines {
            let ordered = po.items.iter().find(|i| i.product_id == line.product_id);
            let known = catalog.get(&line.product_id);

            let (name, spec) = match (ordered, known) {
                (Some(o), _) => (o.name.clone(), o.spec.clone()),
                (None, Some(k)) => (k.name.clone(), k.spec.clone()),
                (None, None) => (line.product_id.clone(), String::new()),
            };
            let category = known
                .map(|k| k.category.clone())
                .unwrap_or_else(|| default_category.to_string());

            let line_total = line
                .actual_unit_price
                .checked_multiply_quantity(line.received_quantity)
                .ok_or_else(|| ValidationError::Overflow {
                    field: format!("ledger line total for {}", line.product_id),
                })?;
            total = total
                .checked_add(line_total)
                .ok_or_else(|| ValidationError::Overflow {
                    field: "ledger total".to_string(),
                })?;

            items.push(PurchaseLedgerItem {
                product_id: line.product_id.clone(),
                name,
                spec,
                category,
                quantity: line.received_quantity,
                unit_price: line.actual_unit_price,
                line_total,
            });
        }

        Ok(LedgerDraft {
            purchase_order_number: po.order_number.clone(),
            supplier_id: po.supplier.supplier_id.clone(),
            supplier_name: po.supplier.name.clone(),
            items,
            total_amount: total,
            received_by: received_by.trim().to_string(),
        })
    }

    pub fn into_ledger(self, ledger_number: String, created_at: DateTime<Utc>) -> PurchaseLedger {
        PurchaseLedger {
            ledger_number,
            purchase_order_number: self.purchase_order_number,
            supplier_id: self.supplier_id,
            supplier_name: self.supplier_name,
            items: self.items,
            total_amount: self.total_amount,
            received_by: self.received_by,
            created_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
