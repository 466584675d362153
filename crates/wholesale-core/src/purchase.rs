//! Purchase order drafting from a supplier aggregation bucket.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::SupplierAggregation;
use crate::error::{CoreError, CoreResult};
use crate::status::PurchaseOrderStatus;
use crate::types::{
    ActorId, Company, NotificationStatus, PurchaseOrder, PurchaseOrderItem, SupplierSnapshot,
};

/// A purchase order that has everything except its document number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderDraft {
    pub supplier: SupplierSnapshot,
    pub category: String,
    pub cycle_date: NaiveDate,
    pub items: Vec<PurchaseOrderItem>,
}

impl PurchaseOrderDraft {
    /// Builds a draft from one supplier bucket.
    ///
    /// One item per product row, carrying the aggregated total quantity.
    /// Rows with nothing to order are left out; a bucket with nothing at all
    /// fails with [`CoreError::EmptyAggregation`].
    pub fn from_aggregation(
        aggregation: &SupplierAggregation,
        category: &str,
        supplier: &Company,
        cycle_date: NaiveDate,
    ) -> CoreResult<Self> {
        if aggregation.is_empty() {
            return Err(CoreError::EmptyAggregation {
                supplier_id: aggregation.supplier_id.clone(),
                category: category.to_string(),
            });
        }

        let items: Vec<PurchaseOrderItem> = aggregation
            .products
            .iter()
            .filter(|p| p.totals.total_quantity > 0)
            .map(|p| PurchaseOrderItem {
                product_id: p.product_id.clone(),
                name: p.name.clone(),
                spec: p.spec.clone(),
                quantity: p.totals.total_quantity,
            })
            .collect();

        Ok(PurchaseOrderDraft {
            supplier: SupplierSnapshot {
                supplier_id: aggregation.supplier_id.clone(),
                name: supplier.name.clone(),
                notification_recipients: supplier.notification_recipients.clone(),
            },
            category: category.to_string(),
            cycle_date,
            items,
        })
    }

    /// Finalizes the draft as a freshly placed, unsent purchase order.
    pub fn into_purchase_order(
        self,
        order_number: String,
        created_by: ActorId,
        created_at: DateTime<Utc>,
    ) -> PurchaseOrder {
        PurchaseOrder {
            order_number,
            supplier: self.supplier,
            items: self.items,
            category: self.category,
            cycle_date: self.cycle_date,
            status: PurchaseOrderStatus::Placed,
            notification: NotificationStatus::Unsent,
            last_notified_at: None,
            last_notification_error: None,
            purchase_ledger_number: None,
            completed_at: None,
            processed_by: Some(created_by),
            created_at,
            version: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{PhaseTotals, ProductAggregation};
    use crate::money::Money;
    use crate::types::OrderPhase;

    fn bucket(quantities: &[(&str, i64)]) -> SupplierAggregation {
        let mut totals = PhaseTotals::default();
        let products = quantities
            .iter()
            .map(|(id, qty)| {
                let mut t = PhaseTotals::default();
                if *qty > 0 {
                    t.record(OrderPhase::Regular, *qty, Money::from_minor(qty * 1000)).unwrap();
                }
                totals.absorb(&t).unwrap();
                ProductAggregation {
                    product_id: id.to_string(),
                    name: id.to_string(),
                    spec: "box".to_string(),
                    totals: t,
                }
            })
            .collect();
        SupplierAggregation {
            supplier_id: "S1".to_string(),
            supplier_name: "Green Farm".to_string(),
            category: "veg".to_string(),
            products,
            totals,
        }
    }

    fn supplier() -> Company {
        Company {
            business_id: "S1".to_string(),
            name: "Green Farm Co.".to_string(),
            notification_recipients: vec!["010-1111-2222".to_string()],
        }
    }

    fn cycle() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_draft_carries_total_quantity() {
        let draft =
            PurchaseOrderDraft::from_aggregation(&bucket(&[("X", 8)]), "veg", &supplier(), cycle())
                .unwrap();
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].quantity, 8);
        assert_eq!(draft.supplier.name, "Green Farm Co.");
        assert_eq!(draft.supplier.notification_recipients.len(), 1);

        let po = draft.into_purchase_order("PO-20261016-0001".to_string(), "admin".to_string(), Utc::now());
        assert_eq!(po.status, PurchaseOrderStatus::Placed);
        assert_eq!(po.notification, NotificationStatus::Unsent);
        assert_eq!(po.total_quantity(), 8);
    }

    #[test]
    fn test_empty_bucket_is_rejected() {
        let err =
            PurchaseOrderDraft::from_aggregation(&bucket(&[("X", 0)]), "veg", &supplier(), cycle())
                .unwrap_err();
        assert!(matches!(err, CoreError::EmptyAggregation { .. }));
    }

    #[test]
    fn test_zero_rows_are_dropped() {
        let draft = PurchaseOrderDraft::from_aggregation(
            &bucket(&[("X", 3), ("Y", 0)]),
            "veg",
            &supplier(),
            cycle(),
        )
        .unwrap();
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].product_id, "X");
    }
}
