//! # Aggregation Fold
//!
//! Turns a snapshot of sale orders into category → supplier → product
//! purchasing demand. This is a pure function: same snapshot and catalog in,
//! same report out. Nothing is cached between runs.
//!
//! ## Tree Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AggregationReport                                                      │
//! │  ├── totals                                                            │
//! │  ├── skipped[]              (lines whose product did not resolve)      │
//! │  └── categories[]           sorted by name                             │
//! │      └── suppliers[]        sorted by total_amount desc, id asc        │
//! │          └── products[]     sorted by name, id                         │
//! │                                                                         │
//! │  Every level carries PhaseTotals:                                       │
//! │     regular_*    ◄── order_phase = regular | none                       │
//! │     additional_* ◄── order_phase = additional                           │
//! │     total_*      =   regular_* + additional_*                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Buckets are chosen by the order's persisted phase, never by its status.
//! Only `confirmed` orders are demand.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::status::SaleOrderStatus;
use crate::types::{CatalogProduct, OrderPhase, SaleOrder};
use crate::validation::ValidationResult;

// =============================================================================
// Phase Totals
// =============================================================================

/// Quantity and amount split by order phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PhaseTotals {
    pub regular_quantity: i64,
    pub regular_amount: Money,
    pub additional_quantity: i64,
    pub additional_amount: Money,
    pub total_quantity: i64,
    pub total_amount: Money,
}

impl PhaseTotals {
    /// Adds one line's contribution to the bucket matching `phase`.
    ///
    /// On overflow nothing is changed.
    pub fn record(&mut self, phase: OrderPhase, quantity: i64, amount: Money) -> ValidationResult<()> {
        let mut next = *self;
        match phase {
            OrderPhase::Regular | OrderPhase::Unclassified => {
                next.regular_quantity = add_quantity(self.regular_quantity, quantity)?;
                next.regular_amount = add_amount(self.regular_amount, amount)?;
            }
            OrderPhase::Additional => {
                next.additional_quantity = add_quantity(self.additional_quantity, quantity)?;
                next.additional_amount = add_amount(self.additional_amount, amount)?;
            }
        }
        next.total_quantity = add_quantity(self.total_quantity, quantity)?;
        next.total_amount = add_amount(self.total_amount, amount)?;
        *self = next;
        Ok(())
    }

    /// Adds a child bucket's totals into this one.
    pub fn absorb(&mut self, other: &PhaseTotals) -> ValidationResult<()> {
        *self = PhaseTotals {
            regular_quantity: add_quantity(self.regular_quantity, other.regular_quantity)?,
            regular_amount: add_amount(self.regular_amount, other.regular_amount)?,
            additional_quantity: add_quantity(self.additional_quantity, other.additional_quantity)?,
            additional_amount: add_amount(self.additional_amount, other.additional_amount)?,
            total_quantity: add_quantity(self.total_quantity, other.total_quantity)?,
            total_amount: add_amount(self.total_amount, other.total_amount)?,
        };
        Ok(())
    }

    /// Checks `total = regular + additional` for both quantity and amount.
    pub fn is_consistent(&self) -> bool {
        self.regular_quantity.checked_add(self.additional_quantity) == Some(self.total_quantity)
            && self.regular_amount.checked_add(self.additional_amount) == Some(self.total_amount)
    }
}

fn add_quantity(a: i64, b: i64) -> ValidationResult<i64> {
    a.checked_add(b).ok_or_else(|| ValidationError::Overflow {
        field: "aggregated quantity".to_string(),
    })
}

fn add_amount(a: Money, b: Money) -> ValidationResult<Money> {
    a.checked_add(b).ok_or_else(|| ValidationError::Overflow {
        field: "aggregated amount".to_string(),
    })
}

// =============================================================================
// Report Nodes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductAggregation {
    pub product_id: String,
    pub name: String,
    pub spec: String,
    pub totals: PhaseTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierAggregation {
    pub supplier_id: String,
    pub supplier_name: String,
    pub category: String,
    pub products: Vec<ProductAggregation>,
    pub totals: PhaseTotals,
}

impl SupplierAggregation {
    /// True when there is nothing to order from this supplier.
    pub fn is_empty(&self) -> bool {
        self.totals.total_quantity <= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryAggregation {
    pub category: String,
    pub suppliers: Vec<SupplierAggregation>,
    pub totals: PhaseTotals,
}

/// A confirmed line that was left out because its product did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SkippedLine {
    pub order_number: String,
    pub product_id: String,
    pub quantity: i64,
}

/// Result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AggregationReport {
    #[ts(as = "String")]
    pub since: DateTime<Utc>,
    pub categories: Vec<CategoryAggregation>,
    pub totals: PhaseTotals,
    /// Distinct confirmed orders that contributed at least one line.
    pub order_count: usize,
    pub skipped: Vec<SkippedLine>,
}

impl AggregationReport {
    /// Iterates every supplier bucket across all categories.
    pub fn suppliers(&self) -> impl Iterator<Item = &SupplierAggregation> {
        self.categories.iter().flat_map(|c| c.suppliers.iter())
    }

    /// Finds one supplier bucket.
    pub fn supplier(&self, category: &str, supplier_id: &str) -> Option<&SupplierAggregation> {
        self.categories
            .iter()
            .find(|c| c.category == category)?
            .suppliers
            .iter()
            .find(|s| s.supplier_id == supplier_id)
    }

    /// Finds one product bucket.
    pub fn product(
        &self,
        category: &str,
        supplier_id: &str,
        product_id: &str,
    ) -> Option<&ProductAggregation> {
        self.supplier(category, supplier_id)?
            .products
            .iter()
            .find(|p| p.product_id == product_id)
    }
}

// =============================================================================
// Fold
// =============================================================================

/// Returns true if `order` counts as demand for a cycle that began at `since`.
pub fn is_demand(order: &SaleOrder, since: DateTime<Utc>) -> bool {
    order.status == SaleOrderStatus::Confirmed && order.placed_at >= since
}

struct SupplierAcc {
    name: String,
    products: BTreeMap<String, ProductAggregation>,
}

/// Folds a snapshot of sale orders into an [`AggregationReport`].
///
/// `catalog` maps product id to its current catalog entry; lines whose
/// product is missing are reported in `skipped` and otherwise ignored.
///
/// ## Errors
/// `Validation(Overflow)` when a quantity or amount total leaves the `i64`
/// range at any level of the tree.
pub fn fold_orders(
    orders: &[SaleOrder],
    since: DateTime<Utc>,
    catalog: &HashMap<String, CatalogProduct>,
) -> CoreResult<AggregationReport> {
    let mut tree: BTreeMap<String, BTreeMap<String, SupplierAcc>> = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut contributing = BTreeSet::new();

    for order in orders.iter().filter(|o| is_demand(o, since)) {
        for item in &order.items {
            let Some(product) = catalog.get(&item.product_id) else {
                skipped.push(SkippedLine {
                    order_number: order.order_number.clone(),
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
                continue;
            };

            let supplier = tree
                .entry(product.category.clone())
                .or_default()
                .entry(product.supplier_id.clone())
                .or_insert_with(|| SupplierAcc {
                    name: product.supplier_name.clone(),
                    products: BTreeMap::new(),
                });

            let bucket = supplier
                .products
                .entry(product.product_id.clone())
                .or_insert_with(|| ProductAggregation {
                    product_id: product.product_id.clone(),
                    name: product.name.clone(),
                    spec: product.spec.clone(),
                    totals: PhaseTotals::default(),
                });

            bucket
                .totals
                .record(order.order_phase, item.quantity, item.line_total)?;
            contributing.insert(order.order_number.as_str());
        }
    }

    let mut report_totals = PhaseTotals::default();
    let mut categories = Vec::with_capacity(tree.len());

    for (category, accs) in tree {
        let mut category_totals = PhaseTotals::default();
        let mut suppliers = Vec::with_capacity(accs.len());

        for (supplier_id, acc) in accs {
            let mut products: Vec<ProductAggregation> = acc.products.into_values().collect();
            products.sort_by(|a, b| {
                a.name.cmp(&b.name).then_with(|| a.product_id.cmp(&b.product_id))
            });

            let mut totals = PhaseTotals::default();
            for p in &products {
                totals.absorb(&p.totals)?;
            }
            category_totals.absorb(&totals)?;

            suppliers.push(SupplierAggregation {
                supplier_id,
                supplier_name: acc.name,
                category: category.clone(),
                products,
                totals,
            });
        }

        suppliers.sort_by(|a, b| {
            b.totals
                .total_amount
                .cmp(&a.totals.total_amount)
                .then_with(|| a.supplier_id.cmp(&b.supplier_id))
        });
        report_totals.absorb(&category_totals)?;

        categories.push(CategoryAggregation {
            category,
            suppliers,
            totals: category_totals,
        });
    }

    Ok(AggregationReport {
        since,
        categories,
        totals: report_totals,
        order_count: contributing.len(),
        skipped,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::{BuyerSnapshot, OrderItem};
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, 0, 0).unwrap()
    }

    fn product(id: &str, name: &str, category: &str, supplier: &str) -> CatalogProduct {
        CatalogProduct {
            product_id: id.to_string(),
            name: name.to_string(),
            spec: "box".to_string(),
            category: category.to_string(),
            supplier_id: supplier.to_string(),
            supplier_name: format!("Supplier {}", supplier),
            purchase_price: None,
            stock: None,
        }
    }

    fn order(
        number: &str,
        status: SaleOrderStatus,
        phase: OrderPhase,
        placed_at: DateTime<Utc>,
        lines: &[(&str, i64, i64)],
    ) -> SaleOrder {
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|(id, qty, price)| {
                OrderItem::new(*id, *id, "box", *qty, Money::from_minor(*price)).unwrap()
            })
            .collect();
        let final_amount = items.iter().map(|i| i.line_total).sum();
        SaleOrder {
            order_number: number.to_string(),
            buyer: BuyerSnapshot {
                name: "Corner Mart".to_string(),
                buyer_type: "retail".to_string(),
            },
            item_count: items.len() as i64,
            items,
            final_amount,
            status,
            order_phase: phase,
            placed_at,
            pended_reason: None,
            rejected_reason: None,
            processed_by: None,
            processed_at: None,
            version: 1,
        }
    }

    fn catalog(products: Vec<CatalogProduct>) -> HashMap<String, CatalogProduct> {
        products
            .into_iter()
            .map(|p| (p.product_id.clone(), p))
            .collect()
    }

    #[test]
    fn test_regular_and_additional_buckets() {
        let orders = vec![
            order("SO-A", SaleOrderStatus::Confirmed, OrderPhase::Regular, at(10), &[("X", 5, 1000)]),
            order("SO-B", SaleOrderStatus::Confirmed, OrderPhase::Additional, at(15), &[("X", 3, 1000)]),
        ];
        let report = fold_orders(&orders, at(9), &catalog(vec![product("X", "Cabbage", "veg", "S1")])).unwrap();

        let bucket = report.product("veg", "S1", "X").unwrap();
        assert_eq!(bucket.totals.regular_quantity, 5);
        assert_eq!(bucket.totals.additional_quantity, 3);
        assert_eq!(bucket.totals.total_quantity, 8);
        assert_eq!(bucket.totals.total_amount, Money::from_minor(8000));
        assert_eq!(report.order_count, 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_only_confirmed_since_counts() {
        let orders = vec![
            order("SO-1", SaleOrderStatus::Confirmed, OrderPhase::Regular, at(10), &[("X", 1, 100)]),
            order("SO-2", SaleOrderStatus::Pended, OrderPhase::Regular, at(10), &[("X", 10, 100)]),
            order("SO-3", SaleOrderStatus::Rejected, OrderPhase::Regular, at(10), &[("X", 10, 100)]),
            order("SO-4", SaleOrderStatus::Cancelled, OrderPhase::Regular, at(10), &[("X", 10, 100)]),
            order("SO-5", SaleOrderStatus::Placed, OrderPhase::Regular, at(10), &[("X", 10, 100)]),
            order("SO-6", SaleOrderStatus::Completed, OrderPhase::Regular, at(10), &[("X", 10, 100)]),
            order("SO-7", SaleOrderStatus::Confirmed, OrderPhase::Regular, at(8), &[("X", 10, 100)]),
        ];
        let report = fold_orders(&orders, at(9), &catalog(vec![product("X", "Cabbage", "veg", "S1")])).unwrap();

        assert_eq!(report.totals.total_quantity, 1);
        assert_eq!(report.order_count, 1);
    }

    #[test]
    fn test_unclassified_orders_count_as_regular() {
        let orders = vec![order(
            "SO-1",
            SaleOrderStatus::Confirmed,
            OrderPhase::Unclassified,
            at(10),
            &[("X", 4, 250)],
        )];
        let report = fold_orders(&orders, at(9), &catalog(vec![product("X", "Cabbage", "veg", "S1")])).unwrap();
        assert_eq!(report.totals.regular_quantity, 4);
        assert_eq!(report.totals.additional_quantity, 0);
    }

    #[test]
    fn test_missing_product_is_skipped() {
        let orders = vec![order(
            "SO-1",
            SaleOrderStatus::Confirmed,
            OrderPhase::Regular,
            at(10),
            &[("X", 2, 100), ("GHOST", 9, 100)],
        )];
        let report = fold_orders(&orders, at(9), &catalog(vec![product("X", "Cabbage", "veg", "S1")])).unwrap();

        assert_eq!(report.totals.total_quantity, 2);
        assert_eq!(
            report.skipped,
            vec![SkippedLine {
                order_number: "SO-1".to_string(),
                product_id: "GHOST".to_string(),
                quantity: 9,
            }]
        );
    }

    #[test]
    fn test_ordering_and_totals_at_every_level() {
        let orders = vec![
            order(
                "SO-1",
                SaleOrderStatus::Confirmed,
                OrderPhase::Regular,
                at(10),
                &[("A", 1, 100), ("B", 1, 5000), ("C", 2, 700), ("D", 1, 100)],
            ),
            order(
                "SO-2",
                SaleOrderStatus::Confirmed,
                OrderPhase::Additional,
                at(15),
                &[("C", 1, 700), ("E", 3, 100)],
            ),
        ];
        let products = catalog(vec![
            product("A", "Onion", "veg", "S2"),
            product("B", "Beef", "meat", "S3"),
            product("C", "Apple", "veg", "S1"),
            product("D", "Carrot", "veg", "S2"),
            product("E", "Banana", "fruit", "S4"),
        ]);
        let report = fold_orders(&orders, at(9), &products).unwrap();

        let names: Vec<&str> = report.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["fruit", "meat", "veg"]);

        // S1: 2100 beats S2: 200.
        let veg = &report.categories[2];
        let ids: Vec<&str> = veg.suppliers.iter().map(|s| s.supplier_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2"]);

        let s2: Vec<&str> = veg.suppliers[1].products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(s2, vec!["Carrot", "Onion"]);

        let mut sum = PhaseTotals::default();
        for category in &report.categories {
            assert!(category.totals.is_consistent());
            let mut category_sum = PhaseTotals::default();
            for supplier in &category.suppliers {
                assert!(supplier.totals.is_consistent());
                let mut supplier_sum = PhaseTotals::default();
                for p in &supplier.products {
                    assert!(p.totals.is_consistent());
                    supplier_sum.absorb(&p.totals).unwrap();
                }
                assert_eq!(supplier_sum, supplier.totals);
                category_sum.absorb(&supplier.totals).unwrap();
            }
            assert_eq!(category_sum, category.totals);
            sum.absorb(&category.totals).unwrap();
        }
        assert_eq!(sum, report.totals);
        assert_eq!(report.totals.total_amount, Money::from_minor(100 + 5000 + 1400 + 100 + 700 + 300));
    }

    #[test]
    fn test_equal_amount_suppliers_tie_break_by_id() {
        let orders = vec![order(
            "SO-1",
            SaleOrderStatus::Confirmed,
            OrderPhase::Regular,
            at(10),
            &[("A", 1, 100), ("B", 1, 100)],
        )];
        let products = catalog(vec![
            product("A", "Onion", "veg", "S9"),
            product("B", "Leek", "veg", "S1"),
        ]);
        let report = fold_orders(&orders, at(9), &products).unwrap();
        let ids: Vec<&str> = report.categories[0]
            .suppliers
            .iter()
            .map(|s| s.supplier_id.as_str())
            .collect();
        assert_eq!(ids, vec!["S1", "S9"]);
    }

    #[test]
    fn test_fold_is_deterministic() {
        let orders = vec![
            order("SO-1", SaleOrderStatus::Confirmed, OrderPhase::Regular, at(10), &[("X", 5, 1000)]),
            order("SO-2", SaleOrderStatus::Confirmed, OrderPhase::Additional, at(15), &[("X", 3, 1000)]),
        ];
        let products = catalog(vec![product("X", "Cabbage", "veg", "S1")]);
        assert_eq!(
            fold_orders(&orders, at(9), &products).unwrap(),
            fold_orders(&orders, at(9), &products).unwrap()
        );
    }

    #[test]
    fn test_amount_overflow_is_reported() {
        let huge = 5_000_000_000_000_000_000;
        let orders = vec![
            order("SO-1", SaleOrderStatus::Confirmed, OrderPhase::Regular, at(10), &[("X", 1, huge)]),
            order("SO-2", SaleOrderStatus::Confirmed, OrderPhase::Regular, at(11), &[("X", 1, huge)]),
        ];
        let products = catalog(vec![product("X", "Cabbage", "veg", "S1")]);

        let err = fold_orders(&orders, at(9), &products).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Overflow { ref field }) if field == "aggregated amount"
        ));
    }

    #[test]
    fn test_failed_record_leaves_totals_unchanged() {
        let mut totals = PhaseTotals::default();
        totals
            .record(OrderPhase::Regular, 1, Money::from_minor(i64::MAX))
            .unwrap();
        let before = totals;

        assert!(totals
            .record(OrderPhase::Additional, 1, Money::from_minor(1))
            .is_err());
        assert_eq!(totals, before);
        assert!(totals.is_consistent());
    }
}
