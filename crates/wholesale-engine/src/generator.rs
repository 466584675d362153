//! # Purchase Order Generator
//!
//! One purchase order per supplier bucket of an aggregation report.
//!
//! ## Generation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SupplierAggregation (category, supplier)                               │
//! │        │                                                                │
//! │        ├── category mismatch ───────────────► Validation                │
//! │        ├── total_quantity <= 0 ─────────────► EmptyAggregation          │
//! │        ├── directory lookup ── missing ─────► NotFound                  │
//! │        ▼                                                                │
//! │  PurchaseOrderDraft (one item per product, quantity = total_quantity)  │
//! │        │                                                                │
//! │        ▼  SINGLE TRANSACTION                                            │
//! │  live PO for (supplier, category, cycle)? ── yes ► DuplicateOrder       │
//! │  bump document_sequences(purchase_order, cycle_date)                    │
//! │  INSERT purchase_orders (placed, unsent)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cycle date is the business date on which the current window opened,
//! so the duplicate guard spans the whole cycle even across midnight.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use ts_rs::TS;
use wholesale_core::cutoff::cycle_date;
use wholesale_core::purchase::PurchaseOrderDraft;
use wholesale_core::validation::validate_actor;
use wholesale_core::{
    AggregationReport, CoreError, PurchaseOrder, SupplierAggregation, ValidationError,
};
use wholesale_db::DbError;

use crate::cutoff::window_at;
use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::ports::CompanyDirectory;

/// What happened to one supplier bucket in [`PurchaseOrderGenerator::generate_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Created { order_number: String },
    Duplicate { existing: String },
    Empty,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GenerationResult {
    pub category: String,
    pub supplier_id: String,
    pub outcome: GenerationOutcome,
}

/// Summary of a whole-report generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GenerationSummary {
    pub attempted: usize,
    pub created: usize,
    pub duplicates: usize,
    pub empty: usize,
    pub failed: usize,
    pub results: Vec<GenerationResult>,
}

impl GenerationSummary {
    fn record(&mut self, category: &str, supplier_id: &str, outcome: GenerationOutcome) {
        self.attempted += 1;
        match outcome {
            GenerationOutcome::Created { .. } => self.created += 1,
            GenerationOutcome::Duplicate { .. } => self.duplicates += 1,
            GenerationOutcome::Empty => self.empty += 1,
            GenerationOutcome::Failed { .. } => self.failed += 1,
        }
        self.results.push(GenerationResult {
            category: category.to_string(),
            supplier_id: supplier_id.to_string(),
            outcome,
        });
    }

    /// Numbers of the orders created in this run, in report order.
    pub fn created_order_numbers(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                GenerationOutcome::Created { order_number } => Some(order_number.clone()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct PurchaseOrderGenerator {
    ctx: EngineContext,
    directory: Arc<dyn CompanyDirectory>,
}

impl PurchaseOrderGenerator {
    pub fn new(ctx: EngineContext, directory: Arc<dyn CompanyDirectory>) -> Self {
        PurchaseOrderGenerator { ctx, directory }
    }

    /// The cycle date new purchase orders are filed under.
    pub async fn current_cycle_date(&self) -> EngineResult<NaiveDate> {
        let window = window_at(&self.ctx, self.ctx.now()).await?;
        Ok(cycle_date(window.opened_at, self.ctx.offset()))
    }

    /// Creates the purchase order for one supplier bucket.
    ///
    /// ## Errors
    /// - `Validation` when `category` is not the bucket's category
    /// - `EmptyAggregation` when the bucket has nothing to order
    /// - `NotFound` when the directory does not know the supplier
    /// - `DuplicateOrder` when a live order already covers the bucket
    pub async fn generate(
        &self,
        aggregation: &SupplierAggregation,
        category: &str,
        actor: &str,
    ) -> EngineResult<PurchaseOrder> {
        let cycle = self.current_cycle_date().await?;
        self.generate_for_cycle(aggregation, category, cycle, actor).await
    }

    async fn generate_for_cycle(
        &self,
        aggregation: &SupplierAggregation,
        category: &str,
        cycle: NaiveDate,
        actor: &str,
    ) -> EngineResult<PurchaseOrder> {
        validate_actor(actor)?;

        if category != aggregation.category {
            return Err(ValidationError::InvalidFormat {
                field: "category".to_string(),
                reason: format!(
                    "bucket for supplier {} belongs to category {}, not {}",
                    aggregation.supplier_id, aggregation.category, category
                ),
            }
            .into());
        }

        if aggregation.is_empty() {
            return Err(CoreError::EmptyAggregation {
                supplier_id: aggregation.supplier_id.clone(),
                category: category.to_string(),
            }
            .into());
        }

        let supplier = self
            .directory
            .get_company(&aggregation.supplier_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Supplier", &aggregation.supplier_id))?;

        if supplier.notification_recipients.is_empty() {
            warn!(
                supplier_id = %aggregation.supplier_id,
                "Supplier has no notification recipients, dispatch will fail"
            );
        }

        let draft = PurchaseOrderDraft::from_aggregation(aggregation, category, &supplier, cycle)?;
        let order = draft.into_purchase_order(String::new(), actor.trim().to_string(), self.ctx.now());

        debug!(
            supplier_id = %aggregation.supplier_id,
            category,
            %cycle,
            items = order.items.len(),
            "Generating purchase order"
        );

        match self
            .ctx
            .db
            .purchase_orders()
            .insert_numbered(&self.ctx.config.numbering.purchase_order_prefix, order)
            .await
        {
            Ok(stored) => {
                info!(
                    order_number = %stored.order_number,
                    supplier_id = %stored.supplier.supplier_id,
                    category,
                    total_quantity = stored.total_quantity(),
                    "Purchase order generated"
                );
                Ok(stored)
            }
            Err(DbError::UniqueViolation { value, .. }) => {
                warn!(
                    supplier_id = %aggregation.supplier_id,
                    category,
                    existing = %value,
                    "Purchase order already exists for this cycle"
                );
                Err(EngineError::DuplicateOrder {
                    supplier_id: aggregation.supplier_id.clone(),
                    category: category.to_string(),
                    cycle_date: cycle,
                    existing: value,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Generates an order for every supplier bucket in `report`.
    ///
    /// Buckets are processed in report order; one bucket's failure is
    /// recorded in the summary and does not stop the rest.
    pub async fn generate_all(
        &self,
        report: &AggregationReport,
        actor: &str,
    ) -> EngineResult<GenerationSummary> {
        validate_actor(actor)?;
        let cycle = self.current_cycle_date().await?;
        let mut summary = GenerationSummary::default();

        for category in &report.categories {
            for bucket in &category.suppliers {
                let outcome = match self
                    .generate_for_cycle(bucket, &category.category, cycle, actor)
                    .await
                {
                    Ok(po) => GenerationOutcome::Created {
                        order_number: po.order_number,
                    },
                    Err(EngineError::DuplicateOrder { existing, .. }) => {
                        GenerationOutcome::Duplicate { existing }
                    }
                    Err(EngineError::Core(CoreError::EmptyAggregation { .. })) => {
                        GenerationOutcome::Empty
                    }
                    Err(e) => {
                        error!(
                            supplier_id = %bucket.supplier_id,
                            category = %category.category,
                            error = %e,
                            "Purchase order generation failed"
                        );
                        GenerationOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                summary.record(&category.category, &bucket.supplier_id, outcome);
            }
        }

        info!(
            attempted = summary.attempted,
            created = summary.created,
            duplicates = summary.duplicates,
            empty = summary.empty,
            failed = summary.failed,
            "Generation run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ports::ManualClock;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;
    use wholesale_core::aggregation::{CategoryAggregation, PhaseTotals, ProductAggregation};
    use wholesale_core::{
        Company, CutoffWindow, Money, NotificationStatus, OrderPhase, PurchaseOrderStatus,
    };
    use wholesale_db::{Database, DbConfig};

    struct Directory(HashMap<String, Company>);

    #[async_trait]
    impl CompanyDirectory for Directory {
        async fn get_company(&self, business_id: &str) -> EngineResult<Option<Company>> {
            Ok(self.0.get(business_id).cloned())
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, 0, 0).unwrap()
    }

    fn company(id: &str) -> Company {
        Company {
            business_id: id.to_string(),
            name: format!("Supplier {}", id),
            notification_recipients: vec!["+821000000001".to_string()],
        }
    }

    fn bucket(supplier_id: &str, quantities: &[(&str, i64)]) -> SupplierAggregation {
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
            supplier_id: supplier_id.to_string(),
            supplier_name: format!("Supplier {}", supplier_id),
            category: "veg".to_string(),
            products,
            totals,
        }
    }

    async fn setup(known: &[&str]) -> PurchaseOrderGenerator {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.cutoff_windows().insert_open(&CutoffWindow::opened(at(9))).await.unwrap();
        let ctx = EngineContext::new(
            Arc::new(db),
            Arc::new(EngineConfig::default()),
            Arc::new(ManualClock::new(at(16))),
        );
        let directory = Directory(known.iter().map(|id| (id.to_string(), company(id))).collect());
        PurchaseOrderGenerator::new(ctx, Arc::new(directory))
    }

    #[tokio::test]
    async fn test_generate_copies_total_quantities() {
        let generator = setup(&["S1"]).await;

        let po = generator.generate(&bucket("S1", &[("X", 8)]), "veg", "admin").await.unwrap();
        assert_eq!(po.order_number, "PO-20261016-0001");
        assert_eq!(po.status, PurchaseOrderStatus::Placed);
        assert_eq!(po.notification, NotificationStatus::Unsent);
        assert_eq!(po.items.len(), 1);
        assert_eq!(po.items[0].quantity, 8);
        assert_eq!(po.supplier.notification_recipients, vec!["+821000000001".to_string()]);
        assert_eq!(po.cycle_date, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    }

    #[tokio::test]
    async fn test_second_generate_is_duplicate() {
        let generator = setup(&["S1"]).await;
        let first = generator.generate(&bucket("S1", &[("X", 8)]), "veg", "admin").await.unwrap();

        let err = generator.generate(&bucket("S1", &[("X", 9)]), "veg", "admin").await.unwrap_err();
        match err {
            EngineError::DuplicateOrder { existing, .. } => assert_eq!(existing, first.order_number),
            other => panic!("expected DuplicateOrder, got {:?}", other),
        }

        let cycle = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(generator.ctx.db.purchase_orders().list_for_cycle(cycle).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_bucket_is_refused() {
        let generator = setup(&["S1"]).await;
        let err = generator.generate(&bucket("S1", &[("X", 0)]), "veg", "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::EmptyAggregation { .. })));
    }

    #[tokio::test]
    async fn test_category_must_match_bucket() {
        let generator = setup(&["S1"]).await;

        let err = generator.generate(&bucket("S1", &[("X", 8)]), "fruit", "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::InvalidFormat { .. })));

        let cycle = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert!(generator.ctx.db.purchase_orders().list_for_cycle(cycle).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_supplier_is_not_found() {
        let generator = setup(&[]).await;
        let err = generator.generate(&bucket("S9", &[("X", 1)]), "veg", "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_generate_all_keeps_going() {
        let generator = setup(&["S1", "S3"]).await;
        let mut veg_totals = PhaseTotals::default();
        let suppliers = vec![bucket("S1", &[("X", 8)]), bucket("S2", &[("Y", 2)]), bucket("S3", &[("Z", 0)])];
        for s in &suppliers {
            veg_totals.absorb(&s.totals).unwrap();
        }
        let report = AggregationReport {
            since: at(9),
            categories: vec![CategoryAggregation {
                category: "veg".to_string(),
                suppliers,
                totals: veg_totals,
            }],
            totals: veg_totals,
            order_count: 2,
            skipped: vec![],
        };

        let summary = generator.generate_all(&report, "admin").await.unwrap();
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.created_order_numbers(), vec!["PO-20261016-0001".to_string()]);

        let again = generator.generate_all(&report, "admin").await.unwrap();
        assert_eq!(again.duplicates, 1);
        assert_eq!(again.created, 0);
    }
}
