//! # Aggregation Engine
//!
//! Turns the confirmed sale orders of a cycle into purchase demand.
//!
//! ## Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Snapshot: confirmed sale orders with placed_at >= since             │
//! │  2. Resolve:  distinct product ids → catalog (bounded concurrency)      │
//! │  3. Fold:     wholesale_core::aggregation::fold_orders (pure)           │
//! │  4. Report:   unresolved lines are logged and listed, never fatal       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is written. Runs may overlap with intake and with each other;
//! each sees its own snapshot.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wholesale_core::aggregation::fold_orders;
use wholesale_core::{AggregationReport, CatalogProduct, SaleOrder};

use crate::cutoff::window_at;
use crate::engine::EngineContext;
use crate::error::EngineResult;
use crate::ports::ProductCatalog;

/// Looks up every distinct product id, `buffer_unordered(concurrency)` at a time.
///
/// Unknown products are simply absent from the returned map.
pub(crate) async fn resolve_products<'a>(
    catalog: &dyn ProductCatalog,
    product_ids: impl IntoIterator<Item = &'a str>,
    concurrency: usize,
) -> EngineResult<HashMap<String, CatalogProduct>> {
    let ids: BTreeSet<&str> = product_ids.into_iter().collect();

    let found: Vec<Option<CatalogProduct>> = stream::iter(ids)
        .map(|id| catalog.get_product(id))
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(found
        .into_iter()
        .flatten()
        .map(|p| (p.product_id.clone(), p))
        .collect())
}

#[derive(Clone)]
pub struct AggregationEngine {
    ctx: EngineContext,
    catalog: Arc<dyn ProductCatalog>,
}

impl AggregationEngine {
    pub fn new(ctx: EngineContext, catalog: Arc<dyn ProductCatalog>) -> Self {
        AggregationEngine { ctx, catalog }
    }

    /// Aggregates all confirmed orders placed at or after `since`.
    pub async fn aggregate(&self, since: DateTime<Utc>) -> EngineResult<AggregationReport> {
        let orders = self.ctx.db.sale_orders().list_confirmed_since(since).await?;
        debug!(%since, orders = orders.len(), "Aggregation snapshot taken");

        let report = self.fold(&orders, since).await?;

        info!(
            %since,
            orders = report.order_count,
            categories = report.categories.len(),
            total_quantity = report.totals.total_quantity,
            total_amount = %report.totals.total_amount,
            skipped = report.skipped.len(),
            "Aggregation complete"
        );
        Ok(report)
    }

    /// Aggregates from the moment the current cycle opened.
    pub async fn aggregate_current_cycle(&self) -> EngineResult<AggregationReport> {
        let window = window_at(&self.ctx, self.ctx.now()).await?;
        self.aggregate(window.opened_at).await
    }

    async fn fold(
        &self,
        orders: &[SaleOrder],
        since: DateTime<Utc>,
    ) -> EngineResult<AggregationReport> {
        let product_ids = orders
            .iter()
            .flat_map(|o| o.items.iter().map(|i| i.product_id.as_str()));

        let catalog = resolve_products(
            self.catalog.as_ref(),
            product_ids,
            self.ctx.config.aggregation.lookup_concurrency,
        )
        .await?;

        let report = fold_orders(orders, since, &catalog)?;

        for line in &report.skipped {
            warn!(
                order_number = %line.order_number,
                product_id = %line.product_id,
                quantity = line.quantity,
                "Product not in catalog, line left out of aggregation"
            );
        }

        Ok(report)
    }
}
