//! # Inbound Reconciliation
//!
//! Records what actually arrived against a confirmed purchase order.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reconcile(PO-20261016-0003, lines, "dock-2")                           │
//! │                                                                         │
//! │  1. Validate lines           (before any read)                          │
//! │  2. Load PO                  confirmed? else AlreadyCompleted/Invalid   │
//! │  3. Resolve categories       catalog, bounded concurrency               │
//! │  4. Build LedgerDraft        actual quantities × actual unit prices     │
//! │  5. One transaction:                                                    │
//! │       INSERT ledger  +  UPDATE PO → completed WHERE version = v         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 5 is all or nothing: there is never a ledger without a completed
//! order, nor a completed order without its ledger.

use std::sync::Arc;
use tracing::{debug, info, warn};
use wholesale_core::cutoff::cycle_date;
use wholesale_core::ledger::{ensure_reconcilable, validate_received_lines, LedgerDraft, ReceivedLine};
use wholesale_core::validation::validate_actor;
use wholesale_core::PurchaseLedger;
use wholesale_db::DbError;

use crate::aggregation::resolve_products;
use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::ports::ProductCatalog;

#[derive(Clone)]
pub struct ReconciliationEngine {
    ctx: EngineContext,
    catalog: Arc<dyn ProductCatalog>,
}

impl ReconciliationEngine {
    pub fn new(ctx: EngineContext, catalog: Arc<dyn ProductCatalog>) -> Self {
        ReconciliationEngine { ctx, catalog }
    }

    /// Writes the purchase ledger for `order_number` and completes the order.
    ///
    /// ## Errors
    /// - `Validation` for bad lines, before anything is read
    /// - `NotFound` when the order does not exist
    /// - `Core(AlreadyCompleted)` when it was reconciled already, including
    ///   by a concurrent call that won the race
    /// - `Core(InvalidState)` when the order is not `confirmed`
    pub async fn reconcile(
        &self,
        order_number: &str,
        lines: &[ReceivedLine],
        received_by: &str,
    ) -> EngineResult<PurchaseLedger> {
        validate_received_lines(lines)?;
        validate_actor(received_by)?;

        let repo = self.ctx.db.purchase_orders();
        let po = repo.get_required(order_number).await?;
        ensure_reconcilable(&po)?;

        let catalog = resolve_products(
            self.catalog.as_ref(),
            lines.iter().map(|l| l.product_id.as_str()),
            self.ctx.config.aggregation.lookup_concurrency,
        )
        .await?;
        debug!(
            order_number,
            lines = lines.len(),
            resolved = catalog.len(),
            "Receipt products resolved"
        );

        let draft = LedgerDraft::build(
            &po,
            lines,
            &catalog,
            &self.ctx.config.reconciliation.default_category,
            received_by,
        )?;

        let now = self.ctx.now();
        let result = self
            .ctx
            .db
            .ledgers()
            .record_receipt(
                &self.ctx.config.numbering.ledger_prefix,
                cycle_date(now, self.ctx.offset()),
                draft,
                po.version,
                now,
            )
            .await;

        match result {
            Ok((ledger, order)) => {
                info!(
                    ledger_number = %ledger.ledger_number,
                    order_number = %order.order_number,
                    ordered = po.total_quantity(),
                    received = ledger.items.iter().map(|i| i.quantity).sum::<i64>(),
                    total = %ledger.total_amount,
                    received_by = %ledger.received_by,
                    "Purchase order reconciled"
                );
                Ok(ledger)
            }
            Err(DbError::ConcurrencyConflict { .. }) | Err(DbError::UniqueViolation { .. }) => {
                warn!(order_number, "Purchase order changed during reconciliation, re-reading");
                let fresh = repo.get_required(order_number).await?;
                ensure_reconcilable(&fresh)?;
                Err(EngineError::ConcurrencyConflict {
                    entity: "Purchase order".to_string(),
                    id: order_number.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The ledger written for `order_number`, if it has been reconciled.
    pub async fn ledger_for(&self, order_number: &str) -> EngineResult<Option<PurchaseLedger>> {
        Ok(self.ctx.db.ledgers().get_for_purchase_order(order_number).await?)
    }
}
