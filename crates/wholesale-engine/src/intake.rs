//! # Sale Order Intake
//!
//! Accepts a sale order, numbers it and stamps its phase from the cutoff
//! window in force at submission time. The phase is never recomputed.

use tracing::info;
use wholesale_core::cutoff::{classify, cycle_date};
use wholesale_core::validation::{validate_actor, validate_item_count};
use wholesale_core::{verify_items_and_total, NewSaleOrder, SaleOrder, SaleOrderStatus};

use crate::cutoff::window_at;
use crate::engine::EngineContext;
use crate::error::EngineResult;

#[derive(Clone)]
pub struct OrderIntake {
    ctx: EngineContext,
}

impl OrderIntake {
    pub fn new(ctx: EngineContext) -> Self {
        OrderIntake { ctx }
    }

    /// Validates, classifies and stores a new sale order as `placed`.
    ///
    /// ## Errors
    /// `Validation` when any line total or the final amount does not add up;
    /// nothing is recomputed on the caller's behalf.
    pub async fn submit(&self, order: NewSaleOrder, actor: &str) -> EngineResult<SaleOrder> {
        validate_actor(actor)?;
        validate_item_count(order.items.len())?;
        verify_items_and_total(&order.items, order.final_amount)?;

        let now = self.ctx.now();
        let window = window_at(&self.ctx, now).await?;
        let phase = classify(now, &window);

        let draft = SaleOrder {
            order_number: String::new(),
            buyer: order.buyer,
            item_count: order.items.len() as i64,
            items: order.items,
            final_amount: order.final_amount,
            status: SaleOrderStatus::Placed,
            order_phase: phase,
            placed_at: now,
            pended_reason: None,
            rejected_reason: None,
            processed_by: None,
            processed_at: None,
            version: 0,
        };

        let stored = self
            .ctx
            .db
            .sale_orders()
            .insert_numbered(
                &self.ctx.config.numbering.sale_order_prefix,
                cycle_date(now, self.ctx.offset()),
                draft,
            )
            .await?;

        info!(
            order_number = %stored.order_number,
            phase = %stored.order_phase,
            amount = %stored.final_amount,
            submitted_by = actor,
            "Sale order placed"
        );
        Ok(stored)
    }
}
