//! # Order Status Service
//!
//! Operator-driven status changes for sale orders and purchase orders.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Read the order (version v)                                          │
//! │  2. Check the transition against the table in wholesale-core::status    │
//! │  3. UPDATE ... WHERE version = v                                        │
//! │       ├── 1 row  → done, version v+1                                    │
//! │       └── 0 rows → re-read: if the new state forbids the transition,    │
//! │                    report that; otherwise ConcurrencyConflict           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Purchase orders never reach `completed` here; see
//! [`ReconciliationEngine`](crate::reconciliation::ReconciliationEngine).

use tracing::{info, warn};
use wholesale_core::status::ensure_cancellation_window;
use wholesale_core::validation::{validate_actor, validate_reason};
use wholesale_core::{PurchaseOrder, PurchaseOrderStatus, SaleOrder, SaleOrderStatus};
use wholesale_db::DbError;

use crate::cutoff::window_at;
use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};

#[derive(Clone)]
pub struct OrderService {
    ctx: EngineContext,
}

impl OrderService {
    pub fn new(ctx: EngineContext) -> Self {
        OrderService { ctx }
    }

    // =========================================================================
    // Sale Orders
    // =========================================================================

    /// `placed | pended → confirmed`
    pub async fn confirm_sale(&self, order_number: &str, actor: &str) -> EngineResult<SaleOrder> {
        self.transition_sale(order_number, actor, SaleOrderStatus::Confirmed, None)
            .await
    }

    /// `placed → pended`, recording why.
    pub async fn pend_sale(
        &self,
        order_number: &str,
        reason: &str,
        actor: &str,
    ) -> EngineResult<SaleOrder> {
        validate_reason(reason)?;
        self.transition_sale(order_number, actor, SaleOrderStatus::Pended, Some(reason))
            .await
    }

    /// `placed | pended → rejected`, recording why.
    pub async fn reject_sale(
        &self,
        order_number: &str,
        reason: &str,
        actor: &str,
    ) -> EngineResult<SaleOrder> {
        validate_reason(reason)?;
        self.transition_sale(order_number, actor, SaleOrderStatus::Rejected, Some(reason))
            .await
    }

    /// `placed | confirmed → cancelled`.
    ///
    /// A confirmed `regular` order is locked once the cutoff window closes.
    pub async fn cancel_sale(&self, order_number: &str, actor: &str) -> EngineResult<SaleOrder> {
        self.transition_sale(order_number, actor, SaleOrderStatus::Cancelled, None)
            .await
    }

    /// `confirmed → completed`
    pub async fn complete_sale(&self, order_number: &str, actor: &str) -> EngineResult<SaleOrder> {
        self.transition_sale(order_number, actor, SaleOrderStatus::Completed, None)
            .await
    }

    async fn transition_sale(
        &self,
        order_number: &str,
        actor: &str,
        to: SaleOrderStatus,
        reason: Option<&str>,
    ) -> EngineResult<SaleOrder> {
        validate_actor(actor)?;
        let now = self.ctx.now();
        let repo = self.ctx.db.sale_orders();

        let current = repo.get_required(order_number).await?;
        let status = current.status.transition_to(to)?;

        if current.status == SaleOrderStatus::Confirmed && to == SaleOrderStatus::Cancelled {
            let window = window_at(&self.ctx, now).await?;
            ensure_cancellation_window(order_number, current.order_phase, current.placed_at, &window)?;
        }

        let mut next = current.clone();
        next.status = status;
        match to {
            SaleOrderStatus::Pended => next.pended_reason = reason.map(str::to_string),
            SaleOrderStatus::Rejected => next.rejected_reason = reason.map(str::to_string),
            _ => {}
        }
        next.processed_by = Some(actor.trim().to_string());
        next.processed_at = Some(now);

        match repo.update_status(&next, current.version).await {
            Ok(updated) => {
                info!(
                    order_number,
                    from = %current.status,
                    to = %updated.status,
                    actor,
                    "Sale order status changed"
                );
                Ok(updated)
            }
            Err(DbError::ConcurrencyConflict { .. }) => {
                warn!(order_number, to = %to, "Sale order changed underneath, re-reading");
                let fresh = repo.get_required(order_number).await?;
                fresh.status.transition_to(to)?;
                Err(EngineError::ConcurrencyConflict {
                    entity: "Sale order".to_string(),
                    id: order_number.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Purchase Orders
    // =========================================================================

    /// `placed | pended → confirmed` (supplier acknowledged by other means).
    pub async fn confirm_purchase(
        &self,
        order_number: &str,
        actor: &str,
    ) -> EngineResult<PurchaseOrder> {
        self.transition_purchase(order_number, actor, PurchaseOrderStatus::Confirmed)
            .await
    }

    /// `placed → pended`
    pub async fn pend_purchase(
        &self,
        order_number: &str,
        actor: &str,
    ) -> EngineResult<PurchaseOrder> {
        self.transition_purchase(order_number, actor, PurchaseOrderStatus::Pended)
            .await
    }

    /// `placed | pended → cancelled`. Frees the supplier bucket for a new order.
    pub async fn cancel_purchase(
        &self,
        order_number: &str,
        actor: &str,
    ) -> EngineResult<PurchaseOrder> {
        self.transition_purchase(order_number, actor, PurchaseOrderStatus::Cancelled)
            .await
    }

    async fn transition_purchase(
        &self,
        order_number: &str,
        actor: &str,
        to: PurchaseOrderStatus,
    ) -> EngineResult<PurchaseOrder> {
        validate_actor(actor)?;
        let repo = self.ctx.db.purchase_orders();

        let current = repo.get_required(order_number).await?;
        let status = current.status.manual_transition_to(order_number, to)?;

        let mut next = current.clone();
        next.status = status;
        next.processed_by = Some(actor.trim().to_string());

        match repo.update(&next, current.version).await {
            Ok(updated) => {
                info!(
                    order_number,
                    from = %current.status,
                    to = %updated.status,
                    actor,
                    "Purchase order status changed"
                );
                Ok(updated)
            }
            Err(DbError::ConcurrencyConflict { .. }) => {
                warn!(order_number, to = %to, "Purchase order changed underneath, re-reading");
                let fresh = repo.get_required(order_number).await?;
                fresh.status.manual_transition_to(order_number, to)?;
                Err(EngineError::ConcurrencyConflict {
                    entity: "Purchase order".to_string(),
                    id: order_number.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::cutoff::CutoffManager;
    use crate::intake::OrderIntake;
    use crate::ports::ManualClock;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use std::sync::Arc;
    use wholesale_core::{
        BuyerSnapshot, CoreError, Money, NewSaleOrder, NotificationStatus, OrderItem,
        PurchaseOrderItem, SupplierSnapshot,
    };
    use wholesale_db::{Database, DbConfig};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, 0, 0).unwrap()
    }

    struct Fixture {
        ctx: EngineContext,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = Database::new(DbConfig::in_memory()).await.unwrap();
            let clock = Arc::new(ManualClock::new(at(9)));
            let ctx =
                EngineContext::new(Arc::new(db), Arc::new(EngineConfig::default()), clock.clone());
            Fixture { ctx, clock }
        }

        fn orders(&self) -> OrderService {
            OrderService::new(self.ctx.clone())
        }

        fn cutoff(&self) -> CutoffManager {
            CutoffManager::new(self.ctx.clone())
        }

        async fn place(&self) -> SaleOrder {
            let order = NewSaleOrder::from_items(
                BuyerSnapshot {
                    name: "Corner Mart".to_string(),
                    buyer_type: "retail".to_string(),
                },
                vec![OrderItem::new("X", "Cabbage", "10kg", 2, Money::from_minor(1000)).unwrap()],
            );
            OrderIntake::new(self.ctx.clone())
                .submit(order, "storefront")
                .await
                .unwrap()
        }

        async fn purchase_order(&self) -> PurchaseOrder {
            let po = PurchaseOrder {
                order_number: String::new(),
                supplier: SupplierSnapshot {
                    supplier_id: "S1".to_string(),
                    name: "Green Farm".to_string(),
                    notification_recipients: vec![],
                },
                items: vec![PurchaseOrderItem {
                    product_id: "X".to_string(),
                    name: "Cabbage".to_string(),
                    spec: "10kg".to_string(),
                    quantity: 8,
                }],
                category: "veg".to_string(),
                cycle_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
                status: PurchaseOrderStatus::Placed,
                notification: NotificationStatus::Unsent,
                last_notified_at: None,
                last_notification_error: None,
                purchase_ledger_number: None,
                completed_at: None,
                processed_by: None,
                created_at: at(9),
                version: 0,
            };
            self.ctx.db.purchase_orders().insert_numbered("PO", po).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_confirm_and_complete_sale() {
        let fx = Fixture::new().await;
        fx.cutoff().open().await.unwrap();
        let order = fx.place().await;

        fx.clock.set(at(11));
        let confirmed = fx.orders().confirm_sale(&order.order_number, "admin").await.unwrap();
        assert_eq!(confirmed.status, SaleOrderStatus::Confirmed);
        assert_eq!(confirmed.processed_by.as_deref(), Some("admin"));
        assert_eq!(confirmed.processed_at, Some(at(11)));
        assert_eq!(confirmed.version, order.version + 1);

        let completed = fx.orders().complete_sale(&order.order_number, "admin").await.unwrap();
        assert_eq!(completed.status, SaleOrderStatus::Completed);

        let err = fx.orders().cancel_sale(&order.order_number, "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_pend_and_reject_record_reasons() {
        let fx = Fixture::new().await;
        let order = fx.place().await;

        let pended = fx
            .orders()
            .pend_sale(&order.order_number, "credit check", "admin")
            .await
            .unwrap();
        assert_eq!(pended.pended_reason.as_deref(), Some("credit check"));

        let rejected = fx
            .orders()
            .reject_sale(&order.order_number, "credit refused", "admin")
            .await
            .unwrap();
        assert_eq!(rejected.status, SaleOrderStatus::Rejected);
        assert_eq!(rejected.rejected_reason.as_deref(), Some("credit refused"));
        assert_eq!(rejected.pended_reason.as_deref(), Some("credit check"));
    }

    #[tokio::test]
    async fn test_pend_requires_reason() {
        let fx = Fixture::new().await;
        let order = fx.place().await;
        let err = fx.orders().pend_sale(&order.order_number, " ", "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_regular_order_locked_after_cutoff() {
        let fx = Fixture::new().await;
        fx.cutoff().open().await.unwrap();
        fx.clock.set(at(10));
        let regular = fx.place().await;
        fx.orders().confirm_sale(&regular.order_number, "admin").await.unwrap();

        fx.clock.set(at(14));
        fx.cutoff().close("admin").await.unwrap();
        fx.clock.set(at(15));
        let additional = fx.place().await;
        fx.orders().confirm_sale(&additional.order_number, "admin").await.unwrap();

        let err = fx.orders().cancel_sale(&regular.order_number, "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidState { .. })));

        let cancelled = fx
            .orders()
            .cancel_sale(&additional.order_number, "admin")
            .await
            .unwrap();
        assert_eq!(cancelled.status, SaleOrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_regular_order_cancellable_while_open() {
        let fx = Fixture::new().await;
        fx.cutoff().open().await.unwrap();
        fx.clock.set(at(10));
        let regular = fx.place().await;
        fx.orders().confirm_sale(&regular.order_number, "admin").await.unwrap();

        let cancelled = fx.orders().cancel_sale(&regular.order_number, "admin").await.unwrap();
        assert_eq!(cancelled.status, SaleOrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_next_cycle_keeps_prior_regular_order_locked() {
        let fx = Fixture::new().await;
        fx.cutoff().open().await.unwrap();
        fx.clock.set(at(10));
        let regular = fx.place().await;
        fx.orders().confirm_sale(&regular.order_number, "admin").await.unwrap();

        fx.clock.set(at(14));
        fx.cutoff().close("admin").await.unwrap();
        assert!(fx.orders().cancel_sale(&regular.order_number, "admin").await.is_err());

        fx.clock.set(at(9) + chrono::Duration::days(1));
        fx.cutoff().open().await.unwrap();

        let err = fx.orders().cancel_sale(&regular.order_number, "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidState { .. })));
        let stored = fx.ctx.db.sale_orders().get_required(&regular.order_number).await.unwrap();
        assert_eq!(stored.status, SaleOrderStatus::Confirmed);

        // The new cycle's own regular orders are still cancellable while it is open.
        fx.clock.set(at(10) + chrono::Duration::days(1));
        let today = fx.place().await;
        fx.orders().confirm_sale(&today.order_number, "admin").await.unwrap();
        assert!(fx.orders().cancel_sale(&today.order_number, "admin").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let fx = Fixture::new().await;
        let err = fx.orders().confirm_sale("SO-20261016-9999", "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_purchase_order_transitions() {
        let fx = Fixture::new().await;
        let po = fx.purchase_order().await;

        let pended = fx.orders().pend_purchase(&po.order_number, "admin").await.unwrap();
        assert_eq!(pended.status, PurchaseOrderStatus::Pended);

        let confirmed = fx.orders().confirm_purchase(&po.order_number, "admin").await.unwrap();
        assert_eq!(confirmed.status, PurchaseOrderStatus::Confirmed);

        let err = fx.orders().cancel_purchase(&po.order_number, "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_purchase_order_is_terminal() {
        let fx = Fixture::new().await;
        let po = fx.purchase_order().await;

        fx.orders().cancel_purchase(&po.order_number, "admin").await.unwrap();
        let err = fx.orders().confirm_purchase(&po.order_number, "admin").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));
    }
}
