//! Full purchasing cycle through the `WholesaleEngine` facade.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use wholesale_core::ledger::ReceivedLine;
use wholesale_core::{
    BuyerSnapshot, CatalogProduct, Company, CoreError, Money, NewSaleOrder, NotificationStatus,
    OrderItem, OrderPhase, PurchaseOrderStatus,
};
use wholesale_db::{Database, DbConfig};
use wholesale_engine::{
    CompanyDirectory, EngineConfig, EngineError, EngineResult, ManualClock, NotificationSender,
    ProductCatalog, PurchaseOrderNotice, SendReceipt, TransportError, WholesaleEngine,
};

// =============================================================================
// Collaborators
// =============================================================================

struct Catalog;

#[async_trait]
impl ProductCatalog for Catalog {
    async fn get_product(&self, product_id: &str) -> EngineResult<Option<CatalogProduct>> {
        Ok((product_id == "X").then(|| CatalogProduct {
            product_id: "X".to_string(),
            name: "Cabbage".to_string(),
            spec: "10kg".to_string(),
            category: "veg".to_string(),
            supplier_id: "S1".to_string(),
            supplier_name: "Green Farm".to_string(),
            purchase_price: Some(Money::from_minor(900)),
            stock: None,
        }))
    }
}

struct Directory;

#[async_trait]
impl CompanyDirectory for Directory {
    async fn get_company(&self, business_id: &str) -> EngineResult<Option<Company>> {
        Ok((business_id == "S1").then(|| Company {
            business_id: "S1".to_string(),
            name: "Green Farm".to_string(),
            notification_recipients: vec!["+821000000001".to_string()],
        }))
    }
}

#[derive(Default)]
struct Sender {
    failing: Mutex<HashSet<String>>,
    sent: Mutex<Vec<String>>,
}

impl Sender {
    fn fail(&self, order_number: &str, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(order_number.to_string());
        } else {
            set.remove(order_number);
        }
    }
}

#[async_trait]
impl NotificationSender for Sender {
    async fn send(
        &self,
        _recipients: &[String],
        notice: &PurchaseOrderNotice,
    ) -> Result<SendReceipt, TransportError> {
        self.sent.lock().unwrap().push(notice.order_number.clone());
        if self.failing.lock().unwrap().contains(&notice.order_number) {
            return Err(TransportError::Unavailable("provider returned 503".into()));
        }
        Ok(SendReceipt::default())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn at(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, h, 0, 0).unwrap()
}

async fn setup() -> (WholesaleEngine, Arc<ManualClock>, Arc<Sender>) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let clock = Arc::new(ManualClock::new(at(9)));
    let sender = Arc::new(Sender::default());
    let engine = WholesaleEngine::new(
        db,
        EngineConfig::default(),
        Arc::new(Catalog),
        Arc::new(Directory),
        sender.clone(),
    )
    .with_clock(clock.clone());
    (engine, clock, sender)
}

fn cabbage(qty: i64) -> NewSaleOrder {
    NewSaleOrder::from_items(
        BuyerSnapshot {
            name: "Corner Mart".to_string(),
            buyer_type: "retail".to_string(),
        },
        vec![OrderItem::new("X", "Cabbage", "10kg", qty, Money::from_minor(1000)).unwrap()],
    )
}

/// Runs a cycle up to generation: regular 5, additional 3, both confirmed.
async fn generated_cycle(engine: &WholesaleEngine, clock: &ManualClock) -> String {
    engine.cutoff().open().await.unwrap();

    clock.set(at(10));
    let a = engine.intake().submit(cabbage(5), "storefront").await.unwrap();
    clock.set(at(14));
    engine.cutoff().close("admin").await.unwrap();
    clock.set(at(15));
    let b = engine.intake().submit(cabbage(3), "storefront").await.unwrap();

    engine.orders().confirm_sale(&a.order_number, "admin").await.unwrap();
    engine.orders().confirm_sale(&b.order_number, "admin").await.unwrap();

    let report = engine.aggregation().aggregate(at(9)).await.unwrap();
    let bucket = report.supplier("veg", "S1").unwrap();
    let po = engine.generator().generate(bucket, "veg", "admin").await.unwrap();
    po.order_number
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_late_order_lands_in_additional_bucket() {
    let (engine, clock, _) = setup().await;

    engine.cutoff().open().await.unwrap();
    clock.set(at(10));
    let a = engine.intake().submit(cabbage(5), "storefront").await.unwrap();
    clock.set(at(14));
    engine.cutoff().close("admin").await.unwrap();
    clock.set(at(15));
    let b = engine.intake().submit(cabbage(3), "storefront").await.unwrap();

    assert_eq!(a.order_phase, OrderPhase::Regular);
    assert_eq!(b.order_phase, OrderPhase::Additional);

    engine.orders().confirm_sale(&a.order_number, "admin").await.unwrap();
    engine.orders().confirm_sale(&b.order_number, "admin").await.unwrap();

    let report = engine.aggregation().aggregate(at(9)).await.unwrap();
    let bucket = report.product("veg", "S1", "X").unwrap();
    assert_eq!(bucket.totals.regular_quantity, 5);
    assert_eq!(bucket.totals.additional_quantity, 3);
    assert_eq!(bucket.totals.total_quantity, 8);
    assert_eq!(bucket.totals.total_amount, Money::from_minor(8000));
}

#[tokio::test]
async fn test_generate_places_one_line_per_product() {
    let (engine, clock, _) = setup().await;
    let number = generated_cycle(&engine, &clock).await;

    let po = engine.database().purchase_orders().get_required(&number).await.unwrap();
    assert_eq!(po.items.len(), 1);
    assert_eq!(po.items[0].quantity, 8);
    assert_eq!(po.status, PurchaseOrderStatus::Placed);
    assert_eq!(po.notification, NotificationStatus::Unsent);
    assert_eq!(po.cycle_date, at(9).date_naive());

    // Same bucket again in the same cycle is refused.
    let report = engine.aggregation().aggregate(at(9)).await.unwrap();
    let err = engine
        .generator()
        .generate(report.supplier("veg", "S1").unwrap(), "veg", "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateOrder { existing, .. } if existing == number));
}

#[tokio::test]
async fn test_failed_dispatch_is_resent() {
    let (engine, clock, sender) = setup().await;
    let number = generated_cycle(&engine, &clock).await;

    sender.fail(&number, true);
    let first = engine.dispatch().dispatch_batch(&[number.clone()], "admin").await.unwrap();
    assert_eq!(first.failed, 1);

    let po = engine.database().purchase_orders().get_required(&number).await.unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::Placed);
    assert_eq!(po.notification, NotificationStatus::Failed);

    sender.fail(&number, false);
    let resend = engine.dispatch().resend_failed("admin").await.unwrap();
    assert_eq!(resend.attempted, 1);
    assert_eq!(resend.results[0].order_number, number);
    assert_eq!(*sender.sent.lock().unwrap(), vec![number.clone(), number.clone()]);

    let po = engine.database().purchase_orders().get_required(&number).await.unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::Confirmed);
    assert_eq!(po.notification, NotificationStatus::Success);
}

#[tokio::test]
async fn test_reconcile_completes_once() {
    let (engine, clock, _) = setup().await;
    let number = generated_cycle(&engine, &clock).await;
    engine.dispatch().dispatch_batch(&[number.clone()], "admin").await.unwrap();

    let lines = [ReceivedLine {
        product_id: "X".to_string(),
        received_quantity: 7,
        actual_unit_price: Money::from_minor(1200),
    }];
    let ledger = engine.reconciliation().reconcile(&number, &lines, "dock-2").await.unwrap();
    assert_eq!(ledger.items[0].line_total, Money::from_minor(8400));
    assert_eq!(ledger.total_amount, Money::from_minor(8400));

    let po = engine.database().purchase_orders().get_required(&number).await.unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::Completed);
    assert_eq!(po.purchase_ledger_number, Some(ledger.ledger_number.clone()));

    let err = engine.reconciliation().reconcile(&number, &lines, "dock-2").await.unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::AlreadyCompleted { .. })));
}

#[tokio::test]
async fn test_zero_price_receipt_changes_nothing() {
    let (engine, clock, _) = setup().await;
    let number = generated_cycle(&engine, &clock).await;
    engine.dispatch().dispatch_batch(&[number.clone()], "admin").await.unwrap();
    let before = engine.database().purchase_orders().get_required(&number).await.unwrap();

    let lines = [
        ReceivedLine {
            product_id: "X".to_string(),
            received_quantity: 7,
            actual_unit_price: Money::from_minor(1200),
        },
        ReceivedLine {
            product_id: "Y".to_string(),
            received_quantity: 1,
            actual_unit_price: Money::zero(),
        },
    ];
    let err = engine.reconciliation().reconcile(&number, &lines, "dock-2").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let after = engine.database().purchase_orders().get_required(&number).await.unwrap();
    assert_eq!(after.status, PurchaseOrderStatus::Confirmed);
    assert_eq!(after.version, before.version);
    assert_eq!(engine.database().ledgers().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_generate_all_then_dispatch() {
    let (engine, clock, _) = setup().await;
    engine.cutoff().open().await.unwrap();
    clock.set(at(10));
    let order = engine.intake().submit(cabbage(4), "storefront").await.unwrap();
    engine.orders().confirm_sale(&order.order_number, "admin").await.unwrap();
    clock.set(at(14));
    engine.cutoff().close("admin").await.unwrap();

    let report = engine.aggregation().aggregate_current_cycle().await.unwrap();
    let summary = engine.generator().generate_all(&report, "admin").await.unwrap();
    assert_eq!(summary.created, 1);

    let numbers = summary.created_order_numbers();
    let dispatched = engine.dispatch().dispatch_batch(&numbers, "admin").await.unwrap();
    assert_eq!(dispatched.succeeded, 1);

    let by_cycle: HashMap<_, _> = engine
        .database()
        .purchase_orders()
        .list_for_cycle(at(9).date_naive())
        .await
        .unwrap()
        .into_iter()
        .map(|po| (po.order_number.clone(), po.status))
        .collect();
    assert_eq!(by_cycle.get(&numbers[0]), Some(&PurchaseOrderStatus::Confirmed));
}
