//! # External Collaborators
//!
//! The engine reads products and companies, sends supplier notifications,
//! and asks for the time through these traits. Master-data CRUD and SMS/push
//! mechanics live behind them and are not part of this crate.
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────┐      ┌──────────────────┐
//! │  ProductCatalog  │      │ CompanyDirectory │      │NotificationSender│
//! │  get_product(id) │      │ get_company(id)  │      │ send(to, notice) │
//! └────────┬─────────┘      └────────┬─────────┘      └────────┬─────────┘
//!          │ aggregation,            │ generator               │ dispatch
//!          │ reconciliation          │                         │
//!          ▼                         ▼                         ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          wholesale-engine                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use ts_rs::TS;
use wholesale_core::{CatalogProduct, Company, PurchaseOrder, PurchaseOrderItem};

use crate::error::{EngineResult, TransportError};

/// Product master data lookup.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns `None` for an unknown product.
    ///
    /// An `Err` means the catalog itself could not answer.
    async fn get_product(&self, product_id: &str) -> EngineResult<Option<CatalogProduct>>;
}

/// Supplier / customer directory lookup.
#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// Returns `None` for an unknown business id.
    async fn get_company(&self, business_id: &str) -> EngineResult<Option<Company>>;
}

/// Delivers one notice to all of a supplier's recipients.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        notice: &PurchaseOrderNotice,
    ) -> Result<SendReceipt, TransportError>;
}

/// What the provider hands back for an accepted notice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SendReceipt {
    pub provider_message_id: Option<String>,
}

/// The payload sent to a supplier for one purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseOrderNotice {
    pub order_number: String,
    pub supplier_name: String,
    pub category: String,
    #[ts(as = "String")]
    pub cycle_date: NaiveDate,
    pub items: Vec<PurchaseOrderItem>,
}

impl PurchaseOrderNotice {
    pub fn for_order(po: &PurchaseOrder) -> Self {
        PurchaseOrderNotice {
            order_number: po.order_number.clone(),
            supplier_name: po.supplier.name.clone(),
            category: po.category.clone(),
            cycle_date: po.cycle_date,
            items: po.items.clone(),
        }
    }

    /// Plain-text body for SMS-style transports.
    pub fn text(&self) -> String {
        let mut body = format!(
            "[{}] {} {} ({})",
            self.order_number, self.supplier_name, self.cycle_date, self.category
        );
        for item in &self.items {
            body.push_str(&format!("\n- {} {} x{}", item.name, item.spec, item.quantity));
        }
        body
    }
}

// =============================================================================
// Clock
// =============================================================================

/// Source of "now" for every timestamp the engine writes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Stored as microseconds so it can be shared without a lock.
#[derive(Debug)]
pub struct ManualClock {
    micros: AtomicI64,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        ManualClock {
            micros: AtomicI64::new(at.timestamp_micros()),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.micros.store(at.timestamp_micros(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let delta = by.num_microseconds().unwrap_or(i64::MAX);
        self.micros.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wholesale_core::{NotificationStatus, PurchaseOrderStatus, SupplierSnapshot};

    #[test]
    fn test_manual_clock() {
        let start = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(5));
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2026, 10, 16, 14, 0, 0).unwrap());

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_notice_text_lists_items() {
        let po = PurchaseOrder {
            order_number: "PO-20261016-0001".to_string(),
            supplier: SupplierSnapshot {
                supplier_id: "S1".to_string(),
                name: "Green Farm".to_string(),
                notification_recipients: vec!["+821000000000".to_string()],
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
            created_at: Utc::now(),
            version: 1,
        };

        let text = PurchaseOrderNotice::for_order(&po).text();
        assert!(text.starts_with("[PO-20261016-0001] Green Farm 2026-10-16 (veg)"));
        assert!(text.contains("- Cabbage 10kg x8"));
    }
}
