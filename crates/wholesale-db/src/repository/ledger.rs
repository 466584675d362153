//! # Purchase Ledger Repository
//!
//! Append-only receipts. Rows are inserted together with the completion of
//! their purchase order and never updated or deleted afterwards (the schema
//! triggers refuse both).
//!
//! ## Reconciliation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_receipt(draft, po_version)                                      │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. Bump document_sequences (purchase_ledger, day)              │   │
//! │  │  2. INSERT INTO purchase_ledgers                                │   │
//! │  │  3. UPDATE purchase_orders SET status = 'completed', ...        │   │
//! │  │     WHERE version = ? AND status = 'confirmed'                  │   │
//! │  │     └── 0 rows? → ConcurrencyConflict, all of it rolls back     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::purchase_order::{complete_in, get_in};
use crate::repository::sequence::next_document_number;
use wholesale_core::ledger::LedgerDraft;
use wholesale_core::numbering::DocumentKind;
use wholesale_core::{Money, PurchaseLedger, PurchaseLedgerItem, PurchaseOrder};

const SELECT_COLUMNS: &str = r#"
    SELECT
        ledger_number, purchase_order_number, supplier_id, supplier_name,
        items, total_amount, received_by, created_at
    FROM purchase_ledgers
"#;

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    ledger_number: String,
    purchase_order_number: String,
    supplier_id: String,
    supplier_name: String,
    items: Json<Vec<PurchaseLedgerItem>>,
    total_amount: i64,
    received_by: String,
    created_at: DateTime<Utc>,
}

impl From<LedgerRow> for PurchaseLedger {
    fn from(row: LedgerRow) -> Self {
        PurchaseLedger {
            ledger_number: row.ledger_number,
            purchase_order_number: row.purchase_order_number,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            items: row.items.0,
            total_amount: Money::from_minor(row.total_amount),
            received_by: row.received_by,
            created_at: row.created_at,
        }
    }
}

/// Repository for purchase ledgers.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Writes the ledger and completes its purchase order atomically.
    ///
    /// ## Arguments
    /// * `prefix` / `day` - numbering scheme for the ledger number
    /// * `draft` - the validated receipt
    /// * `po_expected_version` - version of the purchase order the draft was built from
    /// * `now` - ledger `created_at` and the order's `completed_at`
    ///
    /// ## Returns
    /// The stored ledger and the completed purchase order.
    pub async fn record_receipt(
        &self,
        prefix: &str,
        day: NaiveDate,
        draft: LedgerDraft,
        po_expected_version: i64,
        now: DateTime<Utc>,
    ) -> DbResult<(PurchaseLedger, PurchaseOrder)> {
        let mut tx = self.pool.begin().await?;

        let ledger_number =
            next_document_number(&mut tx, DocumentKind::PurchaseLedger, prefix, day).await?;
        let ledger = draft.into_ledger(ledger_number, now);

        debug!(
            ledger_number = %ledger.ledger_number,
            purchase_order = %ledger.purchase_order_number,
            "Inserting purchase ledger"
        );

        sqlx::query(
            r#"
            INSERT INTO purchase_ledgers (
                ledger_number, purchase_order_number, supplier_id, supplier_name,
                items, total_amount, received_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&ledger.ledger_number)
        .bind(&ledger.purchase_order_number)
        .bind(&ledger.supplier_id)
        .bind(&ledger.supplier_name)
        .bind(Json(&ledger.items))
        .bind(ledger.total_amount.minor())
        .bind(&ledger.received_by)
        .bind(ledger.created_at)
        .execute(&mut *tx)
        .await?;

        complete_in(
            &mut tx,
            &ledger.purchase_order_number,
            po_expected_version,
            &ledger.ledger_number,
            now,
            &ledger.received_by,
        )
        .await?;

        let order = get_in(&mut tx, &ledger.purchase_order_number)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", &ledger.purchase_order_number))?;

        tx.commit().await?;

        info!(
            ledger_number = %ledger.ledger_number,
            purchase_order = %order.order_number,
            total = %ledger.total_amount,
            "Receipt recorded"
        );

        Ok((ledger, order))
    }

    /// Gets a ledger by number.
    pub async fn get(&self, ledger_number: &str) -> DbResult<Option<PurchaseLedger>> {
        let sql = format!("{} WHERE ledger_number = ?1", SELECT_COLUMNS);
        let row: Option<LedgerRow> = sqlx::query_as(&sql)
            .bind(ledger_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PurchaseLedger::from))
    }

    /// Gets the ledger that completed a purchase order.
    pub async fn get_for_purchase_order(
        &self,
        order_number: &str,
    ) -> DbResult<Option<PurchaseLedger>> {
        let sql = format!("{} WHERE purchase_order_number = ?1", SELECT_COLUMNS);
        let row: Option<LedgerRow> = sqlx::query_as(&sql)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PurchaseLedger::from))
    }

    /// Counts all ledgers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_ledgers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use std::collections::HashMap;
    use wholesale_core::ledger::ReceivedLine;
    use wholesale_core::{
        NotificationStatus, PurchaseOrderItem, PurchaseOrderStatus, SupplierSnapshot,
        DEFAULT_CATEGORY,
    };

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    async fn confirmed_po(db: &Database) -> PurchaseOrder {
        let draft = PurchaseOrder {
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
            cycle_date: day(),
            status: PurchaseOrderStatus::Placed,
            notification: NotificationStatus::Unsent,
            last_notified_at: None,
            last_notification_error: None,
            purchase_ledger_number: None,
            completed_at: None,
            processed_by: None,
            created_at: Utc::now(),
            version: 0,
        };
        let po = db.purchase_orders().insert_numbered("PO", draft).await.unwrap();
        let mut confirmed = po.clone();
        confirmed.status = PurchaseOrderStatus::Confirmed;
        db.purchase_orders().update(&confirmed, po.version).await.unwrap()
    }

    fn receipt(po: &PurchaseOrder) -> LedgerDraft {
        LedgerDraft::build(
            po,
            &[ReceivedLine {
                product_id: "X".to_string(),
                received_quantity: 7,
                actual_unit_price: Money::from_minor(1200),
            }],
            &HashMap::new(),
            DEFAULT_CATEGORY,
            "dock-1",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_record_receipt_completes_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let po = confirmed_po(&db).await;

        let (ledger, completed) = db
            .ledgers()
            .record_receipt("PL", day(), receipt(&po), po.version, Utc::now())
            .await
            .unwrap();

        assert_eq!(ledger.ledger_number, "PL-20261016-0001");
        assert_eq!(ledger.total_amount, Money::from_minor(8400));
        assert_eq!(completed.status, PurchaseOrderStatus::Completed);
        assert_eq!(completed.purchase_ledger_number.as_deref(), Some("PL-20261016-0001"));
        assert!(completed.completed_at.is_some());

        let stored = db.ledgers().get_for_purchase_order(&po.order_number).await.unwrap().unwrap();
        assert_eq!(stored.items, ledger.items);
    }

    #[tokio::test]
    async fn test_stale_version_rolls_everything_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let po = confirmed_po(&db).await;

        let err = db
            .ledgers()
            .record_receipt("PL", day(), receipt(&po), po.version - 1, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ConcurrencyConflict { .. }));

        assert_eq!(db.ledgers().count().await.unwrap(), 0);
        let stored = db.purchase_orders().get_required(&po.order_number).await.unwrap();
        assert_eq!(stored.status, PurchaseOrderStatus::Confirmed);
        assert_eq!(
            db.sequences().current(DocumentKind::PurchaseLedger, day()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_ledgers_are_immutable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let po = confirmed_po(&db).await;
        let (ledger, _) = db
            .ledgers()
            .record_receipt("PL", day(), receipt(&po), po.version, Utc::now())
            .await
            .unwrap();

        let update = sqlx::query("UPDATE purchase_ledgers SET total_amount = 1 WHERE ledger_number = ?1")
            .bind(&ledger.ledger_number)
            .execute(db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(update, Err(DbError::Immutable(_))));

        let delete = sqlx::query("DELETE FROM purchase_ledgers WHERE ledger_number = ?1")
            .bind(&ledger.ledger_number)
            .execute(db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(delete, Err(DbError::Immutable(_))));

        assert_eq!(db.ledgers().get(&ledger.ledger_number).await.unwrap(), Some(ledger));
    }
}
