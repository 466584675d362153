//! # Purchase Order Repository
//!
//! Database operations for purchase orders.
//!
//! ## Duplicate Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_numbered(po)                                                    │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. SELECT live PO for (supplier_id, category, cycle_date)      │   │
//! │  │     └── found? → UniqueViolation, nothing written               │   │
//! │  │  2. Bump document_sequences (purchase_order, cycle_date)        │   │
//! │  │  3. INSERT INTO purchase_orders                                 │   │
//! │  │     └── idx_purchase_orders_live_bucket catches the race        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::sequence::next_document_number;
use wholesale_core::numbering::DocumentKind;
use wholesale_core::{
    NotificationStatus, PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus, SupplierSnapshot,
};

const SELECT_COLUMNS: &str = r#"
    SELECT
        order_number, supplier_id, supplier_name, notification_recipients, items,
        category, cycle_date, status, notification, last_notified_at,
        last_notification_error, purchase_ledger_number, completed_at,
        processed_by, created_at, version
    FROM purchase_orders
"#;

#[derive(Debug, sqlx::FromRow)]
struct PurchaseOrderRow {
    order_number: String,
    supplier_id: String,
    supplier_name: String,
    notification_recipients: Json<Vec<String>>,
    items: Json<Vec<PurchaseOrderItem>>,
    category: String,
    cycle_date: NaiveDate,
    status: PurchaseOrderStatus,
    notification: NotificationStatus,
    last_notified_at: Option<DateTime<Utc>>,
    last_notification_error: Option<String>,
    purchase_ledger_number: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    processed_by: Option<String>,
    created_at: DateTime<Utc>,
    version: i64,
}

impl From<PurchaseOrderRow> for PurchaseOrder {
    fn from(row: PurchaseOrderRow) -> Self {
        PurchaseOrder {
            order_number: row.order_number,
            supplier: SupplierSnapshot {
                supplier_id: row.supplier_id,
                name: row.supplier_name,
                notification_recipients: row.notification_recipients.0,
            },
            items: row.items.0,
            category: row.category,
            cycle_date: row.cycle_date,
            status: row.status,
            notification: row.notification,
            last_notified_at: row.last_notified_at,
            last_notification_error: row.last_notification_error,
            purchase_ledger_number: row.purchase_ledger_number,
            completed_at: row.completed_at,
            processed_by: row.processed_by,
            created_at: row.created_at,
            version: row.version,
        }
    }
}

/// Repository for purchase order database operations.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    /// Creates a new PurchaseOrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Gets a purchase order by number.
    pub async fn get(&self, order_number: &str) -> DbResult<Option<PurchaseOrder>> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, order_number).await
    }

    /// Gets a purchase order by number, failing with `NotFound`.
    pub async fn get_required(&self, order_number: &str) -> DbResult<PurchaseOrder> {
        self.get(order_number)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", order_number))
    }

    /// Finds the live (non-cancelled) order for a supplier bucket.
    pub async fn find_live(
        &self,
        supplier_id: &str,
        category: &str,
        cycle_date: NaiveDate,
    ) -> DbResult<Option<PurchaseOrder>> {
        let mut conn = self.pool.acquire().await?;
        find_live_in(&mut conn, supplier_id, category, cycle_date).await
    }

    /// Assigns the next number for the order's cycle date and inserts it.
    ///
    /// ## Errors
    /// `UniqueViolation` (value = the existing order number) if a live
    /// order already covers the same supplier, category and cycle date.
    pub async fn insert_numbered(
        &self,
        prefix: &str,
        mut order: PurchaseOrder,
    ) -> DbResult<PurchaseOrder> {
        let mut tx = self.pool.begin().await?;

        if let Some(existing) = find_live_in(
            &mut tx,
            &order.supplier.supplier_id,
            &order.category,
            order.cycle_date,
        )
        .await?
        {
            return Err(DbError::duplicate(
                "purchase order for supplier/category/cycle",
                existing.order_number,
            ));
        }

        order.order_number =
            next_document_number(&mut tx, DocumentKind::PurchaseOrder, prefix, order.cycle_date)
                .await?;
        order.version = 1;

        debug!(
            order_number = %order.order_number,
            supplier_id = %order.supplier.supplier_id,
            category = %order.category,
            "Inserting purchase order"
        );

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                order_number, supplier_id, supplier_name, notification_recipients, items,
                category, cycle_date, status, notification, last_notified_at,
                last_notification_error, purchase_ledger_number, completed_at,
                processed_by, created_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16
            )
            "#,
        )
        .bind(&order.order_number)
        .bind(&order.supplier.supplier_id)
        .bind(&order.supplier.name)
        .bind(Json(&order.supplier.notification_recipients))
        .bind(Json(&order.items))
        .bind(&order.category)
        .bind(order.cycle_date)
        .bind(order.status)
        .bind(order.notification)
        .bind(order.last_notified_at)
        .bind(&order.last_notification_error)
        .bind(&order.purchase_ledger_number)
        .bind(order.completed_at)
        .bind(&order.processed_by)
        .bind(order.created_at)
        .bind(order.version)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Writes status and notification columns under a version check.
    ///
    /// Completion columns are not written here; see
    /// [`LedgerRepository::record_receipt`](crate::LedgerRepository::record_receipt).
    pub async fn update(
        &self,
        order: &PurchaseOrder,
        expected_version: i64,
    ) -> DbResult<PurchaseOrder> {
        let result = sqlx::query(
            r#"
            UPDATE purchase_orders SET
                status = ?2,
                notification = ?3,
                last_notified_at = ?4,
                last_notification_error = ?5,
                processed_by = ?6,
                version = version + 1
            WHERE order_number = ?1 AND version = ?7 AND status <> 'completed'
            "#,
        )
        .bind(&order.order_number)
        .bind(order.status)
        .bind(order.notification)
        .bind(order.last_notified_at)
        .bind(&order.last_notification_error)
        .bind(&order.processed_by)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(
                "Purchase order",
                &order.order_number,
                expected_version,
            ));
        }

        debug!(
            order_number = %order.order_number,
            status = %order.status,
            notification = order.notification.as_str(),
            "Purchase order updated"
        );

        let mut updated = order.clone();
        updated.version = expected_version + 1;
        Ok(updated)
    }

    /// Orders waiting for a resend: `placed` with a failed notification.
    pub async fn list_failed_notifications(&self) -> DbResult<Vec<PurchaseOrder>> {
        let sql = format!(
            "{} WHERE status = ?1 AND notification = ?2 ORDER BY order_number",
            SELECT_COLUMNS
        );
        let rows: Vec<PurchaseOrderRow> = sqlx::query_as(&sql)
            .bind(PurchaseOrderStatus::Placed)
            .bind(NotificationStatus::Failed)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PurchaseOrder::from).collect())
    }

    /// Lists all orders of one cycle date.
    pub async fn list_for_cycle(&self, cycle_date: NaiveDate) -> DbResult<Vec<PurchaseOrder>> {
        let sql = format!(
            "{} WHERE cycle_date = ?1 ORDER BY order_number",
            SELECT_COLUMNS
        );
        let rows: Vec<PurchaseOrderRow> = sqlx::query_as(&sql)
            .bind(cycle_date)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PurchaseOrder::from).collect())
    }
}

/// Reads a purchase order on a caller-supplied connection.
pub async fn get_in(
    conn: &mut SqliteConnection,
    order_number: &str,
) -> DbResult<Option<PurchaseOrder>> {
    let sql = format!("{} WHERE order_number = ?1", SELECT_COLUMNS);
    let row: Option<PurchaseOrderRow> = sqlx::query_as(&sql)
        .bind(order_number)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(PurchaseOrder::from))
}

async fn find_live_in(
    conn: &mut SqliteConnection,
    supplier_id: &str,
    category: &str,
    cycle_date: NaiveDate,
) -> DbResult<Option<PurchaseOrder>> {
    let sql = format!(
        "{} WHERE supplier_id = ?1 AND category = ?2 AND cycle_date = ?3 AND status <> ?4",
        SELECT_COLUMNS
    );
    let row: Option<PurchaseOrderRow> = sqlx::query_as(&sql)
        .bind(supplier_id)
        .bind(category)
        .bind(cycle_date)
        .bind(PurchaseOrderStatus::Cancelled)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(PurchaseOrder::from))
}

/// Marks a confirmed order completed, on a caller-supplied connection.
///
/// ## Errors
/// `ConcurrencyConflict` if the order moved past `expected_version` or is
/// no longer `confirmed`.
pub async fn complete_in(
    conn: &mut SqliteConnection,
    order_number: &str,
    expected_version: i64,
    ledger_number: &str,
    completed_at: DateTime<Utc>,
    processed_by: &str,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE purchase_orders SET
            status = 'completed',
            purchase_ledger_number = ?2,
            completed_at = ?3,
            processed_by = ?4,
            version = version + 1
        WHERE order_number = ?1 AND version = ?5 AND status = 'confirmed'
        "#,
    )
    .bind(order_number)
    .bind(ledger_number)
    .bind(completed_at)
    .bind(processed_by)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict("Purchase order", order_number, expected_version));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn cycle() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn draft(supplier_id: &str, category: &str) -> PurchaseOrder {
        PurchaseOrder {
            order_number: String::new(),
            supplier: SupplierSnapshot {
                supplier_id: supplier_id.to_string(),
                name: "Green Farm".to_string(),
                notification_recipients: vec!["010-1111-2222".to_string()],
            },
            items: vec![PurchaseOrderItem {
                product_id: "X".to_string(),
                name: "Cabbage".to_string(),
                spec: "10kg".to_string(),
                quantity: 8,
            }],
            category: category.to_string(),
            cycle_date: cycle(),
            status: PurchaseOrderStatus::Placed,
            notification: NotificationStatus::Unsent,
            last_notified_at: None,
            last_notification_error: None,
            purchase_ledger_number: None,
            completed_at: None,
            processed_by: Some("admin".to_string()),
            created_at: Utc::now(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.purchase_orders();

        let po = repo.insert_numbered("PO", draft("S1", "veg")).await.unwrap();
        assert_eq!(po.order_number, "PO-20261016-0001");

        let stored = repo.get_required(&po.order_number).await.unwrap();
        assert_eq!(stored.items, po.items);
        assert_eq!(stored.supplier, po.supplier);
        assert_eq!(stored.cycle_date, cycle());
        assert_eq!(stored.notification, NotificationStatus::Unsent);
        assert!(repo.get("PO-20261016-9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_bucket_is_refused() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.purchase_orders();

        let first = repo.insert_numbered("PO", draft("S1", "veg")).await.unwrap();
        let err = repo.insert_numbered("PO", draft("S1", "veg")).await.unwrap_err();
        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, first.order_number),
            other => panic!("unexpected error: {other:?}"),
        }

        // The refused insert did not consume a number.
        let other = repo.insert_numbered("PO", draft("S1", "fruit")).await.unwrap();
        assert_eq!(other.order_number, "PO-20261016-0002");

        // Cancelling frees the bucket.
        let mut cancelled = first.clone();
        cancelled.status = PurchaseOrderStatus::Cancelled;
        repo.update(&cancelled, first.version).await.unwrap();
        assert!(repo.insert_numbered("PO", draft("S1", "veg")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_and_failed_listing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.purchase_orders();

        let po = repo.insert_numbered("PO", draft("S1", "veg")).await.unwrap();
        let mut failed = po.clone();
        failed.notification = NotificationStatus::Failed;
        failed.last_notification_error = Some("gateway down".to_string());
        let saved = repo.update(&failed, po.version).await.unwrap();
        assert_eq!(saved.version, 2);

        let pending = repo.list_failed_notifications().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].last_notification_error.as_deref(), Some("gateway down"));

        assert!(matches!(
            repo.update(&failed, po.version).await,
            Err(DbError::ConcurrencyConflict { .. })
        ));
        assert_eq!(repo.list_for_cycle(cycle()).await.unwrap().len(), 1);
    }
}
