//! # Sale Order Repository
//!
//! Database operations for sale orders.
//!
//! ## Sale Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. INTAKE                                                             │
//! │     └── insert_numbered() → SaleOrder { status: placed, phase: ... }   │
//! │         (SO number + insert in one transaction)                        │
//! │                                                                         │
//! │  2. REVIEW                                                             │
//! │     └── update_status() → confirmed / pended / rejected / cancelled    │
//! │         (UPDATE ... WHERE version = ?)                                 │
//! │                                                                         │
//! │  3. AGGREGATION (read-only)                                            │
//! │     └── list_confirmed_since() → snapshot for the fold                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `order_phase` and the items are written once by `insert_numbered` and never
//! touched by any update statement here.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::sequence::next_document_number;
use wholesale_core::numbering::DocumentKind;
use wholesale_core::{BuyerSnapshot, Money, OrderItem, OrderPhase, SaleOrder, SaleOrderStatus};

const SELECT_COLUMNS: &str = r#"
    SELECT
        order_number, buyer_name, buyer_type, items, final_amount, item_count,
        status, order_phase, placed_at,
        pended_reason, rejected_reason, processed_by, processed_at, version
    FROM sale_orders
"#;

#[derive(Debug, sqlx::FromRow)]
struct SaleOrderRow {
    order_number: String,
    buyer_name: String,
    buyer_type: String,
    items: Json<Vec<OrderItem>>,
    final_amount: i64,
    item_count: i64,
    status: SaleOrderStatus,
    order_phase: OrderPhase,
    placed_at: DateTime<Utc>,
    pended_reason: Option<String>,
    rejected_reason: Option<String>,
    processed_by: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    version: i64,
}

impl From<SaleOrderRow> for SaleOrder {
    fn from(row: SaleOrderRow) -> Self {
        SaleOrder {
            order_number: row.order_number,
            buyer: BuyerSnapshot {
                name: row.buyer_name,
                buyer_type: row.buyer_type,
            },
            items: row.items.0,
            final_amount: Money::from_minor(row.final_amount),
            item_count: row.item_count,
            status: row.status,
            order_phase: row.order_phase,
            placed_at: row.placed_at,
            pended_reason: row.pended_reason,
            rejected_reason: row.rejected_reason,
            processed_by: row.processed_by,
            processed_at: row.processed_at,
            version: row.version,
        }
    }
}

/// Repository for sale order database operations.
#[derive(Debug, Clone)]
pub struct SaleOrderRepository {
    pool: SqlitePool,
}

impl SaleOrderRepository {
    /// Creates a new SaleOrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleOrderRepository { pool }
    }

    /// Gets a sale order by number.
    pub async fn get(&self, order_number: &str) -> DbResult<Option<SaleOrder>> {
        let sql = format!("{} WHERE order_number = ?1", SELECT_COLUMNS);
        let row: Option<SaleOrderRow> = sqlx::query_as(&sql)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(SaleOrder::from))
    }

    /// Gets a sale order by number, failing with `NotFound`.
    pub async fn get_required(&self, order_number: &str) -> DbResult<SaleOrder> {
        self.get(order_number)
            .await?
            .ok_or_else(|| DbError::not_found("Sale order", order_number))
    }

    /// Assigns the next `prefix-YYYYMMDD-NNNN` number and inserts the order.
    ///
    /// The `order_number` and `version` of `order` are overwritten. Number
    /// allocation and insert share one transaction.
    pub async fn insert_numbered(
        &self,
        prefix: &str,
        day: NaiveDate,
        mut order: SaleOrder,
    ) -> DbResult<SaleOrder> {
        let mut tx = self.pool.begin().await?;

        order.order_number =
            next_document_number(&mut tx, DocumentKind::SaleOrder, prefix, day).await?;
        order.version = 1;

        debug!(
            order_number = %order.order_number,
            phase = %order.order_phase,
            "Inserting sale order"
        );

        sqlx::query(
            r#"
            INSERT INTO sale_orders (
                order_number, buyer_name, buyer_type, items, final_amount, item_count,
                status, order_phase, placed_at,
                pended_reason, rejected_reason, processed_by, processed_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14
            )
            "#,
        )
        .bind(&order.order_number)
        .bind(&order.buyer.name)
        .bind(&order.buyer.buyer_type)
        .bind(Json(&order.items))
        .bind(order.final_amount.minor())
        .bind(order.item_count)
        .bind(order.status)
        .bind(order.order_phase)
        .bind(order.placed_at)
        .bind(&order.pended_reason)
        .bind(&order.rejected_reason)
        .bind(&order.processed_by)
        .bind(order.processed_at)
        .bind(order.version)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Writes a status change under an optimistic version check.
    ///
    /// Only the status and audit columns are written. On success the
    /// returned order carries the bumped version.
    ///
    /// ## Errors
    /// `ConcurrencyConflict` if the stored version is no longer
    /// `expected_version`.
    pub async fn update_status(
        &self,
        order: &SaleOrder,
        expected_version: i64,
    ) -> DbResult<SaleOrder> {
        let result = sqlx::query(
            r#"
            UPDATE sale_orders SET
                status = ?2,
                pended_reason = ?3,
                rejected_reason = ?4,
                processed_by = ?5,
                processed_at = ?6,
                version = version + 1
            WHERE order_number = ?1 AND version = ?7
            "#,
        )
        .bind(&order.order_number)
        .bind(order.status)
        .bind(&order.pended_reason)
        .bind(&order.rejected_reason)
        .bind(&order.processed_by)
        .bind(order.processed_at)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(
                "Sale order",
                &order.order_number,
                expected_version,
            ));
        }

        debug!(
            order_number = %order.order_number,
            status = %order.status,
            "Sale order status updated"
        );

        let mut updated = order.clone();
        updated.version = expected_version + 1;
        Ok(updated)
    }

    /// Snapshot of confirmed orders placed at or after `since`.
    pub async fn list_confirmed_since(&self, since: DateTime<Utc>) -> DbResult<Vec<SaleOrder>> {
        let sql = format!(
            "{} WHERE status = ?1 AND placed_at >= ?2 ORDER BY placed_at, order_number",
            SELECT_COLUMNS
        );
        let rows: Vec<SaleOrderRow> = sqlx::query_as(&sql)
            .bind(SaleOrderStatus::Confirmed)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(SaleOrder::from).collect())
    }

    /// Lists orders in a status, newest first.
    pub async fn list_by_status(
        &self,
        status: SaleOrderStatus,
        limit: i64,
    ) -> DbResult<Vec<SaleOrder>> {
        let sql = format!(
            "{} WHERE status = ?1 ORDER BY placed_at DESC LIMIT ?2",
            SELECT_COLUMNS
        );
        let rows: Vec<SaleOrderRow> = sqlx::query_as(&sql)
            .bind(status)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(SaleOrder::from).collect())
    }

    /// Counts all sale orders.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
