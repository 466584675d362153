//! # Cutoff Window Repository
//!
//! One row per purchasing cycle. The row with the highest id is the current
//! window; older rows are history.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use wholesale_core::cutoff::{CutoffStatus, CutoffWindow};

#[derive(Debug, sqlx::FromRow)]
struct CutoffRow {
    status: CutoffStatus,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    closed_by: Option<String>,
}

impl TryFrom<CutoffRow> for CutoffWindow {
    type Error = DbError;

    fn try_from(row: CutoffRow) -> DbResult<Self> {
        CutoffWindow::from_parts(row.status, row.opened_at, row.closed_at, row.closed_by)
            .map_err(|e| DbError::Internal(format!("corrupt cutoff window row: {}", e)))
    }
}

/// Repository for cutoff windows.
#[derive(Debug, Clone)]
pub struct CutoffRepository {
    pool: SqlitePool,
}

impl CutoffRepository {
    /// Creates a new CutoffRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CutoffRepository { pool }
    }

    /// Returns the latest persisted window, if any cycle was ever started.
    pub async fn current(&self) -> DbResult<Option<CutoffWindow>> {
        let row: Option<CutoffRow> = sqlx::query_as(
            r#"
            SELECT status, opened_at, closed_at, closed_by
            FROM cutoff_windows
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(CutoffWindow::try_from).transpose()
    }

    /// Persists a freshly opened window as the new current cycle.
    ///
    /// ## Errors
    /// `UniqueViolation` if another cycle is still open.
    pub async fn insert_open(&self, window: &CutoffWindow) -> DbResult<()> {
        debug!(opened_at = %window.opened_at, "Inserting cutoff window");

        sqlx::query(
            r#"
            INSERT INTO cutoff_windows (status, opened_at, closed_at, closed_by)
            VALUES (?1, ?2, NULL, NULL)
            "#,
        )
        .bind(CutoffStatus::Open)
        .bind(window.opened_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes the closing of the current window.
    ///
    /// ## Errors
    /// `NotFound` if the current window is no longer open (someone else
    /// closed it first).
    pub async fn close_current(&self, closed: &CutoffWindow) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cutoff_windows SET
                status = 'closed',
                closed_at = ?1,
                closed_by = ?2,
                version = version + 1
            WHERE id = (SELECT MAX(id) FROM cutoff_windows)
              AND status = 'open'
            "#,
        )
        .bind(closed.closed_at)
        .bind(closed.closed_by.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Open cutoff window", "current"));
        }

        Ok(())
    }

    /// Lists past and current windows, newest first.
    pub async fn history(&self, limit: i64) -> DbResult<Vec<CutoffWindow>> {
        let rows: Vec<CutoffRow> = sqlx::query_as(
            r#"
            SELECT status, opened_at, closed_at, closed_by
            FROM cutoff_windows
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CutoffWindow::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_open_close_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.cutoff_windows();

        assert!(repo.current().await.unwrap().is_none());

        let open = CutoffWindow::opened(at(9));
        repo.insert_open(&open).await.unwrap();
        assert_eq!(repo.current().await.unwrap(), Some(open.clone()));

        let closed = open.close("admin", at(14)).unwrap();
        repo.close_current(&closed).await.unwrap();
        assert_eq!(repo.current().await.unwrap(), Some(closed.clone()));

        // A second close finds nothing open.
        assert!(matches!(
            repo.close_current(&closed).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_only_one_open_window() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.cutoff_windows();

        repo.insert_open(&CutoffWindow::opened(at(9))).await.unwrap();
        let err = repo.insert_open(&CutoffWindow::opened(at(10))).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.cutoff_windows();

        let first = CutoffWindow::opened(at(1));
        repo.insert_open(&first).await.unwrap();
        repo.close_current(&first.close("admin", at(2)).unwrap()).await.unwrap();
        repo.insert_open(&CutoffWindow::opened(at(9))).await.unwrap();

        let history = repo.history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].is_open());
        assert_eq!(history[1].opened_at, at(1));
    }
}
