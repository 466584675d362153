//! # Document Sequence Repository
//!
//! Per-day counters behind `PREFIX-YYYYMMDD-NNNN` numbers.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO document_sequences (kind, day, last_value)                │
//! │  VALUES (?, ?, 1)                                                      │
//! │  ON CONFLICT (kind, day) DO UPDATE SET last_value = last_value + 1     │
//! │  RETURNING last_value                                                  │
//! │                                                                         │
//! │  One statement: the counter row is locked by the enclosing write       │
//! │  transaction, so two inserts on the same day never share a number.     │
//! │  If the document insert rolls back, so does the counter bump.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use wholesale_core::numbering::{format_document_number, DocumentKind};

/// Repository for daily document counters.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Returns the last number handed out for `kind` on `day` (0 if none).
    pub async fn current(&self, kind: DocumentKind, day: NaiveDate) -> DbResult<i64> {
        let value: Option<i64> = sqlx::query_scalar(
            "SELECT last_value FROM document_sequences WHERE kind = ?1 AND day = ?2",
        )
        .bind(kind.as_str())
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.unwrap_or(0))
    }
}

/// Bumps and returns the counter for `kind` on `day`.
///
/// Takes a connection so callers run it inside their own transaction.
pub async fn next_value(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    day: NaiveDate,
) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO document_sequences (kind, day, last_value)
        VALUES (?1, ?2, 1)
        ON CONFLICT (kind, day) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(kind.as_str())
    .bind(day)
    .fetch_one(&mut *conn)
    .await?;

    debug!(kind = kind.as_str(), %day, value, "Allocated document sequence");
    Ok(value)
}

/// Allocates the next formatted document number.
pub async fn next_document_number(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    prefix: &str,
    day: NaiveDate,
) -> DbResult<String> {
    let value = next_value(conn, kind, day).await?;
    Ok(format_document_number(prefix, day, value))
}

// =============================================================================
// Unit Tests
// =============================================================================
