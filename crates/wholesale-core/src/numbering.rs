//! Document numbers: `PREFIX-YYYYMMDD-NNNN`.
//!
//! The sequence is a per-day counter, one counter per document kind. The
//! counter itself lives in the store (`document_sequences`); this module only
//! formats and parses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

/// Width of the zero-padded sequence part.
pub const SEQUENCE_WIDTH: usize = 4;

/// Which counter a number is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    SaleOrder,
    PurchaseOrder,
    PurchaseLedger,
}

impl DocumentKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::SaleOrder => "sale_order",
            DocumentKind::PurchaseOrder => "purchase_order",
            DocumentKind::PurchaseLedger => "purchase_ledger",
        }
    }
}

/// Formats a document number.
///
/// ```rust
/// use chrono::NaiveDate;
/// use wholesale_core::numbering::format_document_number;
///
/// let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
/// assert_eq!(format_document_number("PO", day, 1), "PO-20261016-0001");
/// ```
///
/// Sequences past 9999 keep all their digits.
pub fn format_document_number(prefix: &str, date: NaiveDate, sequence: i64) -> String {
    format!(
        "{}-{}-{:0width$}",
        prefix,
        date.format("%Y%m%d"),
        sequence,
        width = SEQUENCE_WIDTH
    )
}

/// Splits a document number back into prefix, date and sequence.
pub fn parse_document_number(number: &str) -> ValidationResult<(String, NaiveDate, i64)> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "document number".to_string(),
        reason: reason.to_string(),
    };

    let mut parts = number.splitn(3, '-');
    let (Some(prefix), Some(date), Some(seq)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid("expected PREFIX-YYYYMMDD-NNNN"));
    };
    if prefix.is_empty() {
        return Err(invalid("missing prefix"));
    }
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| invalid("bad date part"))?;
    if seq.len() < SEQUENCE_WIDTH {
        return Err(invalid("sequence too short"));
    }
    let seq: i64 = seq.parse().map_err(|_| invalid("bad sequence part"))?;

    Ok((prefix.to_string(), date, seq))
}
