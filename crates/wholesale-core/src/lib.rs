//! # wholesale-core: Pure Business Logic for the Daily Cutoff Engine
//!
//! Every rule of the purchasing cycle lives here as a pure function over
//! values. No database, no network, no clock: callers pass `now` in.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Wholesale Cutoff Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Admin back-office / storefront (external)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    wholesale-engine                             │   │
//! │  │  cutoff • intake • orders • aggregation • generator • dispatch  │   │
//! │  │  reconciliation                                                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ wholesale-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌─────────────┐ ┌──────────────┐   │   │
//! │  │   │  cutoff  │ │  status  │ │ aggregation │ │ purchase /   │   │   │
//! │  │   │ classify │ │  table   │ │    fold     │ │ ledger       │   │   │
//! │  │   └──────────┘ └──────────┘ └─────────────┘ └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                wholesale-db (SQLite via sqlx)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Sale orders, purchase orders, ledgers, collaborator views
//! - [`money`] - Integer money
//! - [`status`] - Lifecycle transition tables
//! - [`cutoff`] - Cutoff window and phase classifier
//! - [`aggregation`] - Demand fold
//! - [`purchase`] - Purchase order drafting
//! - [`ledger`] - Inbound reconciliation
//! - [`numbering`] - Document number format
//! - [`validation`] - Input rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use wholesale_core::cutoff::CutoffWindow;
//! use wholesale_core::OrderPhase;
//!
//! let window = CutoffWindow::opened(Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap());
//! let window = window
//!     .close("admin", Utc.with_ymd_and_hms(2026, 10, 16, 14, 0, 0).unwrap())
//!     .unwrap();
//!
//! let late = Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap();
//! assert_eq!(window.classify(late), OrderPhase::Additional);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregation;
pub mod cutoff;
pub mod error;
pub mod ledger;
pub mod money;
pub mod numbering;
pub mod purchase;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregation::{AggregationReport, PhaseTotals, SupplierAggregation};
pub use cutoff::{CutoffStatus, CutoffWindow};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use status::{PurchaseOrderStatus, SaleOrderStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Category assigned to ledger lines whose product the catalog no longer knows.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Maximum lines on one sale order or one receipt.
pub const MAX_ORDER_ITEMS: usize = 200;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches keying errors at the dock (an extra zero or two) without
/// constraining real wholesale volumes.
pub const MAX_ITEM_QUANTITY: i64 = 1_000_000;
