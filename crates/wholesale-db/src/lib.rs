//! # wholesale-db: Document Store for the Cutoff Engine
//!
//! SQLite persistence for cutoff windows, sale orders, purchase orders and
//! purchase ledgers, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Wholesale Engine Data Flow                          │
//! │                                                                         │
//! │  wholesale-engine service (e.g. reconcile)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   wholesale-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ CutoffRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleOrderRepo  │    │ 001_initial  │  │   │
//! │  │   │               │    │ PurchaseOrder  │    │   _schema    │  │   │
//! │  │   │               │    │ LedgerRepo     │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Guarantees
//!
//! - Every mutable row has a `version`; updates are `WHERE version = ?`
//! - Document numbers are allocated in the same transaction as the insert
//! - Reconciliation (ledger insert + order completion) is one transaction
//! - Ledgers and stored order phases are protected by triggers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wholesale_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("engine.db")).await?;
//! let window = db.cutoff_windows().current().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::cutoff::CutoffRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::purchase_order::PurchaseOrderRepository;
pub use repository::sale_order::SaleOrderRepository;
pub use repository::sequence::SequenceRepository;
