//! # Repository Module
//!
//! Database repository implementations for the cutoff engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Engine service                                                         │
//! │       │  db.purchase_orders().get_required("PO-20261016-0001")         │
//! │       ▼                                                                 │
//! │  PurchaseOrderRepository                                                │
//! │  ├── get / get_required / find_live                                    │
//! │  ├── insert_numbered        (number + duplicate guard + insert)        │
//! │  └── update                 (WHERE version = ?)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions ending in `_in` take a `&mut SqliteConnection` so that several
//! repositories can share one transaction.
//!
//! ## Available Repositories
//!
//! - [`cutoff::CutoffRepository`] - Cutoff windows
//! - [`sale_order::SaleOrderRepository`] - Sale orders
//! - [`purchase_order::PurchaseOrderRepository`] - Purchase orders
//! - [`ledger::LedgerRepository`] - Purchase ledgers
//! - [`sequence::SequenceRepository`] - Daily document counters

pub mod cutoff;
pub mod ledger;
pub mod purchase_order;
pub mod sale_order;
pub mod sequence;
