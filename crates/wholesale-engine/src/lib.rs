//! # wholesale-engine: Daily Cutoff and Purchasing Services
//!
//! Async services over `wholesale-db` that run one purchasing cycle:
//! open the window, take orders, close, aggregate, raise purchase orders,
//! notify suppliers, reconcile deliveries.
//!
//! ## Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          One Purchasing Cycle                           │
//! │                                                                         │
//! │   open ──► intake (regular) ──► close ──► intake (additional)           │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                          aggregate confirmed orders                     │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │             generate one PO per (category, supplier, cycle date)        │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                   dispatch notices ──► placed → confirmed               │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                  reconcile receipt ──► ledger + completed               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - `WholesaleEngine` facade and shared `EngineContext`
//! - [`cutoff`] - Window open/close
//! - [`intake`] - Sale order submission and phase stamping
//! - [`orders`] - Operator status changes
//! - [`aggregation`] - Demand aggregation
//! - [`generator`] - Purchase order generation
//! - [`dispatch`] - Supplier notification
//! - [`reconciliation`] - Inbound receipt and ledger
//! - [`ports`] - Catalog, directory, sender and clock traits
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Engine error types
//!
//! ## Collaborators
//!
//! The product catalog, company directory and notification provider live
//! outside this crate. Implement [`ProductCatalog`], [`CompanyDirectory`]
//! and [`NotificationSender`] and hand them to [`WholesaleEngine::new`].

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregation;
pub mod config;
pub mod cutoff;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod generator;
pub mod intake;
pub mod orders;
pub mod ports;
pub mod reconciliation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregation::AggregationEngine;
pub use config::EngineConfig;
pub use cutoff::CutoffManager;
pub use dispatch::{DispatchCoordinator, DispatchResult, DispatchSummary, SkippedDispatch};
pub use engine::{EngineContext, WholesaleEngine};
pub use error::{EngineError, EngineResult, TransportError};
pub use generator::{GenerationOutcome, GenerationResult, GenerationSummary, PurchaseOrderGenerator};
pub use intake::OrderIntake;
pub use orders::OrderService;
pub use ports::{
    Clock, CompanyDirectory, ManualClock, NotificationSender, ProductCatalog,
    PurchaseOrderNotice, SendReceipt, SystemClock,
};
pub use reconciliation::ReconciliationEngine;
