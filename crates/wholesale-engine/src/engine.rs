//! # Engine Facade
//!
//! Holds the shared handles (store, config, clock, collaborators) and hands
//! out the individual services, the same way `Database` hands out
//! repositories.
//!
//! ## Usage
//! ```rust,ignore
//! let engine = WholesaleEngine::new(db, config, catalog, directory, sender);
//!
//! engine.cutoff().open().await?;
//! let order = engine.intake().submit(new_order, "storefront").await?;
//! engine.orders().confirm_sale(&order.order_number, "admin").await?;
//! engine.cutoff().close("admin").await?;
//!
//! let report = engine.aggregation().aggregate_current_cycle().await?;
//! let summary = engine.generator().generate_all(&report, "admin").await?;
//! engine.dispatch().dispatch_batch(&summary.created_order_numbers(), "admin").await?;
//! ```

use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use wholesale_db::Database;

use crate::aggregation::AggregationEngine;
use crate::config::EngineConfig;
use crate::cutoff::CutoffManager;
use crate::dispatch::DispatchCoordinator;
use crate::generator::PurchaseOrderGenerator;
use crate::intake::OrderIntake;
use crate::orders::OrderService;
use crate::ports::{Clock, CompanyDirectory, NotificationSender, ProductCatalog, SystemClock};
use crate::reconciliation::ReconciliationEngine;

/// Handles every service needs.
#[derive(Clone)]
pub struct EngineContext {
    pub db: Arc<Database>,
    pub config: Arc<EngineConfig>,
    pub clock: Arc<dyn Clock>,
}

impl EngineContext {
    pub fn new(db: Arc<Database>, config: Arc<EngineConfig>, clock: Arc<dyn Clock>) -> Self {
        EngineContext { db, config, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn offset(&self) -> FixedOffset {
        self.config.business_offset()
    }
}

/// Entry point bundling all engine services.
#[derive(Clone)]
pub struct WholesaleEngine {
    ctx: EngineContext,
    catalog: Arc<dyn ProductCatalog>,
    directory: Arc<dyn CompanyDirectory>,
    sender: Arc<dyn NotificationSender>,
}

impl WholesaleEngine {
    /// Creates an engine on the wall clock.
    pub fn new(
        db: Database,
        config: EngineConfig,
        catalog: Arc<dyn ProductCatalog>,
        directory: Arc<dyn CompanyDirectory>,
        sender: Arc<dyn NotificationSender>,
    ) -> Self {
        WholesaleEngine {
            ctx: EngineContext::new(Arc::new(db), Arc::new(config), Arc::new(SystemClock)),
            catalog,
            directory,
            sender,
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ctx.clock = clock;
        self
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn database(&self) -> &Database {
        &self.ctx.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    pub fn cutoff(&self) -> CutoffManager {
        CutoffManager::new(self.ctx.clone())
    }

    pub fn intake(&self) -> OrderIntake {
        OrderIntake::new(self.ctx.clone())
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.ctx.clone())
    }

    pub fn aggregation(&self) -> AggregationEngine {
        AggregationEngine::new(self.ctx.clone(), self.catalog.clone())
    }

    pub fn generator(&self) -> PurchaseOrderGenerator {
        PurchaseOrderGenerator::new(self.ctx.clone(), self.directory.clone())
    }

    pub fn dispatch(&self) -> DispatchCoordinator {
        DispatchCoordinator::new(self.ctx.clone(), self.sender.clone())
    }

    pub fn reconciliation(&self) -> ReconciliationEngine {
        ReconciliationEngine::new(self.ctx.clone(), self.catalog.clone())
    }
}
