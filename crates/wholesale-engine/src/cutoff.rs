//! # Cutoff Window Manager
//!
//! Opens and closes the daily purchasing cycle.
//!
//! ## Cycle Lifecycle
//! ```text
//!   open()                 close(actor)                open()
//!     │                        │                          │
//!     ▼                        ▼                          ▼
//! ┌────────┐  regular    ┌────────┐   additional   ┌────────┐
//! │  OPEN  │───orders───►│ CLOSED │────orders─────►│  OPEN  │ (next cycle)
//! └────────┘             └────────┘                └────────┘
//! ```
//!
//! Before the very first `open()` the manager reports the fallback window:
//! closed, opened and closed at midnight of the business day.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use wholesale_core::validation::validate_actor;
use wholesale_core::{CoreError, CutoffWindow};
use wholesale_db::DbError;

use crate::engine::EngineContext;
use crate::error::EngineResult;

/// Reads the persisted window, or the documented fallback when none exists.
pub(crate) async fn window_at(ctx: &EngineContext, now: DateTime<Utc>) -> EngineResult<CutoffWindow> {
    match ctx.db.cutoff_windows().current().await? {
        Some(window) => Ok(window),
        None => {
            debug!("No cutoff window persisted, using fallback for the business day");
            Ok(CutoffWindow::fallback_for_day(now, ctx.offset()))
        }
    }
}

/// Operator service for the cutoff window.
#[derive(Clone)]
pub struct CutoffManager {
    ctx: EngineContext,
}

impl CutoffManager {
    pub fn new(ctx: EngineContext) -> Self {
        CutoffManager { ctx }
    }

    /// Starts a new cycle.
    ///
    /// ## Errors
    /// `InvalidState` if the current window is still open.
    pub async fn open(&self) -> EngineResult<CutoffWindow> {
        let now = self.ctx.now();

        let window = match self.ctx.db.cutoff_windows().current().await? {
            Some(current) => current.start_next(now)?,
            None => CutoffWindow::opened(now),
        };

        match self.ctx.db.cutoff_windows().insert_open(&window).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                warn!("Another operator opened the cycle first");
                return Err(CoreError::invalid_state(
                    "cutoff window",
                    "current",
                    "current cycle is still open",
                )
                .into());
            }
            Err(e) => return Err(e.into()),
        }

        info!(opened_at = %window.opened_at, "Cutoff window opened");
        Ok(window)
    }

    /// Closes the current cycle.
    ///
    /// ## Errors
    /// - `Validation` for an empty actor
    /// - `InvalidState` if nothing is open (never opened, or already closed)
    pub async fn close(&self, actor: &str) -> EngineResult<CutoffWindow> {
        validate_actor(actor)?;
        let now = self.ctx.now();

        let current = self.ctx.db.cutoff_windows().current().await?.ok_or_else(|| {
            CoreError::invalid_state("cutoff window", "current", "no cycle has been opened")
        })?;
        let closed = current.close(actor, now)?;

        match self.ctx.db.cutoff_windows().close_current(&closed).await {
            Ok(()) => {}
            Err(DbError::NotFound { .. }) => {
                warn!(actor, "Cutoff window was closed concurrently");
                return Err(CoreError::invalid_state(
                    "cutoff window",
                    current.opened_at.to_rfc3339(),
                    "already closed",
                )
                .into());
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            opened_at = %closed.opened_at,
            closed_at = %now,
            closed_by = actor,
            "Cutoff window closed"
        );
        Ok(closed)
    }

    /// Returns the current window, synthesizing the fallback if none exists.
    pub async fn current_window(&self) -> EngineResult<CutoffWindow> {
        window_at(&self.ctx, self.ctx.now()).await
    }

    /// Past and current windows, newest first.
    pub async fn history(&self, limit: i64) -> EngineResult<Vec<CutoffWindow>> {
        Ok(self.ctx.db.cutoff_windows().history(limit).await?)
    }
}
