//! # Cutoff Window
//!
//! The time range during which a daily purchasing cycle accepts regular
//! orders, and the classifier that stamps each sale order with its phase.
//!
//! ## Timeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ──────────┬──────────────────────────┬──────────────────────────►    │
//! │             │                          │                      time      │
//! │          opened_at                 closed_at                            │
//! │                                                                         │
//! │   ◄── none ─►◄──────── regular ────────►◄────── additional ──────►      │
//! │                                                                         │
//! │   While the window is open there is no closed_at: everything at or     │
//! │   after opened_at is regular.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Construction
//! There is no implicit window. A cycle starts with [`CutoffWindow::opened`];
//! a store that has never seen a cycle uses [`CutoffWindow::fallback_for_day`],
//! a closed window collapsed to the start of the current business day, so
//! every order placed that day is classified `additional`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{ActorId, OrderPhase};
use crate::validation::validate_actor;

// =============================================================================
// Cutoff Status
// =============================================================================

/// Whether the cycle is still accepting regular orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CutoffStatus {
    Open,
    Closed,
}

impl CutoffStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CutoffStatus::Open => "open",
            CutoffStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for CutoffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Cutoff Window
// =============================================================================

/// One purchasing cycle's cutoff state.
///
/// ## Invariants
/// - `closed_at` is `None` iff `status == Open`
/// - once closed, `closed_at >= opened_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CutoffWindow {
    pub status: CutoffStatus,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<ActorId>,
}

impl CutoffWindow {
    /// Starts a new cycle at `at`.
    pub fn opened(at: DateTime<Utc>) -> Self {
        CutoffWindow {
            status: CutoffStatus::Open,
            opened_at: at,
            closed_at: None,
            closed_by: None,
        }
    }

    /// The window assumed when no cycle has ever been persisted.
    ///
    /// Closed, with `opened_at == closed_at ==` midnight of `now`'s calendar
    /// day in the business timezone.
    pub fn fallback_for_day(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let midnight = start_of_day(now, offset);
        CutoffWindow {
            status: CutoffStatus::Closed,
            opened_at: midnight,
            closed_at: Some(midnight),
            closed_by: None,
        }
    }

    /// Rebuilds a window from stored columns, checking the invariants.
    pub fn from_parts(
        status: CutoffStatus,
        opened_at: DateTime<Utc>,
        closed_at: Option<DateTime<Utc>>,
        closed_by: Option<ActorId>,
    ) -> CoreResult<Self> {
        match (status, closed_at) {
            (CutoffStatus::Open, None) => {}
            (CutoffStatus::Closed, Some(closed)) if closed >= opened_at => {}
            (CutoffStatus::Open, Some(_)) => {
                return Err(CoreError::invalid_state(
                    "cutoff window",
                    opened_at.to_rfc3339(),
                    "open window has a closed_at",
                ))
            }
            (CutoffStatus::Closed, _) => {
                return Err(CoreError::invalid_state(
                    "cutoff window",
                    opened_at.to_rfc3339(),
                    "closed window needs closed_at >= opened_at",
                ))
            }
        }

        Ok(CutoffWindow {
            status,
            opened_at,
            closed_at,
            closed_by,
        })
    }

    /// Returns true while regular orders are accepted.
    pub fn is_open(&self) -> bool {
        self.status == CutoffStatus::Open
    }

    /// Returns the closed version of this window.
    pub fn close(&self, actor: &str, at: DateTime<Utc>) -> CoreResult<Self> {
        validate_actor(actor)?;

        if !self.is_open() {
            return Err(CoreError::invalid_state(
                "cutoff window",
                self.opened_at.to_rfc3339(),
                "already closed",
            ));
        }
        if at < self.opened_at {
            return Err(CoreError::invalid_state(
                "cutoff window",
                self.opened_at.to_rfc3339(),
                format!("cannot close at {} before it opened", at.to_rfc3339()),
            ));
        }

        Ok(CutoffWindow {
            status: CutoffStatus::Closed,
            opened_at: self.opened_at,
            closed_at: Some(at),
            closed_by: Some(actor.trim().to_string()),
        })
    }

    /// Starts the next cycle. The current one must be closed.
    pub fn start_next(&self, at: DateTime<Utc>) -> CoreResult<Self> {
        if self.is_open() {
            return Err(CoreError::invalid_state(
                "cutoff window",
                self.opened_at.to_rfc3339(),
                "current cycle is still open",
            ));
        }
        Ok(CutoffWindow::opened(at))
    }

    /// Classifies an order submitted at `submitted_at` against this window.
    pub fn classify(&self, submitted_at: DateTime<Utc>) -> OrderPhase {
        classify(submitted_at, self)
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Assigns the phase of a sale order submitted at `submitted_at`.
///
/// ## Rules
/// - `regular` when at or after `opened_at`, and the window is open or the
///   order came in before `closed_at`
/// - `additional` when at or after `closed_at`
/// - `none` otherwise (before the window opened)
pub fn classify(submitted_at: DateTime<Utc>, window: &CutoffWindow) -> OrderPhase {
    if submitted_at >= window.opened_at {
        match window.closed_at {
            None => return OrderPhase::Regular,
            Some(closed) if submitted_at < closed => return OrderPhase::Regular,
            Some(_) => {}
        }
    }

    match window.closed_at {
        Some(closed) if submitted_at >= closed => OrderPhase::Additional,
        _ => OrderPhase::Unclassified,
    }
}

// =============================================================================
// Business Calendar
// =============================================================================

/// Midnight of `now`'s calendar day in the business timezone, as UTC.
pub fn start_of_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = cycle_date(now, offset).and_time(NaiveTime::MIN);
    local_midnight.and_utc() - TimeDelta::seconds(i64::from(offset.local_minus_utc()))
}

/// The business calendar date of an instant.
pub fn cycle_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

// =============================================================================
// Unit Tests
// =============================================================================
