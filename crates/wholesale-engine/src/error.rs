//! # Engine Error Types
//!
//! Error types for operator-facing engine operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Input / Rules │  │   Lookups       │  │     Store               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  NotFound       │  │  ConcurrencyConflict    │ │
//! │  │  Core (state,   │  │  Lookup         │  │  DuplicateOrder         │ │
//! │  │   transition)   │  │                 │  │  Database               │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │   Transport     │  │  Configuration  │                              │
//! │  │                 │  │                 │                              │
//! │  │  Rejected       │  │  InvalidConfig  │                              │
//! │  │  Timeout        │  │  ConfigLoad     │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store errors that carry business meaning (`NotFound`,
//! `ConcurrencyConflict`) are lifted out of [`DbError`] so callers can match
//! on them without reaching into the persistence layer.

use chrono::NaiveDate;
use thiserror::Error;
use wholesale_core::{CoreError, ValidationError};
use wholesale_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failure reported by a notification sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The provider answered and refused the message.
    #[error("Notification rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached.
    #[error("Notification provider unavailable: {0}")]
    Unavailable(String),

    /// No answer within the configured time.
    #[error("Notification timed out after {0} seconds")]
    Timeout(u64),

    /// The supplier has nobody to notify.
    #[error("Supplier has no notification recipients")]
    NoRecipients,
}

impl TransportError {
    /// Returns true if a later resend may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Unavailable(_) | TransportError::Timeout(_))
    }
}

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Input / Rule Errors
    // =========================================================================
    /// Input failed validation. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A business rule refused the operation (state, transition, empty
    /// bucket, already completed). Nothing was written.
    #[error(transparent)]
    Core(CoreError),

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// A referenced order, product or supplier does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A collaborator lookup (catalog, directory) failed outright.
    #[error("Lookup failed: {0}")]
    Lookup(String),

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// A live purchase order already covers this supplier bucket.
    #[error("Purchase order {existing} already covers supplier {supplier_id} / {category} for {cycle_date}")]
    DuplicateOrder {
        supplier_id: String,
        category: String,
        cycle_date: NaiveDate,
        existing: String,
    },

    /// Lost an optimistic-concurrency race. Retry from a fresh read.
    #[error("{entity} {id} was modified concurrently, reload and retry")]
    ConcurrencyConflict { entity: String, id: String },

    /// Any other persistence failure.
    #[error("Database error: {0}")]
    Database(DbError),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Notification delivery failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration values are out of range.
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),
}

impl EngineError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns true if this error is recoverable and the operation can be retried.
    ///
    /// ## Retryable Errors
    /// - Concurrency conflicts (after a fresh read)
    /// - Pool exhaustion and connection failures
    /// - Transient transport failures
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::ConcurrencyConflict { .. } => true,
            EngineError::Database(DbError::PoolExhausted)
            | EngineError::Database(DbError::ConnectionFailed(_)) => true,
            EngineError::Transport(t) => t.is_transient(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidConfig(_) | EngineError::ConfigLoadFailed(_)
        )
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => EngineError::Validation(v),
            other => EngineError::Core(other),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::ConcurrencyConflict { entity, id, .. } => {
                EngineError::ConcurrencyConflict { entity, id }
            }
            other => EngineError::Database(other),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}
