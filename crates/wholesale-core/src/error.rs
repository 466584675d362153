//! # Error Types
//!
//! Domain-specific error types for wholesale-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  wholesale-core errors (this file)                                     │
//! │  ├── CoreError        - State, transition and aggregation rules        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  wholesale-db errors (separate crate)                                  │
//! │  └── DbError          - Store failures, version conflicts              │
//! │                                                                         │
//! │  wholesale-engine errors                                               │
//! │  └── EngineError      - What operator actions see                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is raised BEFORE anything is written, so a caller that
//! receives one knows no entity was mutated.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The entity is in a state that forbids the requested operation.
    ///
    /// ## When This Occurs
    /// - Closing a cutoff window that is already closed
    /// - Opening a new cycle while the current one is still open
    /// - Reconciling a purchase order that was never confirmed
    #[error("{entity} {id} is in an invalid state: {reason}")]
    InvalidState {
        entity: String,
        id: String,
        reason: String,
    },

    /// The status transition is not in the lifecycle table.
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// A purchase order was requested for a supplier bucket with no demand.
    #[error("Supplier {supplier_id} in category '{category}' has no quantity to order")]
    EmptyAggregation {
        supplier_id: String,
        category: String,
    },

    /// The purchase order was already closed out by a ledger entry.
    ///
    /// ## User Workflow
    /// ```text
    /// Receive goods for PO-20261016-0001
    ///      │
    ///      ▼
    /// reconcile() ──► ledger PL-20261016-0001, PO completed
    ///      │
    ///      ▼
    /// reconcile() again (double entry at the dock)
    ///      │
    ///      ▼
    /// AlreadyCompleted { order_number: "PO-20261016-0001" }
    /// ```
    #[error("Purchase order {order_number} is already completed")]
    AlreadyCompleted { order_number: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., bad prefix, bad characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A stored line total does not equal unit price × quantity.
    #[error("Line total for {product_id} is {actual}, expected {expected}")]
    LineTotalMismatch {
        product_id: String,
        expected: i64,
        actual: i64,
    },

    /// A document-level amount does not equal the sum of its lines.
    #[error("{field} is {actual}, expected {expected}")]
    AmountMismatch {
        field: String,
        expected: i64,
        actual: i64,
    },

    /// Multiplication or summation left the i64 range.
    #[error("{field} overflows")]
    Overflow { field: String },

    /// Duplicate value (e.g., the same product received twice).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidTransition {
            entity: "sale order".to_string(),
            from: "rejected".to_string(),
            to: "confirmed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid sale order transition: rejected -> confirmed"
        );

        let err = CoreError::AlreadyCompleted {
            order_number: "PO-20261016-0001".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Purchase order PO-20261016-0001 is already completed"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "actual unit price".to_string(),
        };
        assert_eq!(err.to_string(), "actual unit price must be positive");

        let err = ValidationError::LineTotalMismatch {
            product_id: "P-1".to_string(),
            expected: 5000,
            actual: 4999,
        };
        assert_eq!(err.to_string(), "Line total for P-1 is 4999, expected 5000");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "actor".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
