//! # Validation Module
//!
//! Input validation for everything an operator or the storefront can submit.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront / back-office forms                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (called by wholesale-engine services)            │
//! │  ├── Quantities, prices, line totals                                   │
//! │  └── Actor, reasons, document numbers                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK / UNIQUE constraints                                        │
//! │  └── Ledger immutability triggers                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use wholesale_core::money::Money;
//! use wholesale_core::validation::{validate_quantity, validate_purchase_price};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_purchase_price(Money::zero()).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an ordered quantity: 1 to [`MAX_ITEM_QUANTITY`].
///
/// ## Example
/// ```rust
/// use wholesale_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-3).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 || qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a received quantity. Zero is allowed (nothing arrived).
pub fn validate_received_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "received quantity".to_string(),
        });
    }
    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "received quantity".to_string(),
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a sale unit price. Free lines (zero) are allowed.
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit price".to_string(),
        });
    }
    Ok(())
}

/// Validates the actual unit price paid to a supplier. Must be strictly positive.
pub fn validate_purchase_price(price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "actual unit price".to_string(),
        });
    }
    Ok(())
}

/// Validates the number of lines on one order.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    if count > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates the actor id attached to a state-changing call.
pub fn validate_actor(actor: &str) -> ValidationResult<()> {
    let actor = actor.trim();

    if actor.is_empty() {
        return Err(ValidationError::Required {
            field: "actor".to_string(),
        });
    }
    if actor.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "actor".to_string(),
            max: 100,
        });
    }
    Ok(())
}

/// Validates a pend/reject reason.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }
    Ok(())
}

/// Validates a document number supplied by a caller (e.g. `PO-20261016-0001`).
pub fn validate_order_number(number: &str) -> ValidationResult<()> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::Required {
            field: "order number".to_string(),
        });
    }
    if number.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "order number".to_string(),
            max: 64,
        });
    }
    if !number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "order number".to_string(),
            reason: "only letters, digits, '-' and '_' are allowed".to_string(),
        });
    }
    Ok(())
}

/// Validates a document number prefix from configuration.
///
/// ## Rules
/// - 1 to 8 characters
/// - Uppercase ASCII letters only
pub fn validate_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "prefix".to_string(),
        });
    }
    if prefix.len() > 8 {
        return Err(ValidationError::TooLong {
            field: "prefix".to_string(),
            max: 8,
        });
    }
    if !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "prefix".to_string(),
            reason: "must be uppercase letters".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
