//! # Error Types
//!
//! Domain-specific error types for cartwright-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cartwright-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cartwright-db errors (separate crate)                                 │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  cartwright-service errors                                             │
//! │  └── ServiceError     - What callers see (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                            DbError ─┴─► ServiceError → Caller          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Product does not exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Cart line does not exist (or is not visible to the caller).
    #[error("Cart line not found: {0}")]
    CartLineNotFound(String),

    /// Order does not exist (or is not visible to the caller).
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// A cart mutation asked for more units than the catalog has.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 2, already in cart: 4)
    ///      │
    ///      ▼
    /// Check stock: available=5
    ///      │
    ///      ▼
    /// OutOfStock { available: 5, requested: 6 }
    ///      │
    ///      ▼
    /// Existing line keeps quantity 4
    /// ```
    #[error("Out of stock for {product_id}: available {available}, requested {requested}")]
    OutOfStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Checkout re-validation found a line the catalog can no longer cover.
    /// The whole order is voided.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Checkout or preview attempted on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Caller does not own the referenced resource.
    #[error("{resource} {id} belongs to another user")]
    Forbidden { resource: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a Forbidden error for a resource kind and ID.
    pub fn forbidden(resource: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::Forbidden {
            resource: resource.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage access, so they never have side effects.
#[derive(Debug, Error, PartialEq, Eq)]
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

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
