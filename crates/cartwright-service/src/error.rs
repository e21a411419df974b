//! # Service Error Type
//!
//! The one error type callers of this crate see.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError ──────────────────────► ServiceError { code, message }      │
//! │    ProductNotFound / CartLine…       NOT_FOUND                          │
//! │    OutOfStock                        OUT_OF_STOCK                       │
//! │    InsufficientStock                 INSUFFICIENT_STOCK                 │
//! │    EmptyCart                         EMPTY_CART                         │
//! │    Forbidden                         FORBIDDEN                          │
//! │    Validation                        VALIDATION_ERROR                   │
//! │                                                                         │
//! │  DbError ────── logged in full ──► STORAGE_FAILURE (generic message)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Serialized form:
//! ```json
//! { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for p-1: available 0, requested 1" }
//! ```

use serde::Serialize;
use tracing::error;

use cartwright_core::{CoreError, ValidationError};
use cartwright_db::DbError;

/// Error returned by every service operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for service responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing product, cart line or order (404)
    NotFound,

    /// Cart mutation exceeds available stock (409)
    OutOfStock,

    /// Checkout re-validation failed; nothing was written (409)
    InsufficientStock,

    /// Checkout or preview on a cart with no lines (422)
    EmptyCart,

    /// Resource belongs to another user (403)
    Forbidden,

    /// Input validation failed (400)
    ValidationError,

    /// Unexpected storage failure (500)
    StorageFailure,
}

impl ServiceError {
    /// Creates a new service error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    /// Creates an opaque storage failure. `detail` goes to the log only.
    pub fn storage(detail: impl std::fmt::Display) -> Self {
        error!(detail = %detail, "Storage failure");
        ServiceError::new(ErrorCode::StorageFailure, "Storage operation failed")
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_)
            | CoreError::CartLineNotFound(_)
            | CoreError::OrderNotFound(_) => ErrorCode::NotFound,
            CoreError::OutOfStock { .. } => ErrorCode::OutOfStock,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::EmptyCart => ErrorCode::EmptyCart,
            CoreError::Forbidden { .. } => ErrorCode::Forbidden,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ServiceError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        CoreError::from(err).into()
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ServiceError::new(ErrorCode::NotFound, format!("{entity} not found: {id}"))
            }
            DbError::TransactionFailed(e) => {
                error!(error = %e, "Transaction failed");
                ServiceError::new(ErrorCode::StorageFailure, "Storage transaction failed")
            }
            DbError::PoolExhausted => {
                error!("Database pool exhausted");
                ServiceError::new(ErrorCode::StorageFailure, "Storage temporarily unavailable")
            }
            other => ServiceError::storage(other),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::storage(format!("payload serialization: {err}"))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error for a cart line or order owned by someone else.
///
/// Concealed as not-found unless the deployment opts into `Forbidden`.
pub(crate) fn foreign_resource(conceal: bool, resource: &str, id: &str) -> CoreError {
    if !conceal {
        return CoreError::forbidden(resource, id);
    }
    match resource {
        "Order" => CoreError::OrderNotFound(id.to_string()),
        _ => CoreError::CartLineNotFound(id.to_string()),
    }
}
