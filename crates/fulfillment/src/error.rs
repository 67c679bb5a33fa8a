//! Fulfillment error types.

use domain::{DomainError, OrderId, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Errors returned by checkout, cancellation and stock operations.
///
/// A declined payment is not an error: it is recorded on the payment and
/// ends with a cancelled order.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// A book or order does not exist (or is not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request itself is malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Not enough stock to take the requested quantity.
    #[error("Insufficient stock for '{title}': {available} available, {requested} requested")]
    InsufficientStock {
        title: String,
        available: u32,
        requested: u32,
    },

    /// The order's status does not allow the requested change.
    #[error("Cannot {action} an order in {current} status")]
    InvalidStateTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// Restoring stock failed; the order needs manual reconciliation.
    #[error("Compensation failed for order {order_id}: {reason}")]
    CompensationFailed { order_id: OrderId, reason: String },

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        FulfillmentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true for errors caused by the caller's request.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            FulfillmentError::CompensationFailed { .. } | FulfillmentError::Store(_)
        )
    }
}

impl From<DomainError> for FulfillmentError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidStateTransition { current, action } => {
                FulfillmentError::InvalidStateTransition { current, action }
            }
            other => FulfillmentError::Validation(other.to_string()),
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
