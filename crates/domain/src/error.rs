//! Domain error types.

use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised by domain rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The requested order status change is not allowed from the current status.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidStateTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// An order must contain at least one item.
    #[error("Order has no items")]
    NoItems,

    /// A numeric status code outside `0..=5`.
    #[error("Invalid order status code: {0} (expected 0..=5)")]
    InvalidStatusCode(i32),

    /// A quantity that must be positive was zero or negative.
    #[error("Invalid quantity: {0} (must be greater than 0)")]
    InvalidQuantity(i32),

    /// A stored or submitted tag did not match any known variant.
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
