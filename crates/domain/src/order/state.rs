//! Order status machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of an order in its lifecycle.
///
/// ```text
/// Pending ──► Processing ──► Packed ──► Shipped ──► Delivered
///    │             │            │          │
///    └─────────────┴────────────┴──────────┴──► Cancelled
/// ```
///
/// The arrows show the usual progression. Admins may jump between any two
/// non-terminal statuses; `Delivered` and `Cancelled` have no way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Stock reserved, payment not yet settled.
    #[default]
    Pending,

    /// Payment completed.
    Processing,

    Packed,

    Shipped,

    /// Received by the customer (terminal state).
    Delivered,

    /// Cancelled and stock restored (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// All statuses in code order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Packed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Parses the numeric wire code (`0..=5`).
    pub fn from_code(code: i32) -> Result<Self, DomainError> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(DomainError::InvalidStatusCode(code))
    }

    /// Returns the numeric wire code.
    pub fn code(&self) -> i32 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Processing => 1,
            OrderStatus::Packed => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::Delivered => 4,
            OrderStatus::Cancelled => 5,
        }
    }

    /// Returns true if the customer may cancel the order in this status.
    pub fn can_customer_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Returns true if an admin may cancel the order in this status.
    ///
    /// `Cancelled` counts as cancellable so that a repeated admin cancel is a
    /// no-op rather than an error.
    pub fn can_admin_cancel(&self) -> bool {
        !matches!(self, OrderStatus::Delivered)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Packed => "Packed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::UnknownVariant {
                kind: "order status",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_codes_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_code(status.code()).unwrap(), status);
        }
    }

    #[test]
    fn test_out_of_range_codes_rejected() {
        assert_eq!(
            OrderStatus::from_code(6),
            Err(DomainError::InvalidStatusCode(6))
        );
        assert_eq!(
            OrderStatus::from_code(-1),
            Err(DomainError::InvalidStatusCode(-1))
        );
    }

    #[test]
    fn test_customer_cancel_only_before_packing() {
        assert!(OrderStatus::Pending.can_customer_cancel());
        assert!(OrderStatus::Processing.can_customer_cancel());
        assert!(!OrderStatus::Packed.can_customer_cancel());
        assert!(!OrderStatus::Shipped.can_customer_cancel());
        assert!(!OrderStatus::Delivered.can_customer_cancel());
        assert!(!OrderStatus::Cancelled.can_customer_cancel());
    }

    #[test]
    fn test_admin_cancel_everywhere_but_delivered() {
        assert!(OrderStatus::Pending.can_admin_cancel());
        assert!(OrderStatus::Processing.can_admin_cancel());
        assert!(OrderStatus::Packed.can_admin_cancel());
        assert!(OrderStatus::Shipped.can_admin_cancel());
        assert!(!OrderStatus::Delivered.can_admin_cancel());
        assert!(OrderStatus::Cancelled.can_admin_cancel());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(!OrderStatus::Packed.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_display_and_parse() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("Lost".parse::<OrderStatus>().is_err());
    }
}
