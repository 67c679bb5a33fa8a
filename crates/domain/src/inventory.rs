//! Inventory ledger entries.

use chrono::{DateTime, Utc};
use common::{BookId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Why a book's stock changed.
///
/// Order-driven reasons are produced by checkout and compensation; the
/// manual ones come from staff adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockReason {
    OrderPlaced,
    OrderCancelledByCustomer,
    OrderCancelledByAdmin,
    PaymentFailedRestore,
    ManualRestock,
    ManualCorrection,
    Damaged,
    CustomerReturn,
}

impl StockReason {
    pub const ALL: [StockReason; 8] = [
        StockReason::OrderPlaced,
        StockReason::OrderCancelledByCustomer,
        StockReason::OrderCancelledByAdmin,
        StockReason::PaymentFailedRestore,
        StockReason::ManualRestock,
        StockReason::ManualCorrection,
        StockReason::Damaged,
        StockReason::CustomerReturn,
    ];

    /// Audit text written next to the tag.
    pub fn description(&self) -> &'static str {
        match self {
            StockReason::OrderPlaced => "Order placed",
            StockReason::OrderCancelledByCustomer => "Order cancelled by customer",
            StockReason::OrderCancelledByAdmin => "Order cancelled by admin",
            StockReason::PaymentFailedRestore => "Payment failed - stock restored",
            StockReason::ManualRestock => "Manual restock",
            StockReason::ManualCorrection => "Manual correction",
            StockReason::Damaged => "Damaged stock written off",
            StockReason::CustomerReturn => "Customer return",
        }
    }

    /// Returns true if staff may record this reason by hand.
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            StockReason::ManualRestock
                | StockReason::ManualCorrection
                | StockReason::Damaged
                | StockReason::CustomerReturn
        )
    }

    /// Stable tag used for storage and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            StockReason::OrderPlaced => "OrderPlaced",
            StockReason::OrderCancelledByCustomer => "OrderCancelledByCustomer",
            StockReason::OrderCancelledByAdmin => "OrderCancelledByAdmin",
            StockReason::PaymentFailedRestore => "PaymentFailedRestore",
            StockReason::ManualRestock => "ManualRestock",
            StockReason::ManualCorrection => "ManualCorrection",
            StockReason::Damaged => "Damaged",
            StockReason::CustomerReturn => "CustomerReturn",
        }
    }
}

impl std::fmt::Display for StockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::str::FromStr for StockReason {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| DomainError::UnknownVariant {
                kind: "stock reason",
                value: s.to_string(),
            })
    }
}

/// A ledger entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub book_id: BookId,
    pub user_id: UserId,
    pub quantity_change: i32,
    pub quantity_after_change: u32,
    pub reason: StockReason,
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// One appended stock delta. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLogEntry {
    /// Monotonic sequence assigned on append.
    pub id: i64,
    pub book_id: BookId,
    /// Actor responsible for the change.
    pub user_id: UserId,
    pub quantity_change: i32,
    pub quantity_after_change: u32,
    pub reason: StockReason,
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl InventoryLogEntry {
    pub fn from_new(id: i64, entry: NewLogEntry) -> Self {
        Self {
            id,
            book_id: entry.book_id,
            user_id: entry.user_id,
            quantity_change: entry.quantity_change,
            quantity_after_change: entry.quantity_after_change,
            reason: entry.reason,
            notes: entry.notes,
            logged_at: entry.logged_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions_match_audit_text() {
        assert_eq!(StockReason::OrderPlaced.description(), "Order placed");
        assert_eq!(
            StockReason::PaymentFailedRestore.description(),
            "Payment failed - stock restored"
        );
        assert_eq!(
            StockReason::OrderCancelledByCustomer.description(),
            "Order cancelled by customer"
        );
    }

    #[test]
    fn test_manual_reasons() {
        let manual: Vec<_> = StockReason::ALL
            .into_iter()
            .filter(StockReason::is_manual)
            .collect();
        assert_eq!(
            manual,
            vec![
                StockReason::ManualRestock,
                StockReason::ManualCorrection,
                StockReason::Damaged,
                StockReason::CustomerReturn,
            ]
        );
    }

    #[test]
    fn test_tag_roundtrip() {
        for reason in StockReason::ALL {
            assert_eq!(reason.as_str().parse::<StockReason>().unwrap(), reason);
        }
        assert!("Order placed".parse::<StockReason>().is_err());
    }
}
