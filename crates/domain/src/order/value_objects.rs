//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::{BookId, OrderId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// Human-readable, unique order number, e.g. `ORD-20261016-9F3A07C1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh order number for an order placed at `at`.
    pub fn generate(at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        Self(format!("ORD-{}-{suffix}", at.format("%Y%m%d")))
    }

    /// Wraps an existing order number, e.g. one loaded from storage.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where and how to deliver an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub address: String,
    pub phone: String,
    pub note: Option<String>,
}

/// A line of an order.
///
/// Immutable once created. `price_at_order` is the book's price when the
/// order was placed and never follows later catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub book_id: BookId,
    pub quantity: u32,
    pub price_at_order: Money,
}

impl OrderItem {
    pub fn new(order_id: OrderId, book_id: BookId, quantity: u32, price_at_order: Money) -> Self {
        Self {
            order_id,
            book_id,
            quantity,
            price_at_order,
        }
    }

    /// Returns the total price for this line (`quantity * price_at_order`).
    pub fn line_total(&self) -> Money {
        self.price_at_order.times(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_order_number_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let number = OrderNumber::generate(at);
        let s = number.as_str();
        assert!(s.starts_with("ORD-20261016-"));
        assert_eq!(s.len(), "ORD-20261016-".len() + 8);
    }

    #[test]
    fn test_order_numbers_are_unique() {
        let at = Utc::now();
        assert_ne!(OrderNumber::generate(at), OrderNumber::generate(at));
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem::new(OrderId::new(), BookId::new(), 3, Money::from_cents(1000));
        assert_eq!(item.line_total().cents(), 3000);
    }
}
