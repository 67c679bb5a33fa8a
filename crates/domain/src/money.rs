//! Prices and order totals in integer cents.

use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// A point-in-time price or total, in cents.
///
/// Serialized as the bare cent count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Price of `quantity` units at this unit price.
    pub fn times(self, quantity: u32) -> Money {
        Money(self.0 * i64::from(quantity))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_as_dollars() {
        assert_eq!(Money::from_cents(1899).to_string(), "$18.99");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-$2.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_line_total() {
        assert_eq!(Money::from_cents(1899).times(3), Money::from_cents(5697));
        assert!(Money::from_cents(1899).times(0).is_zero());
    }

    #[test]
    fn test_order_total_is_sum_of_lines() {
        let total: Money = [(1899, 2), (999, 1)]
            .into_iter()
            .map(|(cents, qty)| Money::from_cents(cents).times(qty))
            .sum();
        assert_eq!(total.cents(), 4797);

        let empty: Money = std::iter::empty().sum();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(999)).unwrap();
        assert_eq!(json, "999");
        let back: Money = serde_json::from_str("999").unwrap();
        assert_eq!(back, Money::from_cents(999));
    }
}
