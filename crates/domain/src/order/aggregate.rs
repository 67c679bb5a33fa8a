//! Order aggregate.

use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::payment::Payment;

use super::{OrderItem, OrderNumber, OrderStatus, ShippingInfo};

/// A requested line at order placement: which book, how many, at what price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub book_id: BookId,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Who cancelled an order. Customers and admins have different windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelledBy {
    Customer,
    Admin,
    /// Checkout itself, after a declined payment. Same window as `Admin`.
    System,
}

/// Order aggregate root.
///
/// Created once at checkout and never deleted. After creation only the
/// status and the shipped/delivered dates change, always through the
/// transition methods below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    /// Sum of `price_at_order * quantity` over the items, fixed at placement.
    pub total_amount: Money,
    pub shipping: ShippingInfo,
    pub order_date: DateTime<Utc>,
    pub shipped_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
}

impl Order {
    /// Places a new `Pending` order and builds its items.
    ///
    /// The total is computed here, once, from the price snapshots.
    pub fn place(
        user_id: UserId,
        shipping: ShippingInfo,
        lines: &[OrderLine],
        at: DateTime<Utc>,
    ) -> Result<(Order, Vec<OrderItem>), DomainError> {
        if lines.is_empty() {
            return Err(DomainError::NoItems);
        }

        let id = OrderId::new();
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity == 0 {
                return Err(DomainError::InvalidQuantity(0));
            }
            items.push(OrderItem::new(
                id,
                line.book_id,
                line.quantity,
                line.unit_price,
            ));
        }

        let order = Order {
            id,
            user_id,
            order_number: OrderNumber::generate(at),
            status: OrderStatus::Pending,
            total_amount: items.iter().map(OrderItem::line_total).sum(),
            shipping,
            order_date: at,
            shipped_date: None,
            delivered_date: None,
        };

        Ok((order, items))
    }

    /// Moves the order to `target`.
    ///
    /// Returns `Ok(false)` when the order already has that status. Leaving a
    /// terminal status is rejected. Any other move is accepted; entering
    /// `Shipped` or `Delivered` stamps the matching date the first time only.
    ///
    /// Cancellation must go through [`Order::cancel`] so that the caller
    /// restores stock alongside the status write.
    pub fn transition_to(
        &mut self,
        target: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                current: self.status,
                action: "change status",
            });
        }
        if target == self.status {
            return Ok(false);
        }

        self.status = target;
        match target {
            OrderStatus::Shipped if self.shipped_date.is_none() => self.shipped_date = Some(at),
            OrderStatus::Delivered if self.delivered_date.is_none() => {
                self.delivered_date = Some(at)
            }
            _ => {}
        }
        Ok(true)
    }

    /// Checks whether `by` may cancel the order in its current status.
    ///
    /// Returns `Ok(false)` for an admin cancelling an already cancelled order.
    pub fn check_cancellable(&self, by: CancelledBy) -> Result<bool, DomainError> {
        let allowed = match by {
            CancelledBy::Customer => self.status.can_customer_cancel(),
            CancelledBy::Admin | CancelledBy::System => self.status.can_admin_cancel(),
        };
        if !allowed {
            return Err(DomainError::InvalidStateTransition {
                current: self.status,
                action: "cancel",
            });
        }
        Ok(self.status != OrderStatus::Cancelled)
    }

    /// Marks the order cancelled after [`Order::check_cancellable`] passed.
    pub fn cancel(&mut self, by: CancelledBy) -> Result<bool, DomainError> {
        if !self.check_cancellable(by)? {
            return Ok(false);
        }
        self.status = OrderStatus::Cancelled;
        Ok(true)
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// An order with everything it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
}

impl OrderDetails {
    /// Recomputes the item sum; always equal to `order.total_amount`.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            address: "1 Library Lane".to_string(),
            phone: "555-0100".to_string(),
            note: None,
        }
    }

    fn placed_order() -> Order {
        let lines = vec![
            OrderLine {
                book_id: BookId::new(),
                quantity: 2,
                unit_price: Money::from_cents(1000),
            },
            OrderLine {
                book_id: BookId::new(),
                quantity: 1,
                unit_price: Money::from_cents(2500),
            },
        ];
        Order::place(UserId::new(), shipping(), &lines, Utc::now())
            .unwrap()
            .0
    }

    #[test]
    fn test_place_computes_total_from_snapshots() {
        let book = BookId::new();
        let lines = vec![OrderLine {
            book_id: book,
            quantity: 3,
            unit_price: Money::from_cents(1250),
        }];
        let (order, items) = Order::place(UserId::new(), shipping(), &lines, Utc::now()).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount.cents(), 3750);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].order_id, order.id);
        assert_eq!(items[0].book_id, book);
        assert!(order.shipped_date.is_none());
        assert!(order.delivered_date.is_none());
    }

    #[test]
    fn test_place_rejects_empty_and_zero_quantity() {
        let err = Order::place(UserId::new(), shipping(), &[], Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::NoItems);

        let lines = vec![OrderLine {
            book_id: BookId::new(),
            quantity: 0,
            unit_price: Money::from_cents(100),
        }];
        let err = Order::place(UserId::new(), shipping(), &lines, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::InvalidQuantity(0));
    }

    #[test]
    fn test_shipped_date_set_once() {
        let mut order = placed_order();
        let first = Utc::now();
        assert!(order.transition_to(OrderStatus::Shipped, first).unwrap());
        assert_eq!(order.shipped_date, Some(first));

        order
            .transition_to(OrderStatus::Packed, Utc::now())
            .unwrap();
        order
            .transition_to(OrderStatus::Shipped, first + chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(order.shipped_date, Some(first));
    }

    #[test]
    fn test_delivered_date_set_and_terminal() {
        let mut order = placed_order();
        let at = Utc::now();
        order.transition_to(OrderStatus::Delivered, at).unwrap();
        assert_eq!(order.delivered_date, Some(at));
        assert!(order.is_terminal());

        let err = order
            .transition_to(OrderStatus::Processing, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidStateTransition {
                current: OrderStatus::Delivered,
                ..
            }
        ));
    }

    #[test]
    fn test_same_status_is_noop() {
        let mut order = placed_order();
        assert!(!order.transition_to(OrderStatus::Pending, Utc::now()).unwrap());
    }

    #[test]
    fn test_pending_to_shipped_directly_is_permitted() {
        let mut order = placed_order();
        assert!(order.transition_to(OrderStatus::Shipped, Utc::now()).unwrap());
        assert!(order.shipped_date.is_some());
    }

    #[test]
    fn test_customer_cancel_window() {
        let mut order = placed_order();
        assert!(order.cancel(CancelledBy::Customer).unwrap());
        assert_eq!(order.status, OrderStatus::Cancelled);

        let mut packed = placed_order();
        packed.transition_to(OrderStatus::Packed, Utc::now()).unwrap();
        assert!(packed.cancel(CancelledBy::Customer).is_err());
        assert_eq!(packed.status, OrderStatus::Packed);
    }

    #[test]
    fn test_customer_cannot_cancel_twice() {
        let mut order = placed_order();
        order.cancel(CancelledBy::Customer).unwrap();
        assert!(order.cancel(CancelledBy::Customer).is_err());
    }

    #[test]
    fn test_admin_cancel_window() {
        let mut shipped = placed_order();
        shipped
            .transition_to(OrderStatus::Shipped, Utc::now())
            .unwrap();
        assert!(shipped.cancel(CancelledBy::Admin).unwrap());

        // Repeated admin cancel is a no-op.
        assert!(!shipped.cancel(CancelledBy::Admin).unwrap());

        let mut delivered = placed_order();
        delivered
            .transition_to(OrderStatus::Delivered, Utc::now())
            .unwrap();
        assert!(delivered.cancel(CancelledBy::Admin).is_err());
        assert_eq!(delivered.status, OrderStatus::Delivered);
    }
}
