//! Integration tests for the order status machine.
//!
//! These walk whole orders through placement, admin status changes and the
//! two cancellation paths.

use chrono::{Duration, Utc};
use domain::{
    BookId, CancelledBy, DomainError, Money, Order, OrderLine, OrderStatus, ShippingInfo, UserId,
};

fn shipping() -> ShippingInfo {
    ShippingInfo {
        address: "12 Harbour Lane".to_string(),
        phone: "555-0100".to_string(),
        note: None,
    }
}

fn placed_order() -> Order {
    let lines = [
        OrderLine {
            book_id: BookId::new(),
            quantity: 2,
            unit_price: Money::from_cents(1899),
        },
        OrderLine {
            book_id: BookId::new(),
            quantity: 1,
            unit_price: Money::from_cents(999),
        },
    ];
    let (order, _) = Order::place(UserId::new(), shipping(), &lines, Utc::now()).unwrap();
    order
}

mod order_lifecycle {
    use super::*;

    #[test]
    fn placed_to_delivered() {
        let mut order = placed_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Money::from_cents(4797));

        let shipped_at = Utc::now();
        for target in [
            OrderStatus::Processing,
            OrderStatus::Packed,
            OrderStatus::Shipped,
        ] {
            assert!(order.transition_to(target, shipped_at).unwrap());
        }
        assert_eq!(order.shipped_date, Some(shipped_at));

        let delivered_at = shipped_at + Duration::days(2);
        assert!(
            order
                .transition_to(OrderStatus::Delivered, delivered_at)
                .unwrap()
        );
        assert_eq!(order.delivered_date, Some(delivered_at));
        assert!(order.is_terminal());
    }

    #[test]
    fn admin_may_move_backwards_without_restamping() {
        let mut order = placed_order();
        let first = Utc::now();
        order.transition_to(OrderStatus::Shipped, first).unwrap();
        order.transition_to(OrderStatus::Packed, first).unwrap();

        let later = first + Duration::hours(3);
        order.transition_to(OrderStatus::Shipped, later).unwrap();

        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.shipped_date, Some(first));
    }

    #[test]
    fn same_status_is_a_no_op() {
        let mut order = placed_order();
        assert!(!order.transition_to(OrderStatus::Pending, Utc::now()).unwrap());
    }

    #[test]
    fn nothing_leaves_a_terminal_status() {
        let mut order = placed_order();
        order
            .transition_to(OrderStatus::Delivered, Utc::now())
            .unwrap();

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
}

mod cancellation {
    use super::*;

    #[test]
    fn customer_window_closes_once_packed() {
        let mut order = placed_order();
        assert!(order.check_cancellable(CancelledBy::Customer).unwrap());

        order
            .transition_to(OrderStatus::Processing, Utc::now())
            .unwrap();
        assert!(order.check_cancellable(CancelledBy::Customer).unwrap());

        order.transition_to(OrderStatus::Packed, Utc::now()).unwrap();
        assert!(order.cancel(CancelledBy::Customer).is_err());
        assert_eq!(order.status, OrderStatus::Packed);
    }

    #[test]
    fn admin_can_cancel_shipped_but_not_delivered() {
        let mut shipped = placed_order();
        shipped
            .transition_to(OrderStatus::Shipped, Utc::now())
            .unwrap();
        assert!(shipped.cancel(CancelledBy::Admin).unwrap());
        assert_eq!(shipped.status, OrderStatus::Cancelled);

        let mut delivered = placed_order();
        delivered
            .transition_to(OrderStatus::Delivered, Utc::now())
            .unwrap();
        assert!(delivered.cancel(CancelledBy::Admin).is_err());
    }

    #[test]
    fn repeated_admin_cancel_reports_no_change() {
        let mut order = placed_order();
        assert!(order.cancel(CancelledBy::Admin).unwrap());
        assert!(!order.cancel(CancelledBy::Admin).unwrap());
        assert!(order.cancel(CancelledBy::Customer).is_err());
    }

    #[test]
    fn system_cancel_follows_admin_window() {
        let mut order = placed_order();
        assert!(order.cancel(CancelledBy::System).unwrap());
        assert_eq!(order.status, OrderStatus::Cancelled);
    }
}

#[test]
fn placing_without_lines_fails() {
    let err = Order::place(UserId::new(), shipping(), &[], Utc::now()).unwrap_err();
    assert_eq!(err, DomainError::NoItems);
}
