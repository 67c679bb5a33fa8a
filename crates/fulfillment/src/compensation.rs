//! Compensating stock restoration for failed or cancelled orders.

use domain::{OrderId, OrderStatus, StockReason, UserId};
use store::UnitOfWork;

use crate::error::{FulfillmentError, Result};
use crate::stock::{StockChange, StockMutator};

/// What a call to [`CompensationEngine::restore`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restoration {
    /// Stock for every item was credited back.
    Restored { units: u32 },

    /// The order is already cancelled, so its stock was restored before.
    AlreadyRestored,
}

/// Reverses an order's stock decrements.
pub struct CompensationEngine;

impl CompensationEngine {
    /// Credits back every item of `order_id` through the [`StockMutator`].
    ///
    /// The order row is locked first and a `Cancelled` order is left alone,
    /// so calling this twice never credits stock twice. The caller writes
    /// the `Cancelled` status in the same unit of work.
    ///
    /// Any failure while crediting stock is reported as
    /// [`FulfillmentError::CompensationFailed`] and must not be committed.
    #[tracing::instrument(skip(uow), fields(reason = reason.as_str()))]
    pub async fn restore<U: UnitOfWork>(
        uow: &mut U,
        order_id: OrderId,
        actor: UserId,
        reason: StockReason,
    ) -> Result<Restoration> {
        let order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("order", order_id))?;

        if order.status == OrderStatus::Cancelled {
            tracing::info!(%order_id, "order already cancelled, nothing to restore");
            return Ok(Restoration::AlreadyRestored);
        }

        match Self::credit_items(uow, &order.order_number.to_string(), order_id, actor, reason)
            .await
        {
            Ok(units) => {
                metrics::counter!("compensations_total", "reason" => reason.as_str()).increment(1);
                tracing::info!(%order_id, units, "stock restored");
                Ok(Restoration::Restored { units })
            }
            Err(err) => {
                metrics::counter!("compensation_failures_total").increment(1);
                tracing::error!(
                    target: "reconciliation",
                    %order_id,
                    order_number = %order.order_number,
                    reason = reason.as_str(),
                    error = %err,
                    "stock restoration failed; order needs manual reconciliation"
                );
                Err(FulfillmentError::CompensationFailed {
                    order_id,
                    reason: err.to_string(),
                })
            }
        }
    }

    async fn credit_items<U: UnitOfWork>(
        uow: &mut U,
        order_number: &str,
        order_id: OrderId,
        actor: UserId,
        reason: StockReason,
    ) -> Result<u32> {
        let mut items = uow.order_items(order_id).await?;
        // Same lock order as reservation.
        items.sort_by_key(|item| item.book_id);
        let mut units = 0;
        for item in items {
            let delta = i32::try_from(item.quantity).map_err(|_| {
                FulfillmentError::Validation(format!("quantity {} out of range", item.quantity))
            })?;
            StockMutator::apply_delta(
                uow,
                StockChange::new(item.book_id, delta, actor, reason).with_notes(format!(
                    "Order #{order_number} - restored {} units",
                    item.quantity
                )),
            )
            .await?;
            units += item.quantity;
        }
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{Book, Money, Order, OrderLine, ShippingInfo};
    use store::{InMemoryStore, LedgerQuery, Store};

    async fn placed_order(store: &InMemoryStore, book: &Book, quantity: u32) -> Order {
        let (order, items) = Order::place(
            UserId::new(),
            ShippingInfo {
                address: "1 Library Lane".to_string(),
                phone: "555-0100".to_string(),
                note: None,
            },
            &[OrderLine {
                book_id: book.id,
                quantity,
                unit_price: book.price,
            }],
            Utc::now(),
        )
        .unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.insert_order(&order, &items).await.unwrap();
        uow.commit().await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_restore_credits_each_item() {
        let store = InMemoryStore::new();
        let book = Book::new("Dune", Money::from_cents(1500), 2);
        store.upsert_book(book.clone()).await.unwrap();
        let order = placed_order(&store, &book, 3).await;

        let mut uow = store.begin().await.unwrap();
        let result = CompensationEngine::restore(
            &mut uow,
            order.id,
            order.user_id,
            StockReason::OrderCancelledByCustomer,
        )
        .await
        .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(result, Restoration::Restored { units: 3 });
        let stored = store.find_book(book.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 5);

        let entries = store.query_ledger(LedgerQuery::for_book(book.id)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity_change, 3);
        assert_eq!(entries[0].reason, StockReason::OrderCancelledByCustomer);
        assert_eq!(
            entries[0].notes.as_deref(),
            Some(format!("Order #{} - restored 3 units", order.order_number).as_str())
        );
    }

    #[tokio::test]
    async fn test_cancelled_order_is_not_restored_twice() {
        let store = InMemoryStore::new();
        let book = Book::new("Dune", Money::from_cents(1500), 2);
        store.upsert_book(book.clone()).await.unwrap();
        let mut order = placed_order(&store, &book, 1).await;

        order.status = OrderStatus::Cancelled;
        let mut uow = store.begin().await.unwrap();
        uow.update_order(&order).await.unwrap();
        let result = CompensationEngine::restore(
            &mut uow,
            order.id,
            order.user_id,
            StockReason::OrderCancelledByAdmin,
        )
        .await
        .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(result, Restoration::AlreadyRestored);
        assert_eq!(
            store.find_book(book.id).await.unwrap().unwrap().stock_quantity,
            2
        );
        assert_eq!(store.ledger_len().await, 0);
    }

    #[tokio::test]
    async fn test_ledger_failure_is_reported_as_compensation_failure() {
        let store = InMemoryStore::new();
        let book = Book::new("Dune", Money::from_cents(1500), 2);
        store.upsert_book(book.clone()).await.unwrap();
        let order = placed_order(&store, &book, 1).await;
        store
            .set_fail_on_log(Some(StockReason::PaymentFailedRestore))
            .await;

        let mut uow = store.begin().await.unwrap();
        let err = CompensationEngine::restore(
            &mut uow,
            order.id,
            order.user_id,
            StockReason::PaymentFailedRestore,
        )
        .await
        .unwrap_err();
        uow.rollback().await.unwrap();

        assert!(matches!(
            err,
            FulfillmentError::CompensationFailed { order_id, .. } if order_id == order.id
        ));
        assert_eq!(
            store.find_book(book.id).await.unwrap().unwrap().stock_quantity,
            2
        );
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let err = CompensationEngine::restore(
            &mut uow,
            OrderId::new(),
            UserId::new(),
            StockReason::OrderCancelledByAdmin,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FulfillmentError::NotFound { entity: "order", .. }));
    }
}
