//! Order status changes after checkout: cancellations and admin updates.

use chrono::Utc;
use domain::{CancelledBy, Order, OrderDetails, OrderId, OrderStatus, StockReason, UserId};
use store::{Store, UnitOfWork};

use crate::compensation::CompensationEngine;
use crate::error::{FulfillmentError, Result};

/// Drives the order status machine and order reads.
///
/// Every cancellation restores stock in the same unit of work as the
/// `Cancelled` status write.
#[derive(Clone)]
pub struct OrderStatusService<S: Store> {
    store: S,
}

impl<S: Store> OrderStatusService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Cancels one of the customer's own orders.
    ///
    /// Allowed only while the order is `Pending` or `Processing`. An order
    /// owned by someone else is reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn customer_cancel(&self, order_id: OrderId, user_id: UserId) -> Result<OrderDetails> {
        self.cancel(order_id, user_id, CancelledBy::Customer).await
    }

    /// Cancels any order that is not `Delivered`. Cancelling a cancelled
    /// order is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn admin_cancel(&self, order_id: OrderId, admin_id: UserId) -> Result<OrderDetails> {
        self.cancel(order_id, admin_id, CancelledBy::Admin).await
    }

    /// Sets an order's status from its numeric code (`0..=5`).
    ///
    /// A `Cancelled` target goes through the admin cancellation path so
    /// that stock is restored.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        code: i32,
        admin_id: UserId,
    ) -> Result<OrderDetails> {
        let target = OrderStatus::from_code(code)?;
        if target == OrderStatus::Cancelled {
            return self.admin_cancel(order_id, admin_id).await;
        }

        let mut uow = self.store.begin().await?;
        let mut order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("order", order_id))?;

        let from = order.status;
        if order.transition_to(target, Utc::now())? {
            uow.update_order(&order).await?;
            uow.commit().await?;
            tracing::info!(%order_id, %from, to = %target, "order status updated");
        } else {
            uow.rollback().await?;
        }

        self.find_order(order_id).await
    }

    async fn cancel(
        &self,
        order_id: OrderId,
        actor: UserId,
        by: CancelledBy,
    ) -> Result<OrderDetails> {
        let reason = match by {
            CancelledBy::Customer => StockReason::OrderCancelledByCustomer,
            CancelledBy::Admin | CancelledBy::System => StockReason::OrderCancelledByAdmin,
        };

        let mut uow = self.store.begin().await?;
        let mut order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("order", order_id))?;

        if by == CancelledBy::Customer && order.user_id != actor {
            return Err(FulfillmentError::not_found("order", order_id));
        }

        if !order.check_cancellable(by)? {
            uow.rollback().await?;
            tracing::info!(%order_id, "order already cancelled");
            return self.find_order(order_id).await;
        }

        let from = order.status;
        CompensationEngine::restore(&mut uow, order_id, actor, reason).await?;
        order.cancel(by)?;
        uow.update_order(&order).await?;
        uow.commit().await?;

        tracing::info!(%order_id, %from, reason = reason.as_str(), "order cancelled");
        self.find_order(order_id).await
    }

    /// Any order with its items and payment.
    pub async fn find_order(&self, order_id: OrderId) -> Result<OrderDetails> {
        self.store
            .find_order(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("order", order_id))
    }

    /// One of the user's own orders; someone else's is reported as not found.
    pub async fn find_user_order(&self, order_id: OrderId, user_id: UserId) -> Result<OrderDetails> {
        let details = self.find_order(order_id).await?;
        if details.order.user_id != user_id {
            return Err(FulfillmentError::not_found("order", order_id));
        }
        Ok(details)
    }

    /// The user's orders, newest first.
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_user(user_id).await?)
    }

    /// Every order, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }
}
