//! Checkout orchestration: cart to order, stock reservation, payment and
//! finalization.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use domain::{
    CancelledBy, CartLine, Order, OrderDetails, OrderId, OrderItem, OrderLine, OrderStatus,
    Payment, PaymentMethod, PaymentStatus, ShippingInfo, StockReason, UserId,
};
use store::{Store, UnitOfWork};

use crate::compensation::CompensationEngine;
use crate::error::{FulfillmentError, Result};
use crate::payment::{PaymentGateway, PaymentOutcome, PaymentRequest};
use crate::state::CheckoutState;
use crate::stock::{StockChange, StockMutator};

/// Orchestration knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Upper bound on the gateway call; a timeout counts as a declined payment.
    pub payment_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            payment_timeout: Duration::from_millis(5000),
        }
    }
}

/// A customer's request to turn their cart into an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
}

/// Turns carts into orders.
///
/// A checkout runs two units of work with the payment call between them:
/// the reservation (order, items, pending payment, stock decrements and
/// their ledger entries) and the finalization (payment outcome, order
/// status, cart or compensation).
#[derive(Clone)]
pub struct CheckoutOrchestrator<S: Store> {
    store: S,
    gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
}

impl<S: Store> CheckoutOrchestrator<S> {
    pub fn new(store: S, gateway: Arc<dyn PaymentGateway>, config: CheckoutConfig) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Checks out the caller's cart and returns the resulting order.
    ///
    /// A declined or timed-out payment is not an error: the returned order
    /// is `Cancelled`, its stock restored, and the cart kept. If an admin
    /// delivered the order during the payment call, it stays `Delivered`
    /// with a `Failed` payment.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<OrderDetails> {
        let started = Instant::now();
        let mut state = CheckoutState::default();

        let result = self.run(&request, &mut state).await;

        let outcome = match &result {
            Ok(details) if Self::payment_declined(details) => "payment_failed",
            Ok(_) => "completed",
            Err(FulfillmentError::CompensationFailed { .. }) => "compensation_failed",
            Err(err) if err.is_client_error() => "rejected",
            Err(_) => "error",
        };
        match &result {
            Err(err) => {
                // Compensation failures are already reported by the engine.
                if state.holds_reservation()
                    && !matches!(err, FulfillmentError::CompensationFailed { .. })
                {
                    tracing::error!(
                        target: "reconciliation",
                        stage = %state,
                        error = %err,
                        "checkout aborted with stock still reserved"
                    );
                } else {
                    tracing::warn!(stage = %state, error = %err, "checkout failed");
                }
                state = state.fail(err.to_string());
            }
            Ok(_) => state = state.next(),
        }

        metrics::counter!("checkout_total", "outcome" => outcome).increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(%state, outcome, failure = ?state.failure_reason(), "checkout finished");

        result
    }

    fn payment_declined(details: &OrderDetails) -> bool {
        details
            .payment
            .as_ref()
            .is_some_and(|payment| payment.status == PaymentStatus::Failed)
    }

    async fn run(
        &self,
        request: &CheckoutRequest,
        state: &mut CheckoutState,
    ) -> Result<OrderDetails> {
        let lines = self.validate(request.user_id).await?;
        *state = state.next();

        let order = self.reserve(request, &lines).await?;
        *state = state.next();
        tracing::info!(order_id = %order.id, order_number = %order.order_number, "stock reserved");

        let outcome = self
            .charge(PaymentRequest {
                order_id: order.id,
                amount: order.total_amount,
                method: request.payment_method,
            })
            .await;
        *state = state.next();

        self.finalize(order.id, request.user_id, outcome).await?;

        self.store
            .find_order(order.id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("order", order.id))
    }

    /// Reads the cart and checks every line before anything is written.
    async fn validate(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        let lines = self.store.cart_lines(user_id).await?;
        if lines.is_empty() {
            return Err(FulfillmentError::Validation("cart is empty".to_string()));
        }

        for line in &lines {
            if line.quantity == 0 {
                return Err(FulfillmentError::Validation(format!(
                    "cart line for book {} has zero quantity",
                    line.book_id
                )));
            }
            let book = self
                .store
                .find_book(line.book_id)
                .await?
                .ok_or_else(|| FulfillmentError::not_found("book", line.book_id))?;
            if !book.has_stock_for(line.quantity) {
                return Err(FulfillmentError::InsufficientStock {
                    title: book.title,
                    available: book.stock_quantity,
                    requested: line.quantity,
                });
            }
        }

        Ok(lines)
    }

    /// Creates the order and takes its stock in one unit of work.
    ///
    /// The per-book decrement is conditional, so a concurrent checkout that
    /// took the stock after validation makes this step fail and roll back
    /// every earlier decrement.
    async fn reserve(&self, request: &CheckoutRequest, lines: &[CartLine]) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        match Self::reserve_in(&mut uow, request, lines).await {
            Ok(order) => {
                uow.commit().await?;
                Ok(order)
            }
            Err(err) => {
                uow.rollback().await?;
                Err(err)
            }
        }
    }

    async fn reserve_in(
        uow: &mut S::Uow,
        request: &CheckoutRequest,
        lines: &[CartLine],
    ) -> Result<Order> {
        let now = Utc::now();

        let mut order_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let book = uow
                .find_book(line.book_id)
                .await?
                .ok_or_else(|| FulfillmentError::not_found("book", line.book_id))?;
            order_lines.push(OrderLine {
                book_id: book.id,
                quantity: line.quantity,
                unit_price: book.price,
            });
        }

        let (order, items) =
            Order::place(request.user_id, request.shipping.clone(), &order_lines, now)?;
        uow.insert_order(&order, &items).await?;
        uow.insert_payment(&Payment::pending(
            order.id,
            order.total_amount,
            request.payment_method,
            now,
        ))
        .await?;

        // Book rows are locked in id order so concurrent reservations over
        // the same books cannot deadlock.
        let mut by_book: Vec<&OrderItem> = items.iter().collect();
        by_book.sort_by_key(|item| item.book_id);
        for item in by_book {
            Self::take_stock(uow, &order, item).await?;
        }

        Ok(order)
    }

    async fn take_stock(uow: &mut S::Uow, order: &Order, item: &OrderItem) -> Result<()> {
        let quantity = i32::try_from(item.quantity).map_err(|_| {
            FulfillmentError::Validation(format!("quantity {} out of range", item.quantity))
        })?;
        StockMutator::apply_delta(
            uow,
            StockChange::new(item.book_id, -quantity, order.user_id, StockReason::OrderPlaced)
                .with_notes(format!("Order #{}", order.order_number)),
        )
        .await?;
        Ok(())
    }

    /// Calls the gateway outside any unit of work, bounded by the timeout.
    async fn charge(&self, request: PaymentRequest) -> PaymentOutcome {
        let order_id = request.order_id;
        match tokio::time::timeout(self.config.payment_timeout, self.gateway.process(request))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                metrics::counter!("payment_timeouts_total").increment(1);
                tracing::warn!(%order_id, timeout_ms = self.config.payment_timeout.as_millis() as u64, "payment timed out");
                PaymentOutcome::Failed {
                    reason: "Payment timed out".to_string(),
                }
            }
        }
    }

    /// Applies the payment outcome in a second unit of work.
    async fn finalize(
        &self,
        order_id: OrderId,
        user_id: UserId,
        outcome: PaymentOutcome,
    ) -> Result<()> {
        let mut uow = self.store.begin().await?;
        match Self::finalize_in(&mut uow, order_id, user_id, outcome).await {
            Ok(()) => {
                uow.commit().await?;
                Ok(())
            }
            Err(err) => {
                uow.rollback().await?;
                Err(err)
            }
        }
    }

    async fn finalize_in(
        uow: &mut S::Uow,
        order_id: OrderId,
        user_id: UserId,
        outcome: PaymentOutcome,
    ) -> Result<()> {
        let now = Utc::now();
        let mut order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("order", order_id))?;
        let mut payment = uow
            .find_payment(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("payment", order_id))?;

        match outcome {
            PaymentOutcome::Completed { transaction_id } => {
                payment.complete(transaction_id, now);
                uow.update_payment(&payment).await?;

                if order.status == OrderStatus::Pending {
                    order.transition_to(OrderStatus::Processing, now)?;
                    uow.update_order(&order).await?;
                    uow.clear_cart(user_id).await?;
                    tracing::info!(%order_id, "payment completed");
                } else {
                    tracing::warn!(%order_id, status = %order.status, "payment completed for an order that moved on");
                }
            }
            PaymentOutcome::Failed { reason } => {
                tracing::warn!(%order_id, %reason, "payment declined");
                payment.fail(reason, now);
                uow.update_payment(&payment).await?;

                // An admin may have moved the order on during the payment call.
                // The declined payment is still recorded.
                match order.check_cancellable(CancelledBy::System) {
                    Ok(true) => {
                        CompensationEngine::restore(
                            uow,
                            order_id,
                            user_id,
                            StockReason::PaymentFailedRestore,
                        )
                        .await?;
                        order.cancel(CancelledBy::System)?;
                        uow.update_order(&order).await?;
                    }
                    Ok(false) => {
                        tracing::info!(%order_id, "order already cancelled, stock restored earlier");
                    }
                    Err(_) => {
                        tracing::error!(
                            target: "reconciliation",
                            %order_id,
                            order_number = %order.order_number,
                            status = %order.status,
                            "payment declined for an order that can no longer be cancelled"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}
