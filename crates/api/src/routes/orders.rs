//! Customer checkout and order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    BookId, Order, OrderDetails, OrderId, OrderItem, OrderStatus, Payment, PaymentMethod,
    PaymentStatus, ShippingInfo, UserId,
};
use fulfillment::CheckoutRequest;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::identity::Caller;
use crate::routes::parse_id;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: String,
    pub shipping_phone: String,
    pub note: Option<String>,
    pub payment_method: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    pub status: OrderStatus,
    pub status_code: i32,
    pub total_cents: i64,
    pub total: String,
    pub shipping_address: String,
    pub shipping_phone: String,
    pub note: Option<String>,
    pub order_date: DateTime<Utc>,
    pub shipped_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
}

impl From<Order> for OrderSummaryResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            order_number: order.order_number.to_string(),
            status: order.status,
            status_code: order.status.code(),
            total_cents: order.total_amount.cents(),
            total: order.total_amount.to_string(),
            shipping_address: order.shipping.address,
            shipping_phone: order.shipping.phone,
            note: order.shipping.note,
            order_date: order.order_date,
            shipped_date: order.shipped_date,
            delivered_date: order.delivered_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub book_id: BookId,
    pub quantity: u32,
    pub price_at_order_cents: i64,
    pub line_total_cents: i64,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            book_id: item.book_id,
            quantity: item.quantity,
            price_at_order_cents: item.price_at_order.cents(),
            line_total_cents: item.line_total().cents(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            amount_cents: payment.amount.cents(),
            method: payment.method,
            status: payment.status,
            transaction_id: payment.transaction_id,
            failure_reason: payment.failure_reason,
            created_at: payment.created_at,
            processed_at: payment.processed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: OrderSummaryResponse,
    pub items: Vec<OrderItemResponse>,
    pub payment: Option<PaymentResponse>,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        Self {
            order: details.order.into(),
            items: details.items.into_iter().map(Into::into).collect(),
            payment: details.payment.map(Into::into),
        }
    }
}

// -- Handlers --

/// POST /orders — check out the caller's cart.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
    JsonBody(req): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    if req.shipping_address.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "shippingAddress is required".to_string(),
        ));
    }
    if req.shipping_phone.trim().is_empty() {
        return Err(ApiError::BadRequest("shippingPhone is required".to_string()));
    }
    let payment_method: PaymentMethod = req
        .payment_method
        .parse()
        .map_err(|e: domain::DomainError| ApiError::BadRequest(e.to_string()))?;

    let details = state
        .checkout
        .checkout(CheckoutRequest {
            user_id,
            shipping: ShippingInfo {
                address: req.shipping_address,
                phone: req.shipping_phone,
                note: req.note.filter(|n| !n.trim().is_empty()),
            },
            payment_method,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(details.into())))
}

/// GET /orders — the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let orders = state.orders.orders_for_user(user_id).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id} — one of the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let details = state.orders.find_user_order(order_id, user_id).await?;
    Ok(Json(details.into()))
}

/// POST /orders/{id}/cancel — customer cancellation.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(user_id): Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let details = state.orders.customer_cancel(order_id, user_id).await?;
    Ok(Json(details.into()))
}
