//! Admin order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::OrderId;
use serde::Deserialize;
use store::Store;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::identity::Caller;
use crate::routes::orders::{OrderResponse, OrderSummaryResponse};
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Numeric status code, `0..=5`.
    pub status: i32,
}

/// GET /admin/orders — every order, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let orders = state.orders.list_orders().await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /admin/orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    Ok(Json(state.orders.find_order(order_id).await?.into()))
}

/// PUT /admin/orders/{id}/status
#[tracing::instrument(skip(state))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(admin_id): Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let details = state
        .orders
        .update_status(order_id, req.status, admin_id)
        .await?;
    Ok(Json(details.into()))
}

/// POST /admin/orders/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(admin_id): Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let details = state.orders.admin_cancel(order_id, admin_id).await?;
    Ok(Json(details.into()))
}
