//! Cart endpoints. Checkout reads the cart; these are the writers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::BookId;
use fulfillment::FulfillmentError;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::identity::Caller;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCartItemRequest {
    pub book_id: String,
    /// Zero removes the line.
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineResponse {
    pub book_id: BookId,
    pub title: Option<String>,
    pub quantity: u32,
    pub unit_price_cents: Option<i64>,
}

async fn cart_view<S: Store>(
    state: &AppState<S>,
    caller: Caller,
) -> Result<Vec<CartLineResponse>, ApiError> {
    let lines = state.store.cart_lines(caller.0).await?;
    let mut view = Vec::with_capacity(lines.len());
    for line in lines {
        let book = state.store.find_book(line.book_id).await?;
        view.push(CartLineResponse {
            book_id: line.book_id,
            title: book.as_ref().map(|b| b.title.clone()),
            quantity: line.quantity,
            unit_price_cents: book.map(|b| b.price.cents()),
        });
    }
    Ok(view)
}

/// GET /cart
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<Vec<CartLineResponse>>, ApiError> {
    Ok(Json(cart_view(&state, caller).await?))
}

/// PUT /cart/items — set or remove a line.
#[tracing::instrument(skip(state, req))]
pub async fn set_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    JsonBody(req): JsonBody<SetCartItemRequest>,
) -> Result<Json<Vec<CartLineResponse>>, ApiError> {
    let book_id: BookId = parse_id("book", &req.book_id)?;
    if req.quantity > 0 && state.store.find_book(book_id).await?.is_none() {
        return Err(FulfillmentError::not_found("book", book_id).into());
    }

    state
        .store
        .set_cart_line(caller.0, book_id, req.quantity)
        .await?;
    Ok(Json(cart_view(&state, caller).await?))
}
