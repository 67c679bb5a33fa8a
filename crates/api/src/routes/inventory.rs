//! Staff inventory endpoints: manual adjustments, ledger reads, low stock.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use domain::{Book, BookId, BookStatus, InventoryLogEntry, StockReason, UserId};
use fulfillment::ManualAdjustment;
use serde::{Deserialize, Serialize};
use store::{LedgerQuery, Store};

use crate::error::ApiError;
use crate::extract::{JsonBody, QueryParams};
use crate::identity::Caller;
use crate::routes::parse_id;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    pub quantity_change: i32,
    /// Stable reason tag, e.g. `ManualRestock`.
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerParams {
    pub book_id: Option<String>,
    pub user_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<u32>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: BookId,
    pub title: String,
    pub price_cents: i64,
    pub stock_quantity: u32,
    pub status: BookStatus,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            price_cents: book.price.cents(),
            stock_quantity: book.stock_quantity,
            status: book.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryResponse {
    pub id: i64,
    pub book_id: BookId,
    pub user_id: UserId,
    pub quantity_change: i32,
    pub quantity_after_change: u32,
    pub reason: &'static str,
    pub reason_description: &'static str,
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl From<InventoryLogEntry> for LogEntryResponse {
    fn from(entry: InventoryLogEntry) -> Self {
        Self {
            id: entry.id,
            book_id: entry.book_id,
            user_id: entry.user_id,
            quantity_change: entry.quantity_change,
            quantity_after_change: entry.quantity_after_change,
            reason: entry.reason.as_str(),
            reason_description: entry.reason.description(),
            notes: entry.notes,
            logged_at: entry.logged_at,
        }
    }
}

fn entries(list: Vec<InventoryLogEntry>) -> Json<Vec<LogEntryResponse>> {
    Json(list.into_iter().map(Into::into).collect())
}

// -- Handlers --

/// PUT /inventory/{bookId} — manual stock adjustment.
#[tracing::instrument(skip(state, req))]
pub async fn adjust<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(book_id): Path<String>,
    JsonBody(req): JsonBody<AdjustRequest>,
) -> Result<Json<LogEntryResponse>, ApiError> {
    let book_id: BookId = parse_id("book", &book_id)?;
    let reason: StockReason = req
        .reason
        .parse()
        .map_err(|e: domain::DomainError| ApiError::BadRequest(e.to_string()))?;

    let entry = state
        .inventory
        .adjust(
            book_id,
            ManualAdjustment {
                quantity_change: req.quantity_change,
                reason,
                notes: req.notes,
            },
            actor,
        )
        .await?;

    Ok(Json(entry.into()))
}

/// GET /inventory/logs — filtered ledger, newest first.
#[tracing::instrument(skip(state))]
pub async fn logs<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    QueryParams(params): QueryParams<LedgerParams>,
) -> Result<Json<Vec<LogEntryResponse>>, ApiError> {
    let query = LedgerQuery {
        book_id: params
            .book_id
            .as_deref()
            .map(|raw| parse_id("book", raw))
            .transpose()?,
        user_id: params
            .user_id
            .as_deref()
            .map(|raw| parse_id("user", raw))
            .transpose()?,
        from: params.from,
        to: params.to,
        limit: params.limit,
        offset: params.offset,
    };

    Ok(entries(state.inventory.ledger(query).await?))
}

/// GET /inventory/{bookId}/logs — one book's history.
#[tracing::instrument(skip(state))]
pub async fn book_logs<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(book_id): Path<String>,
    QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<Vec<LogEntryResponse>>, ApiError> {
    let book_id: BookId = parse_id("book", &book_id)?;
    let history = state
        .inventory
        .book_history(book_id, page.limit, page.offset)
        .await?;
    Ok(entries(history))
}

/// GET /inventory/low-stock
pub async fn low_stock<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    QueryParams(params): QueryParams<LowStockParams>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let threshold = params.threshold.unwrap_or(state.low_stock_threshold);
    let books = state.inventory.low_stock(threshold).await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}
