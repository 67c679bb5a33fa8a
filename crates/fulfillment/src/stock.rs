//! The single sanctioned path for changing a book's stock.

use chrono::Utc;
use domain::{BookId, InventoryLogEntry, NewLogEntry, StockReason, UserId};
use store::{StockAdjustment, UnitOfWork};

use crate::error::{FulfillmentError, Result};

/// A signed stock delta with its audit context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub book_id: BookId,
    pub delta: i32,
    /// Who is responsible for the change.
    pub actor: UserId,
    pub reason: StockReason,
    pub notes: Option<String>,
}

impl StockChange {
    pub fn new(book_id: BookId, delta: i32, actor: UserId, reason: StockReason) -> Self {
        Self {
            book_id,
            delta,
            actor,
            reason,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Applies stock deltas inside a caller-owned unit of work.
///
/// Every successful call changes the quantity, keeps the book status in
/// line with it, and appends exactly one ledger entry. All three writes land
/// in the same unit of work, so they commit or roll back together.
pub struct StockMutator;

impl StockMutator {
    /// Applies `change` and returns the ledger entry it produced.
    ///
    /// Fails with `NotFound` for an unknown book and `InsufficientStock`
    /// when the result would be negative. Nothing is written on failure.
    #[tracing::instrument(skip(uow), fields(book_id = %change.book_id, delta = change.delta, reason = change.reason.as_str()))]
    pub async fn apply_delta<U: UnitOfWork>(
        uow: &mut U,
        change: StockChange,
    ) -> Result<InventoryLogEntry> {
        if change.delta == 0 {
            return Err(FulfillmentError::Validation(
                "stock change must not be zero".to_string(),
            ));
        }

        let book = match uow.adjust_stock(change.book_id, change.delta).await? {
            StockAdjustment::Applied(book) => book,
            StockAdjustment::Insufficient { available } => {
                let title = uow
                    .find_book(change.book_id)
                    .await?
                    .map(|b| b.title)
                    .unwrap_or_default();
                tracing::warn!(available, "stock change rejected");
                return Err(FulfillmentError::InsufficientStock {
                    title,
                    available,
                    requested: change.delta.unsigned_abs(),
                });
            }
            StockAdjustment::Missing => {
                return Err(FulfillmentError::not_found("book", change.book_id));
            }
        };

        let status = book.status.after_stock_change(book.stock_quantity);
        if status != book.status {
            uow.set_book_status(book.id, status).await?;
            tracing::info!(from = %book.status, to = %status, "book status changed");
        }

        let entry = uow
            .append_log(NewLogEntry {
                book_id: book.id,
                user_id: change.actor,
                quantity_change: change.delta,
                quantity_after_change: book.stock_quantity,
                reason: change.reason,
                notes: change.notes,
                logged_at: Utc::now(),
            })
            .await?;

        metrics::counter!("stock_mutations_total", "reason" => change.reason.as_str())
            .increment(1);
        tracing::debug!(quantity_after = book.stock_quantity, "stock changed");

        Ok(entry)
    }
}
