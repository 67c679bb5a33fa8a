//! Staff-facing inventory operations: manual adjustments and ledger reads.

use domain::{Book, BookId, InventoryLogEntry, StockReason, UserId};
use store::{LedgerQuery, Store, UnitOfWork};

use crate::error::{FulfillmentError, Result};
use crate::stock::{StockChange, StockMutator};

/// A manual stock adjustment submitted by staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualAdjustment {
    pub quantity_change: i32,
    pub reason: StockReason,
    pub notes: Option<String>,
}

/// Manual stock adjustments plus the read-only ledger queries.
///
/// The ledger has no write path here; every entry comes from
/// [`StockMutator`].
#[derive(Clone)]
pub struct InventoryService<S: Store> {
    store: S,
}

impl<S: Store> InventoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Applies a staff adjustment in its own unit of work.
    ///
    /// Only manual reasons are accepted; order-driven reasons belong to
    /// checkout and compensation.
    #[tracing::instrument(skip(self, adjustment), fields(change = adjustment.quantity_change, reason = adjustment.reason.as_str()))]
    pub async fn adjust(
        &self,
        book_id: BookId,
        adjustment: ManualAdjustment,
        actor: UserId,
    ) -> Result<InventoryLogEntry> {
        if !adjustment.reason.is_manual() {
            return Err(FulfillmentError::Validation(format!(
                "reason {} is reserved for order processing",
                adjustment.reason.as_str()
            )));
        }
        if adjustment.quantity_change == 0 {
            return Err(FulfillmentError::Validation(
                "quantityChange must not be zero".to_string(),
            ));
        }

        let mut change = StockChange::new(
            book_id,
            adjustment.quantity_change,
            actor,
            adjustment.reason,
        );
        change.notes = adjustment.notes;

        let mut uow = self.store.begin().await?;
        match StockMutator::apply_delta(&mut uow, change).await {
            Ok(entry) => {
                uow.commit().await?;
                tracing::info!(quantity_after = entry.quantity_after_change, "stock adjusted");
                Ok(entry)
            }
            Err(err) => {
                uow.rollback().await?;
                Err(err)
            }
        }
    }

    /// Ledger entries matching `query`, newest first.
    pub async fn ledger(&self, query: LedgerQuery) -> Result<Vec<InventoryLogEntry>> {
        Ok(self.store.query_ledger(query).await?)
    }

    /// Ledger entries for one existing book, newest first.
    pub async fn book_history(
        &self,
        book_id: BookId,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<InventoryLogEntry>> {
        if self.store.find_book(book_id).await?.is_none() {
            return Err(FulfillmentError::not_found("book", book_id));
        }

        let mut query = LedgerQuery::for_book(book_id);
        query.limit = limit;
        query.offset = offset;
        self.ledger(query).await
    }

    /// Sum of every logged change for a book.
    ///
    /// Equals the book's current stock minus its stock before the first
    /// logged change.
    pub async fn net_change(&self, book_id: BookId) -> Result<i64> {
        let entries = self.ledger(LedgerQuery::for_book(book_id)).await?;
        Ok(entries.iter().map(|e| i64::from(e.quantity_change)).sum())
    }

    /// Books below `threshold` that are still sold, lowest stock first.
    pub async fn low_stock(&self, threshold: u32) -> Result<Vec<Book>> {
        Ok(self.store.low_stock(threshold).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Money;
    use store::InMemoryStore;

    async fn service_with_book(stock: u32) -> (InventoryService<InMemoryStore>, Book) {
        let store = InMemoryStore::new();
        let book = Book::new("Dune", Money::from_cents(1500), stock);
        store.upsert_book(book.clone()).await.unwrap();
        (InventoryService::new(store), book)
    }

    fn adjustment(change: i32, reason: StockReason) -> ManualAdjustment {
        ManualAdjustment {
            quantity_change: change,
            reason,
            notes: Some("cycle count".to_string()),
        }
    }

    #[tokio::test]
    async fn test_manual_restock_and_history() {
        let (service, book) = service_with_book(1).await;
        let staff = UserId::new();

        service
            .adjust(book.id, adjustment(4, StockReason::ManualRestock), staff)
            .await
            .unwrap();
        service
            .adjust(book.id, adjustment(-2, StockReason::Damaged), staff)
            .await
            .unwrap();

        let history = service.book_history(book.id, None, None).await.unwrap();
        let changes: Vec<_> = history.iter().map(|e| e.quantity_change).collect();
        assert_eq!(changes, vec![-2, 4]);
        assert_eq!(history[0].quantity_after_change, 3);
        assert_eq!(service.net_change(book.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_negative_result_is_rejected() {
        let (service, book) = service_with_book(1).await;

        let err = service
            .adjust(
                book.id,
                adjustment(-5, StockReason::ManualCorrection),
                UserId::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::InsufficientStock { .. }));
        assert_eq!(service.net_change(book.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_order_reasons_are_not_manual() {
        let (service, book) = service_with_book(1).await;

        let err = service
            .adjust(
                book.id,
                adjustment(1, StockReason::OrderCancelledByAdmin),
                UserId::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Validation(_)));

        let err = service
            .adjust(book.id, adjustment(0, StockReason::ManualCorrection), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_history_of_unknown_book() {
        let (service, _) = service_with_book(1).await;
        let err = service
            .book_history(BookId::new(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::NotFound { .. }));
    }
}
