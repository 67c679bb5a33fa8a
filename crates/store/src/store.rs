use async_trait::async_trait;
use domain::{
    Book, BookId, BookStatus, CartLine, InventoryLogEntry, NewLogEntry, Order, OrderDetails,
    OrderId, OrderItem, Payment, UserId,
};

use crate::{LedgerQuery, Result};

/// Outcome of an atomic conditional stock change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockAdjustment {
    /// The delta was applied. `book` carries the new quantity and the status
    /// it had before the change.
    Applied(Book),

    /// Applying the delta would have taken stock below zero; nothing changed.
    Insufficient { available: u32 },

    /// No such book.
    Missing,
}

/// Shared handle to the backing store.
///
/// Read-only queries run outside any transaction. Every write goes through a
/// [`UnitOfWork`] obtained from [`Store::begin`].
#[async_trait]
pub trait Store: Send + Sync {
    /// The unit-of-work type produced by this store.
    type Uow: UnitOfWork;

    /// Starts a new unit of work.
    async fn begin(&self) -> Result<Self::Uow>;

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>>;

    /// Inserts or replaces a catalog book.
    ///
    /// The catalog is owned elsewhere; this is the seam it (and tests) use to
    /// make books visible to the engine.
    async fn upsert_book(&self, book: Book) -> Result<()>;

    /// Books with `stock_quantity < threshold` that are not discontinued,
    /// lowest stock first.
    async fn low_stock(&self, threshold: u32) -> Result<Vec<Book>>;

    /// Snapshot of a user's cart.
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>>;

    /// Sets a cart line; a quantity of zero removes it.
    async fn set_cart_line(&self, user_id: UserId, book_id: BookId, quantity: u32)
    -> Result<()>;

    /// Loads an order with its items and payment.
    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>>;

    /// A user's orders, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Every order, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Reads the inventory ledger, newest first.
    async fn query_ledger(&self, query: LedgerQuery) -> Result<Vec<InventoryLogEntry>>;
}

/// One atomic unit of work.
///
/// Nothing written through a unit of work is visible to others until
/// [`UnitOfWork::commit`]. Dropping it without committing rolls back.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_book(&mut self, book_id: BookId) -> Result<Option<Book>>;

    /// Adds `delta` to a book's stock if and only if the result stays
    /// non-negative. Check and write happen as one atomic step.
    async fn adjust_stock(&mut self, book_id: BookId, delta: i32) -> Result<StockAdjustment>;

    async fn set_book_status(&mut self, book_id: BookId, status: BookStatus) -> Result<()>;

    /// Appends a ledger entry and returns it with its assigned id.
    async fn append_log(&mut self, entry: NewLogEntry) -> Result<InventoryLogEntry>;

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> Result<()>;

    /// Reads an order and holds it against concurrent writers until the unit
    /// of work ends.
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>>;

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Persists the order's status and dates.
    async fn update_order(&mut self, order: &Order) -> Result<()>;

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()>;

    async fn find_payment(&mut self, order_id: OrderId) -> Result<Option<Payment>>;

    async fn update_payment(&mut self, payment: &Payment) -> Result<()>;

    async fn clear_cart(&mut self, user_id: UserId) -> Result<()>;

    /// Makes every write of this unit of work visible at once.
    async fn commit(self) -> Result<()>
    where
        Self: Sized;

    /// Discards every write of this unit of work.
    async fn rollback(self) -> Result<()>
    where
        Self: Sized;
}
