use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    Book, BookId, BookStatus, CartLine, InventoryLogEntry, NewLogEntry, Order, OrderDetails,
    OrderId, OrderItem, Payment, StockReason, UserId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    LedgerQuery, Result, StoreError,
    store::{StockAdjustment, Store, UnitOfWork},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    books: HashMap<BookId, Book>,
    carts: HashMap<UserId, Vec<CartLine>>,
    orders: HashMap<OrderId, Order>,
    order_items: HashMap<OrderId, Vec<OrderItem>>,
    payments: HashMap<OrderId, Payment>,
    ledger: Vec<InventoryLogEntry>,
    next_log_id: i64,
    fail_log_reason: Option<StockReason>,
}

/// In-memory store for tests and local runs.
///
/// A unit of work holds the single state lock for its whole lifetime and
/// edits a private copy that replaces the shared state on commit. Units of
/// work are therefore serialized, which makes every check-and-write atomic.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every ledger append with `reason` fail, simulating a broken
    /// ledger write. `None` clears the fault.
    pub async fn set_fail_on_log(&self, reason: Option<StockReason>) {
        self.state.lock().await.fail_log_reason = reason;
    }

    /// Returns the total number of ledger entries.
    pub async fn ledger_len(&self) -> usize {
        self.state.lock().await.ledger.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Uow = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryUnitOfWork { guard, working })
    }

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.state.lock().await.books.get(&book_id).cloned())
    }

    async fn upsert_book(&self, book: Book) -> Result<()> {
        self.state.lock().await.books.insert(book.id, book);
        Ok(())
    }

    async fn low_stock(&self, threshold: u32) -> Result<Vec<Book>> {
        let state = self.state.lock().await;
        let mut books: Vec<_> = state
            .books
            .values()
            .filter(|b| b.stock_quantity < threshold && b.status != BookStatus::Discontinued)
            .cloned()
            .collect();
        books.sort_by(|a, b| {
            a.stock_quantity
                .cmp(&b.stock_quantity)
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(books)
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        Ok(self
            .state
            .lock()
            .await
            .carts
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_cart_line(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let cart = state.carts.entry(user_id).or_default();
        match cart.iter_mut().find(|line| line.book_id == book_id) {
            Some(line) if quantity > 0 => line.quantity = quantity,
            Some(_) => cart.retain(|line| line.book_id != book_id),
            None if quantity > 0 => cart.push(CartLine {
                user_id,
                book_id,
                quantity,
            }),
            None => {}
        }
        Ok(())
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&order_id).map(|order| OrderDetails {
            order: order.clone(),
            items: state
                .order_items
                .get(&order_id)
                .cloned()
                .unwrap_or_default(),
            payment: state.payments.get(&order_id).cloned(),
        }))
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(orders)
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<_> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(orders)
    }

    async fn query_ledger(&self, query: LedgerQuery) -> Result<Vec<InventoryLogEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<_> = state
            .ledger
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();

        // Newest first; the sequence breaks ties within the same instant.
        entries.sort_by(|a, b| b.logged_at.cmp(&a.logged_at).then(b.id.cmp(&a.id)));

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(entries.into_iter().skip(offset).take(limit).collect())
    }
}

/// Unit of work over [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn find_book(&mut self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.working.books.get(&book_id).cloned())
    }

    async fn adjust_stock(&mut self, book_id: BookId, delta: i32) -> Result<StockAdjustment> {
        let Some(book) = self.working.books.get_mut(&book_id) else {
            return Ok(StockAdjustment::Missing);
        };

        let next = i64::from(book.stock_quantity) + i64::from(delta);
        match u32::try_from(next) {
            Ok(quantity) => {
                book.stock_quantity = quantity;
                Ok(StockAdjustment::Applied(book.clone()))
            }
            Err(_) => Ok(StockAdjustment::Insufficient {
                available: book.stock_quantity,
            }),
        }
    }

    async fn set_book_status(&mut self, book_id: BookId, status: BookStatus) -> Result<()> {
        let book = self
            .working
            .books
            .get_mut(&book_id)
            .ok_or_else(|| StoreError::Missing {
                entity: "book",
                id: book_id.to_string(),
            })?;
        book.status = status;
        Ok(())
    }

    async fn append_log(&mut self, entry: NewLogEntry) -> Result<InventoryLogEntry> {
        if self.working.fail_log_reason == Some(entry.reason) {
            return Err(StoreError::Corrupt(format!(
                "ledger write rejected for {}",
                entry.reason.as_str()
            )));
        }

        self.working.next_log_id += 1;
        let stored = InventoryLogEntry::from_new(self.working.next_log_id, entry);
        self.working.ledger.push(stored.clone());
        Ok(stored)
    }

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> Result<()> {
        self.working.orders.insert(order.id, order.clone());
        self.working.order_items.insert(order.id, items.to_vec());
        Ok(())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&order_id).cloned())
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        Ok(self
            .working
            .order_items
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        let stored = self
            .working
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| StoreError::Missing {
                entity: "order",
                id: order.id.to_string(),
            })?;
        stored.status = order.status;
        stored.shipped_date = order.shipped_date;
        stored.delivered_date = order.delivered_date;
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        self.working
            .payments
            .insert(payment.order_id, payment.clone());
        Ok(())
    }

    async fn find_payment(&mut self, order_id: OrderId) -> Result<Option<Payment>> {
        Ok(self.working.payments.get(&order_id).cloned())
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<()> {
        match self.working.payments.get_mut(&payment.order_id) {
            Some(stored) => {
                *stored = payment.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                entity: "payment",
                id: payment.order_id.to_string(),
            }),
        }
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<()> {
        self.working.carts.remove(&user_id);
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
