use async_trait::async_trait;
use domain::{
    Book, BookId, BookStatus, CartLine, InventoryLogEntry, Money, NewLogEntry, Order,
    OrderDetails, OrderId, OrderItem, OrderNumber, Payment, ShippingInfo, UserId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    LedgerQuery, Result, StoreError,
    store::{StockAdjustment, Store, UnitOfWork},
};

const BOOK_COLUMNS: &str = "id, title, price_cents, stock_quantity, status";
const ORDER_COLUMNS: &str = "id, user_id, order_number, status, total_cents, shipping_address, shipping_phone, note, order_date, shipped_date, delivered_date";
const ITEM_COLUMNS: &str = "order_id, book_id, quantity, price_at_order_cents";
const PAYMENT_COLUMNS: &str = "order_id, amount_cents, method, status, transaction_id, failure_reason, created_at, processed_at";
const LOG_COLUMNS: &str =
    "id, book_id, user_id, quantity_change, quantity_after_change, reason, notes, logged_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

fn to_i32(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("quantity too large: {value}")))
}

fn row_to_book(row: PgRow) -> Result<Book> {
    let status: String = row.try_get("status")?;
    Ok(Book {
        id: BookId::from_uuid(row.try_get::<Uuid, _>("id")?),
        title: row.try_get("title")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock_quantity: to_u32(row.try_get("stock_quantity")?, "stock_quantity")?,
        status: status.parse()?,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let number: String = row.try_get("order_number")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        order_number: OrderNumber::new(number),
        status: status.parse()?,
        total_amount: Money::from_cents(row.try_get("total_cents")?),
        shipping: ShippingInfo {
            address: row.try_get("shipping_address")?,
            phone: row.try_get("shipping_phone")?,
            note: row.try_get("note")?,
        },
        order_date: row.try_get("order_date")?,
        shipped_date: row.try_get("shipped_date")?,
        delivered_date: row.try_get("delivered_date")?,
    })
}

fn row_to_item(row: PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        book_id: BookId::from_uuid(row.try_get::<Uuid, _>("book_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        price_at_order: Money::from_cents(row.try_get("price_at_order_cents")?),
    })
}

fn row_to_payment(row: PgRow) -> Result<Payment> {
    let method: String = row.try_get("method")?;
    let status: String = row.try_get("status")?;
    Ok(Payment {
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        amount: Money::from_cents(row.try_get("amount_cents")?),
        method: method.parse()?,
        status: status.parse()?,
        transaction_id: row.try_get("transaction_id")?,
        failure_reason: row.try_get("failure_reason")?,
        created_at: row.try_get("created_at")?,
        processed_at: row.try_get("processed_at")?,
    })
}

fn row_to_log(row: PgRow) -> Result<InventoryLogEntry> {
    let reason: String = row.try_get("reason")?;
    Ok(InventoryLogEntry {
        id: row.try_get("id")?,
        book_id: BookId::from_uuid(row.try_get::<Uuid, _>("book_id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        quantity_change: row.try_get("quantity_change")?,
        quantity_after_change: to_u32(
            row.try_get("quantity_after_change")?,
            "quantity_after_change",
        )?,
        reason: reason.parse()?,
        notes: row.try_get("notes")?,
        logged_at: row.try_get("logged_at")?,
    })
}

#[async_trait]
impl Store for PostgresStore {
    type Uow = PostgresUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow> {
        let tx = self.pool.begin().await?;
        Ok(PostgresUnitOfWork { tx })
    }

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>> {
        sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(book_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_book)
            .transpose()
    }

    async fn upsert_book(&self, book: Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, price_cents, stock_quantity, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                price_cents = EXCLUDED.price_cents,
                stock_quantity = EXCLUDED.stock_quantity,
                status = EXCLUDED.status
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.title)
        .bind(book.price.cents())
        .bind(to_i32(book.stock_quantity)?)
        .bind(book.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn low_stock(&self, threshold: u32) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE stock_quantity < $1 AND status <> $2 ORDER BY stock_quantity ASC, title ASC"
        ))
        .bind(i64::from(threshold))
        .bind(BookStatus::Discontinued.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_book).collect()
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            "SELECT user_id, book_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY added_at ASC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CartLine {
                    user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                    book_id: BookId::from_uuid(row.try_get::<Uuid, _>("book_id")?),
                    quantity: to_u32(row.try_get("quantity")?, "quantity")?,
                })
            })
            .collect()
    }

    async fn set_cart_line(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<()> {
        if quantity == 0 {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND book_id = $2")
                .bind(user_id.as_uuid())
                .bind(book_id.as_uuid())
                .execute(&self.pool)
                .await?;
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, book_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, book_id) DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(book_id.as_uuid())
        .bind(to_i32(quantity)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>> {
        let Some(row) = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let order = row_to_order(row)?;

        let items = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(row_to_item)
        .collect::<Result<Vec<_>>>()?;

        let payment = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(row_to_payment)
        .transpose()?;

        Ok(Some(OrderDetails {
            order,
            items,
            payment,
        }))
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY order_date DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY order_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn query_ledger(&self, query: LedgerQuery) -> Result<Vec<InventoryLogEntry>> {
        let mut sql = format!("SELECT {LOG_COLUMNS} FROM inventory_log WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.book_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND book_id = ${param_count}"));
        }
        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND logged_at >= ${param_count}"));
        }
        if query.to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND logged_at <= ${param_count}"));
        }

        sql.push_str(" ORDER BY logged_at DESC, id DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(book_id) = query.book_id {
            sqlx_query = sqlx_query.bind(book_id.as_uuid());
        }
        if let Some(user_id) = query.user_id {
            sqlx_query = sqlx_query.bind(user_id.as_uuid());
        }
        if let Some(from) = query.from {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.to {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_log).collect()
    }
}

/// Unit of work wrapping a PostgreSQL transaction.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn find_book(&mut self, book_id: BookId) -> Result<Option<Book>> {
        sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(book_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(row_to_book)
            .transpose()
    }

    async fn adjust_stock(&mut self, book_id: BookId, delta: i32) -> Result<StockAdjustment> {
        // Conditional update: the row lock taken by UPDATE makes the check and
        // the write a single step for concurrent transactions.
        let updated = sqlx::query(&format!(
            r#"
            UPDATE books SET stock_quantity = stock_quantity + $2
            WHERE id = $1 AND stock_quantity + $2 >= 0
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(book_id.as_uuid())
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = updated {
            return Ok(StockAdjustment::Applied(row_to_book(row)?));
        }

        let available: Option<i32> =
            sqlx::query_scalar("SELECT stock_quantity FROM books WHERE id = $1")
                .bind(book_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        match available {
            Some(q) => {
                tracing::debug!(%book_id, delta, available = q, "conditional stock update refused");
                Ok(StockAdjustment::Insufficient {
                    available: to_u32(q, "stock_quantity")?,
                })
            }
            None => Ok(StockAdjustment::Missing),
        }
    }

    async fn set_book_status(&mut self, book_id: BookId, status: BookStatus) -> Result<()> {
        let result = sqlx::query("UPDATE books SET status = $2 WHERE id = $1")
            .bind(book_id.as_uuid())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                entity: "book",
                id: book_id.to_string(),
            });
        }
        Ok(())
    }

    async fn append_log(&mut self, entry: NewLogEntry) -> Result<InventoryLogEntry> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO inventory_log (book_id, user_id, quantity_change, quantity_after_change, reason, notes, logged_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(entry.book_id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.quantity_change)
        .bind(to_i32(entry.quantity_after_change)?)
        .bind(entry.reason.as_str())
        .bind(entry.notes.as_deref())
        .bind(entry.logged_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(InventoryLogEntry::from_new(id, entry))
    }

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, order_number, status, total_cents, shipping_address, shipping_phone, note, order_date, shipped_date, delivered_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.status.as_str())
        .bind(order.total_amount.cents())
        .bind(&order.shipping.address)
        .bind(&order.shipping.phone)
        .bind(order.shipping.note.as_deref())
        .bind(order.order_date)
        .bind(order.shipped_date)
        .bind(order.delivered_date)
        .execute(&mut *self.tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, book_id, quantity, price_at_order_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(item.order_id.as_uuid())
            .bind(item.book_id.as_uuid())
            .bind(to_i32(item.quantity)?)
            .bind(item.price_at_order.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(row_to_order)
        .transpose()
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_item).collect()
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, shipped_date = $3, delivered_date = $4 WHERE id = $1",
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.shipped_date)
        .bind(order.delivered_date)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                entity: "order",
                id: order.id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (order_id, amount_cents, method, status, transaction_id, failure_reason, created_at, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.order_id.as_uuid())
        .bind(payment.amount.cents())
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.transaction_id.as_deref())
        .bind(payment.failure_reason.as_deref())
        .bind(payment.created_at)
        .bind(payment.processed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_payment(&mut self, order_id: OrderId) -> Result<Option<Payment>> {
        sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(row_to_payment)
        .transpose()
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, transaction_id = $3, failure_reason = $4, processed_at = $5
            WHERE order_id = $1
            "#,
        )
        .bind(payment.order_id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.transaction_id.as_deref())
        .bind(payment.failure_reason.as_deref())
        .bind(payment.processed_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                entity: "payment",
                id: payment.order_id.to_string(),
            });
        }
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        tracing::debug!("rolling back unit of work");
        self.tx.rollback().await?;
        Ok(())
    }
}
