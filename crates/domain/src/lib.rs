//! Domain model for order fulfillment and inventory consistency.
//!
//! This crate is pure: no I/O, no async. It provides:
//! - `Money` for point-in-time prices and order totals
//! - `Book` and the stock-driven `BookStatus` rule
//! - `Order`, `OrderItem` and the `OrderStatus` state machine
//! - `Payment` with its terminal outcome
//! - `InventoryLogEntry` and the closed `StockReason` tag set

pub mod book;
pub mod cart;
pub mod error;
pub mod inventory;
pub mod money;
pub mod order;
pub mod payment;

pub use book::{Book, BookStatus};
pub use cart::CartLine;
pub use common::{BookId, OrderId, UserId};
pub use error::DomainError;
pub use inventory::{InventoryLogEntry, NewLogEntry, StockReason};
pub use money::Money;
pub use order::{
    CancelledBy, Order, OrderDetails, OrderItem, OrderLine, OrderNumber, OrderStatus, ShippingInfo,
};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
