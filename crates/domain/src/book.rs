//! Book stock as seen by the fulfillment engine.
//!
//! The catalog owns books; this engine only reads title and price and
//! mutates `stock_quantity` (and, as a consequence, `status`).

use common::BookId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// Sales status of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BookStatus {
    #[default]
    Available,
    OutOfStock,
    Discontinued,
    ComingSoon,
}

impl BookStatus {
    /// Returns the status a book must have once its stock becomes `new_quantity`.
    ///
    /// Reaching zero forces `OutOfStock` unless the book is `Discontinued`;
    /// positive stock lifts `OutOfStock` back to `Available`. Every other
    /// status is left alone.
    pub fn after_stock_change(self, new_quantity: u32) -> BookStatus {
        match (self, new_quantity) {
            (BookStatus::Discontinued, _) => BookStatus::Discontinued,
            (_, 0) => BookStatus::OutOfStock,
            (BookStatus::OutOfStock, _) => BookStatus::Available,
            (status, _) => status,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::OutOfStock => "OutOfStock",
            BookStatus::Discontinued => "Discontinued",
            BookStatus::ComingSoon => "ComingSoon",
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(BookStatus::Available),
            "OutOfStock" => Ok(BookStatus::OutOfStock),
            "Discontinued" => Ok(BookStatus::Discontinued),
            "ComingSoon" => Ok(BookStatus::ComingSoon),
            other => Err(DomainError::UnknownVariant {
                kind: "book status",
                value: other.to_string(),
            }),
        }
    }
}

/// A book with its current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    /// Current list price; copied into order items at checkout.
    pub price: Money,
    pub stock_quantity: u32,
    pub status: BookStatus,
}

impl Book {
    /// Creates a book whose status is consistent with its initial stock.
    pub fn new(title: impl Into<String>, price: Money, stock_quantity: u32) -> Self {
        Self {
            id: BookId::new(),
            title: title.into(),
            price,
            stock_quantity,
            status: BookStatus::Available.after_stock_change(stock_quantity),
        }
    }

    /// Replaces the status, then re-applies the stock rule.
    pub fn with_status(mut self, status: BookStatus) -> Self {
        self.status = status.after_stock_change(self.stock_quantity);
        self
    }

    /// Returns true if `requested` units can be taken from current stock.
    pub fn has_stock_for(&self, requested: u32) -> bool {
        self.stock_quantity >= requested
    }
}
