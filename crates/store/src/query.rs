use chrono::{DateTime, Utc};
use domain::{BookId, InventoryLogEntry, UserId};

/// Filter for reading the inventory ledger.
///
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerQuery {
    /// Filter by book.
    pub book_id: Option<BookId>,

    /// Filter by the actor responsible for the change.
    pub user_id: Option<UserId>,

    /// Entries logged at or after this instant.
    pub from: Option<DateTime<Utc>>,

    /// Entries logged at or before this instant.
    pub to: Option<DateTime<Utc>>,

    /// Maximum number of entries to return.
    pub limit: Option<usize>,

    /// Number of entries to skip.
    pub offset: Option<usize>,
}

impl LedgerQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a single book.
    pub fn for_book(book_id: BookId) -> Self {
        Self {
            book_id: Some(book_id),
            ..Default::default()
        }
    }

    pub fn book_id(mut self, book_id: BookId) -> Self {
        self.book_id = Some(book_id);
        self
    }

    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `entry` passes every filter except paging.
    pub fn matches(&self, entry: &InventoryLogEntry) -> bool {
        if let Some(book_id) = self.book_id
            && entry.book_id != book_id
        {
            return false;
        }
        if let Some(user_id) = self.user_id
            && entry.user_id != user_id
        {
            return false;
        }
        if let Some(from) = self.from
            && entry.logged_at < from
        {
            return false;
        }
        if let Some(to) = self.to
            && entry.logged_at > to
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::StockReason;

    fn entry(book_id: BookId, user_id: UserId, logged_at: DateTime<Utc>) -> InventoryLogEntry {
        InventoryLogEntry {
            id: 1,
            book_id,
            user_id,
            quantity_change: -1,
            quantity_after_change: 4,
            reason: StockReason::OrderPlaced,
            notes: None,
            logged_at,
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let e = entry(BookId::new(), UserId::new(), Utc::now());
        assert!(LedgerQuery::new().matches(&e));
    }

    #[test]
    fn test_book_and_user_filters() {
        let book = BookId::new();
        let user = UserId::new();
        let e = entry(book, user, Utc::now());

        assert!(LedgerQuery::for_book(book).user_id(user).matches(&e));
        assert!(!LedgerQuery::for_book(BookId::new()).matches(&e));
        assert!(!LedgerQuery::new().user_id(UserId::new()).matches(&e));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let at = Utc::now();
        let e = entry(BookId::new(), UserId::new(), at);

        assert!(LedgerQuery::new().from(at).to(at).matches(&e));
        assert!(
            !LedgerQuery::new()
                .from(at + chrono::Duration::seconds(1))
                .matches(&e)
        );
        assert!(
            !LedgerQuery::new()
                .to(at - chrono::Duration::seconds(1))
                .matches(&e)
        );
    }
}
