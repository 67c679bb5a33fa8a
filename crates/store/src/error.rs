use thiserror::Error;

/// Errors that can occur when talking to the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back to the domain model.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A row the unit of work relies on has disappeared.
    #[error("Missing {entity}: {id}")]
    Missing { entity: &'static str, id: String },
}

impl From<domain::DomainError> for StoreError {
    fn from(e: domain::DomainError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
