use thiserror::Error;

/// Errors that can occur when talking to the cart store.
///
/// A missing document is never an error: the repository turns it into an
/// implicit empty cart (on fetch) or a no-op (on clear). Every variant here
/// means the store could not serve the request.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// The store rejected or could not serve the request.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cart store operations.
pub type Result<T> = std::result::Result<T, CartStoreError>;
