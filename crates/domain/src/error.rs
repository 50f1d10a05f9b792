//! Domain error types.

use cart_store::CartStoreError;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The cart store could not serve the request.
    #[error("Cart store error: {0}")]
    Store(#[from] CartStoreError),
}
