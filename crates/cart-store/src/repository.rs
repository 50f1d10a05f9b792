use async_trait::async_trait;

use crate::{CartDocument, Result, UserId};

/// Persistence contract over a single-document-per-user store.
///
/// Implementations must be thread-safe; the request path and the event
/// ingestion loop share one instance without extra synchronization. Each call
/// is independent: there is no transaction spanning a fetch and a later save.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Returns the cart for `user_id`, creating and persisting an empty one
    /// if none exists. Not read-only.
    async fn fetch(&self, user_id: &UserId) -> Result<CartDocument>;

    /// Overwrites the document keyed by `document.user_id`.
    ///
    /// Stamps `last_updated_at` as part of the write; on success the
    /// caller's copy carries the persisted stamp, on failure it is left
    /// untouched.
    async fn save(&self, document: &mut CartDocument) -> Result<()>;

    /// Removes the document for `user_id`. Missing documents are a no-op.
    async fn clear(&self, user_id: &UserId) -> Result<()>;
}
