use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CartDocument, CartRepository, CartStoreError, Result, UserId};

#[derive(Default)]
struct Faults {
    unavailable: AtomicBool,
    writes_failing: AtomicBool,
}

/// In-memory cart repository.
///
/// Behaves like the PostgreSQL implementation, and can be told to fail so the
/// storage-fault paths of the engine can be exercised.
#[derive(Clone, Default)]
pub struct InMemoryCartRepository {
    documents: Arc<RwLock<HashMap<UserId, CartDocument>>>,
    faults: Arc<Faults>,
    writes: Arc<AtomicU64>,
}

impl InMemoryCartRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Returns true if a document is stored for the user.
    pub async fn contains(&self, user_id: &UserId) -> bool {
        self.documents.read().await.contains_key(user_id)
    }

    /// Returns the stored document without creating one.
    pub async fn peek(&self, user_id: &UserId) -> Option<CartDocument> {
        self.documents.read().await.get(user_id).cloned()
    }

    /// Number of successful writes (creates, saves, removals).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every operation fail with [`CartStoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes saves and clears fail while fetches of existing documents work.
    pub fn set_writes_failing(&self, failing: bool) {
        self.faults.writes_failing.store(failing, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<()> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(CartStoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        self.check_reachable()?;
        if self.faults.writes_failing.load(Ordering::SeqCst) {
            return Err(CartStoreError::Unavailable(
                "in-memory store rejecting writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn fetch(&self, user_id: &UserId) -> Result<CartDocument> {
        self.check_reachable()?;

        if let Some(doc) = self.documents.read().await.get(user_id) {
            return Ok(doc.clone());
        }

        self.check_writable()?;

        // Re-check under the write lock so a concurrent save is never
        // clobbered by the implicit create.
        let mut documents = self.documents.write().await;
        if let Some(doc) = documents.get(user_id) {
            return Ok(doc.clone());
        }

        let doc = CartDocument::empty(user_id.clone());
        documents.insert(user_id.clone(), doc.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(%user_id, "created empty cart");

        Ok(doc)
    }

    async fn save(&self, document: &mut CartDocument) -> Result<()> {
        self.check_writable()?;

        document.touch();
        self.documents
            .write()
            .await
            .insert(document.user_id.clone(), document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    async fn clear(&self, user_id: &UserId) -> Result<()> {
        self.check_writable()?;

        if self.documents.write().await.remove(user_id).is_some() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }

        Ok(())
    }
}
