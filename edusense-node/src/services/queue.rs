use async_trait::async_trait;

use crate::errors::StorageError;
use crate::models::{Category, PendingEntry, PendingId, Sample};

/// Durable store-and-forward queue used when the time-series backend is down.
#[async_trait]
pub trait PersistentQueue: Send + Sync {
    async fn enqueue(&self, category: Category, payload: &Sample) -> Result<PendingId, StorageError>;

    /// Store every payload or none of them.
    async fn enqueue_all(
        &self,
        category: Category,
        payloads: &[Sample],
    ) -> Result<Vec<PendingId>, StorageError>;

    /// Oldest first, at most `limit` entries.
    async fn dequeue(&self, category: Category, limit: usize) -> Result<Vec<PendingEntry>, StorageError>;

    /// Deleting an absent id is a no-op.
    async fn delete(&self, ids: &[PendingId]) -> Result<(), StorageError>;

    /// Number of entries waiting for replay.
    async fn len(&self, category: Category) -> Result<u64, StorageError>;
}
