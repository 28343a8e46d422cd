use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Sqlite, Transaction};

use crate::configs::Storage;
use crate::errors::StorageError;
use crate::models::{Category, PendingEntry, PendingId, Sample};
use crate::services::PersistentQueue;

/// `publish_queue` backed implementation of the durable queue.
pub struct PendingRepository {
    storage: Arc<Storage>,
}

impl PendingRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn insert(
        category: Category,
        payload: &Sample,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<PendingId, StorageError> {
        let body = serde_json::to_string(payload)?;

        let id = sqlx::query("INSERT INTO publish_queue (category, payload) VALUES ($1, $2)")
            .bind(category.as_str())
            .bind(body)
            .execute(&mut **transaction)
            .await?
            .last_insert_rowid();

        Ok(id)
    }

    fn parse_row(id: PendingId, category: &str, payload: &str) -> Result<PendingEntry, StorageError> {
        let payload = match serde_json::from_str::<Value>(payload)? {
            Value::Object(map) => map,
            _ => return Err(StorageError::InvalidPayload),
        };

        Ok(PendingEntry {
            id,
            category: category.parse()?,
            payload,
        })
    }
}

#[async_trait]
impl PersistentQueue for PendingRepository {
    async fn enqueue(&self, category: Category, payload: &Sample) -> Result<PendingId, StorageError> {
        let mut transaction = self.storage.get_pool().begin().await?;
        let id = Self::insert(category, payload, &mut transaction).await?;
        transaction.commit().await?;

        Ok(id)
    }

    async fn enqueue_all(
        &self,
        category: Category,
        payloads: &[Sample],
    ) -> Result<Vec<PendingId>, StorageError> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let mut transaction = self.storage.get_pool().begin().await?;
        let mut ids = Vec::with_capacity(payloads.len());
        for payload in payloads {
            ids.push(Self::insert(category, payload, &mut transaction).await?);
        }
        transaction.commit().await?;

        Ok(ids)
    }

    async fn dequeue(&self, category: Category, limit: usize) -> Result<Vec<PendingEntry>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            r#"
            SELECT id, category, payload FROM publish_queue
            WHERE category = $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(category.as_str())
        .bind(limit as i64)
        .fetch_all(self.storage.get_pool())
        .await?;

        rows.iter()
            .map(|(id, category, payload)| Self::parse_row(*id, category, payload))
            .collect()
    }

    async fn delete(&self, ids: &[PendingId]) -> Result<(), StorageError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut transaction = self.storage.get_pool().begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM publish_queue WHERE id = $1")
                .bind(id)
                .execute(&mut *transaction)
                .await?;
        }
        transaction.commit().await?;

        Ok(())
    }

    async fn len(&self, category: Category) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM publish_queue WHERE category = $1")
            .bind(category.as_str())
            .fetch_one(self.storage.get_pool())
            .await?;

        Ok(count as u64)
    }
}
