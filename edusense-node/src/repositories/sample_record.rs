use std::sync::Arc;

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::configs::Storage;
use crate::errors::StorageError;
use crate::models::{format_timestamp, EnvRecord, RadarRecord, Sample};

/// Local archive of every reading, independent of publishing.
pub struct SampleRecordRepository {
    storage: Arc<Storage>,
}

impl SampleRecordRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

fn number(sample: &Sample, key: &str) -> Option<f64> {
    sample.get(key).and_then(Value::as_f64)
}

fn text(sample: &Sample, key: &str) -> Option<String> {
    sample.get(key).and_then(Value::as_str).map(str::to_string)
}

fn timestamp(sample: &Sample) -> String {
    text(sample, "timestamp").unwrap_or_else(|| format_timestamp(OffsetDateTime::now_utc()))
}

impl SampleRecordRepository {
    pub async fn insert_env(&self, sample: &Sample) -> Result<i64, StorageError> {
        let id = sqlx::query(
            r#"
            INSERT INTO env_samples (
                ts, temperature_c, humidity_pct, light_adc,
                sound_adc, sound_digital, gas_adc, room, device
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(timestamp(sample))
        .bind(number(sample, "temperature_c"))
        .bind(number(sample, "humidity_pct"))
        .bind(number(sample, "light_adc"))
        .bind(number(sample, "sound_adc"))
        .bind(sample.get("sound_digital").and_then(Value::as_bool))
        .bind(number(sample, "gas_adc"))
        .bind(text(sample, "room"))
        .bind(text(sample, "device"))
        .execute(self.storage.get_pool())
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn insert_radar(&self, sample: &Sample) -> Result<i64, StorageError> {
        let sectors: Sample = sample
            .iter()
            .filter(|(key, _)| key.starts_with("sector_"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let id = sqlx::query(
            r#"
            INSERT INTO radar_samples (
                ts, sector_payload, min_distance_m, objects_count, room, device
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(timestamp(sample))
        .bind(serde_json::to_string(&sectors)?)
        .bind(number(sample, "min_distance_m"))
        .bind(sample.get("objects_count").and_then(Value::as_i64))
        .bind(text(sample, "room"))
        .bind(text(sample, "device"))
        .execute(self.storage.get_pool())
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn find_latest_env(&self, limit: i64) -> Result<Vec<EnvRecord>, StorageError> {
        let records = sqlx::query_as("SELECT * FROM env_samples ORDER BY id DESC LIMIT $1")
            .bind(limit)
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(records)
    }

    pub async fn find_latest_radar(&self, limit: i64) -> Result<Vec<RadarRecord>, StorageError> {
        let records = sqlx::query_as("SELECT * FROM radar_samples ORDER BY id DESC LIMIT $1")
            .bind(limit)
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(records)
    }

    /// Delete archived rows older than `retention_days` before `now`.
    pub async fn purge_old(&self, retention_days: u32, now: OffsetDateTime) -> Result<u64, StorageError> {
        let cutoff = format_timestamp(now - Duration::days(retention_days as i64));

        let mut transaction = self.storage.get_pool().begin().await?;
        let env = sqlx::query("DELETE FROM env_samples WHERE ts < $1")
            .bind(&cutoff)
            .execute(&mut *transaction)
            .await?
            .rows_affected();
        let radar = sqlx::query("DELETE FROM radar_samples WHERE ts < $1")
            .bind(&cutoff)
            .execute(&mut *transaction)
            .await?
            .rows_affected();
        transaction.commit().await?;

        Ok(env + radar)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use crate::configs::{Database, SchemaManager};
    use crate::models::build_sample;

    use super::*;

    async fn setup_test_db() -> Arc<Storage> {
        Arc::new(
            Storage::new(
                Database {
                    url: String::from("sqlite::memory:"),
                    clean_start: true,
                    retention_days: 90,
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        )
    }

    fn fields(value: Value) -> Sample {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_env() {
        let storage = setup_test_db().await;
        let repo = SampleRecordRepository::new(storage);

        let sample = build_sample(
            "lab",
            "raspi",
            fields(json!({ "sound_adc": 431, "sound_digital": true })),
            datetime!(2024-03-01 06:15:00 UTC),
        );
        repo.insert_env(&sample).await.unwrap();

        let records = repo.find_latest_env(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ts, "2024-03-01T06:15:00Z");
        assert_eq!(records[0].sound_adc, Some(431.0));
        assert_eq!(records[0].sound_digital, Some(true));
        assert_eq!(records[0].temperature_c, None);
        assert_eq!(records[0].room.as_deref(), Some("lab"));
    }

    #[tokio::test]
    async fn test_insert_radar_keeps_sector_fields() {
        let storage = setup_test_db().await;
        let repo = SampleRecordRepository::new(storage);

        let sample = build_sample(
            "lab",
            "raspi",
            fields(json!({
                "sector_0_pct": 50.0,
                "sector_1_pct": 0.0,
                "objects_count": 1,
                "min_distance_m": null,
            })),
            datetime!(2024-03-01 06:15:00 UTC),
        );
        repo.insert_radar(&sample).await.unwrap();

        let records = repo.find_latest_radar(1).await.unwrap();
        let sectors: Value = serde_json::from_str(&records[0].sector_payload).unwrap();
        assert_eq!(sectors, json!({ "sector_0_pct": 50.0, "sector_1_pct": 0.0 }));
        assert_eq!(records[0].objects_count, Some(1));
        assert_eq!(records[0].min_distance_m, None);
    }

    #[tokio::test]
    async fn test_purge_old() {
        let storage = setup_test_db().await;
        let repo = SampleRecordRepository::new(storage);
        let now = datetime!(2024-06-01 00:00:00 UTC);

        for time in [now - Duration::days(120), now - Duration::days(10)] {
            let sample = build_sample("lab", "raspi", fields(json!({ "gas_adc": 300 })), time);
            repo.insert_env(&sample).await.unwrap();
        }

        assert_eq!(repo.purge_old(90, now).await.unwrap(), 1);
        assert_eq!(repo.find_latest_env(10).await.unwrap().len(), 1);
    }
}
