use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::configs::settings::{Influx, Node};
use crate::errors::NodeError;
use crate::models::{parse_timestamp, wire_fields, Category, Sample};
use crate::services::transport::{Point, TransportWriter};
use crate::services::PersistentQueue;

/// Bounded exponential backoff between transport attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Pause after failed attempt `attempt` (0-based) before the next one.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub measurement_env: String,
    pub measurement_radar: String,
    /// Max samples per transport call
    pub batch_size: usize,
    /// Informational, the scheduler drives flushing
    pub flush_interval: Duration,
    pub room: Option<String>,
    pub device: Option<String>,
    pub retry: RetryPolicy,
}

impl PublisherConfig {
    pub fn from_settings(influx: &Influx, node: &Node) -> Self {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        Self {
            measurement_env: influx.measurement_env.clone(),
            measurement_radar: influx.measurement_radar.clone(),
            batch_size: influx.batch_size,
            flush_interval: Duration::from_secs(influx.flush_interval_s),
            room: non_empty(&influx.tags.room).or_else(|| Some(node.room.clone())),
            device: non_empty(&influx.tags.device).or_else(|| Some(node.device.clone())),
            retry: RetryPolicy {
                attempts: influx.retry_attempts,
                base_delay: Duration::from_millis(influx.retry_base_delay_ms),
            },
        }
    }

    fn validate(&self) -> Result<(), NodeError> {
        if self.batch_size == 0 {
            return Err(NodeError::InvalidSetting("batch_size must be positive".into()));
        }
        if self.retry.attempts == 0 {
            return Err(NodeError::InvalidSetting("retry attempts must be positive".into()));
        }
        if self.measurement_env.is_empty() || self.measurement_radar.is_empty() {
            return Err(NodeError::InvalidSetting("measurement names must not be empty".into()));
        }

        Ok(())
    }
}

/// Store-and-forward publisher.
///
/// Samples are buffered in memory per category and sent in batches on
/// [`flush`](Self::flush). A batch that still fails after the retry policy is
/// demoted to the durable queue together with every sample behind it, and the
/// durable queue is replayed at the end of every flush. Delivery is
/// at-least-once.
///
/// `flush` must only be driven from a single task at a time; enqueueing is safe
/// from any number of tasks.
pub struct BufferedPublisher {
    config: PublisherConfig,
    env_buffer: Mutex<Vec<Sample>>,
    radar_buffer: Mutex<Vec<Sample>>,
    queue: Arc<dyn PersistentQueue>,
    transport: Arc<dyn TransportWriter>,
}

impl BufferedPublisher {
    pub fn new(
        config: PublisherConfig,
        queue: Arc<dyn PersistentQueue>,
        transport: Arc<dyn TransportWriter>,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        Ok(Self {
            config,
            env_buffer: Mutex::new(Vec::new()),
            radar_buffer: Mutex::new(Vec::new()),
            queue,
            transport,
        })
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub async fn enqueue_env(&self, sample: Sample) {
        self.env_buffer.lock().await.push(sample);
    }

    pub async fn enqueue_radar(&self, sample: Sample) {
        self.radar_buffer.lock().await.push(sample);
    }

    /// Samples held in memory across both categories.
    pub async fn pending_len(&self) -> usize {
        self.env_buffer.lock().await.len() + self.radar_buffer.lock().await.len()
    }

    pub async fn flush(&self) {
        for category in Category::ALL {
            self.flush_buffer(category).await;
        }
        for category in Category::ALL {
            self.replay_pending(category).await;
        }
    }

    fn buffer(&self, category: Category) -> &Mutex<Vec<Sample>> {
        match category {
            Category::Env => &self.env_buffer,
            Category::Radar => &self.radar_buffer,
        }
    }

    fn measurement(&self, category: Category) -> &str {
        match category {
            Category::Env => &self.config.measurement_env,
            Category::Radar => &self.config.measurement_radar,
        }
    }

    fn point_from_sample(&self, measurement: &str, sample: &Sample) -> Point {
        let sample_tag = |key: &str| sample.get(key).and_then(Value::as_str).map(str::to_string);

        let mut tags = BTreeMap::new();
        if let Some(room) = self.config.room.clone().or_else(|| sample_tag("room")) {
            tags.insert(String::from("room"), room);
        }
        if let Some(device) = self.config.device.clone().or_else(|| sample_tag("device")) {
            tags.insert(String::from("device"), device);
        }

        Point {
            measurement: measurement.to_string(),
            tags,
            fields: wire_fields(sample),
            time: sample
                .get("timestamp")
                .and_then(Value::as_str)
                .and_then(parse_timestamp),
        }
    }

    async fn write_with_retry(&self, measurement: &str, samples: &[Sample]) -> bool {
        if !self.transport.is_connected() {
            return false;
        }

        let points: Vec<Point> = samples
            .iter()
            .map(|sample| self.point_from_sample(measurement, sample))
            .collect();
        let attempts = self.config.retry.attempts;

        for attempt in 0..attempts {
            match self.transport.write(measurement, &points).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        "write to {} failed (attempt {}/{}): {}",
                        measurement,
                        attempt + 1,
                        attempts,
                        e
                    );
                    if !e.is_retryable() {
                        break;
                    }
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.config.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        false
    }

    async fn flush_buffer(&self, category: Category) {
        let mut samples = std::mem::take(&mut *self.buffer(category).lock().await);
        if samples.is_empty() {
            return;
        }

        let measurement = self.measurement(category);
        let mut delivered = 0;
        for batch in samples.chunks(self.config.batch_size) {
            if !self.write_with_retry(measurement, batch).await {
                break;
            }
            delivered += batch.len();
        }

        if delivered == samples.len() {
            tracing::debug!("published {} {} samples", delivered, category);
            return;
        }

        let undelivered = samples.split_off(delivered);
        match self.queue.enqueue_all(category, &undelivered).await {
            Ok(_) => {
                tracing::warn!(
                    "stored {} {} samples for retry in local queue",
                    undelivered.len(),
                    category
                );
            }
            Err(e) => {
                tracing::error!(
                    "failed to queue {} {} samples, keeping them in memory: {}",
                    undelivered.len(),
                    category,
                    e
                );
                let mut buffer = self.buffer(category).lock().await;
                let newer = std::mem::replace(&mut *buffer, undelivered);
                buffer.extend(newer);
            }
        }
    }

    async fn replay_pending(&self, category: Category) {
        let measurement = self.measurement(category);

        loop {
            let entries = match self.queue.dequeue(category, self.config.batch_size).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::error!("failed to read queued {} samples: {}", category, e);
                    break;
                }
            };
            if entries.is_empty() {
                break;
            }

            let ids: Vec<_> = entries.iter().map(|entry| entry.id).collect();
            let samples: Vec<Sample> = entries.into_iter().map(|entry| entry.payload).collect();

            if !self.write_with_retry(measurement, &samples).await {
                tracing::warn!("retry for queued {} samples failed; will retry later", category);
                break;
            }

            if let Err(e) = self.queue.delete(&ids).await {
                tracing::error!("failed to delete {} replayed {} samples: {}", ids.len(), category, e);
                break;
            }

            tracing::info!("replayed {} queued {} samples", ids.len(), category);
        }
    }
}
