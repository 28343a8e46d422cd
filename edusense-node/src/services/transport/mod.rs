mod influx;
mod line_protocol;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::configs::Influx;
use crate::errors::TransportError;
use crate::models::Sample;

pub use influx::{InfluxEndpoint, InfluxWriter};
pub use line_protocol::encode_points;

/// One time-series point ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: Sample,
    /// `None` lets the backend stamp the point on arrival
    pub time: Option<OffsetDateTime>,
}

/// Remote time-series write endpoint.
#[async_trait]
pub trait TransportWriter: Send + Sync {
    async fn write(&self, measurement: &str, points: &[Point]) -> Result<(), TransportError>;

    /// `false` when the writer could not be set up and every write fails.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Stand-in used when the real writer cannot be constructed.
pub struct DisconnectedWriter {
    reason: String,
}

impl DisconnectedWriter {
    pub fn new(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::error!("time-series transport unavailable, samples will be queued locally: {}", reason);

        Self { reason }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl TransportWriter for DisconnectedWriter {
    async fn write(&self, _measurement: &str, _points: &[Point]) -> Result<(), TransportError> {
        Err(TransportError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Build the configured writer, degrading to [`DisconnectedWriter`] on failure.
pub fn connect(influx: &Influx) -> Arc<dyn TransportWriter> {
    match InfluxWriter::from_settings(influx) {
        Ok(writer) => {
            tracing::info!("InfluxDB writer ready for {}", writer.endpoint().describe());
            Arc::new(writer)
        }
        Err(e) => Arc::new(DisconnectedWriter::new(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnected_writer_always_fails() {
        let writer = DisconnectedWriter::new("missing token");

        assert!(!writer.is_connected());
        assert_eq!(writer.reason(), "missing token");
        assert!(matches!(
            writer.write("env_sensors", &[]).await,
            Err(TransportError::NotConnected)
        ));
    }
}
