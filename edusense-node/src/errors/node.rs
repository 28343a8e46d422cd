use edusense_analyser::OccupancyError;

use super::{SensorError, StorageError, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Occupancy error: {0}")]
    Occupancy(#[from] OccupancyError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for NodeError {
    fn from(error: sqlx::Error) -> Self {
        NodeError::Storage(StorageError::Database(error))
    }
}
