#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid reading from {sensor}: {reason}")]
    InvalidReading { sensor: &'static str, reason: String },

    #[error("Invalid port name: {0}")]
    InvalidPort(String),
}
