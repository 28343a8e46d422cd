#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    InvalidPayload,

    #[error("Unknown queue category: {0}")]
    UnknownCategory(String),
}
