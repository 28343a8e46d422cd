use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is not connected")]
    NotConnected,

    #[error("Transport misconfigured: {0}")]
    Misconfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Write rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

impl TransportError {
    /// Whether retrying the same batch could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::NotConnected => false,
            TransportError::Misconfigured(_) => false,
            TransportError::Http(_) => true,
            TransportError::Rejected { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}
