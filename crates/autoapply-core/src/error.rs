use thiserror::Error;

/// Application-wide error types for autoapply.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required setting is missing or has an invalid value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP request could not be built or sent.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Upstream answered with an unexpected status code.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// The session cookie string carries no CSRF token.
    #[error("CSRF token not found in session cookies")]
    MissingCsrf,

    /// Response body could not be decoded (decompression or charset).
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Ledger operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppError {
    /// Status code used when a failure is reported as a submission outcome.
    ///
    /// Transport-level failures map to the 500 sentinel, a missing token
    /// to 400.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::HttpStatus { status, .. } => *status,
            AppError::MissingCsrf => 400,
            _ => 500,
        }
    }
}
