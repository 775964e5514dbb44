use thiserror::Error;

/// Application-wide error types for wikiroster.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page or section).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// API responded but the payload did not have the expected shape.
    #[error("API format error for page '{page}': {message}")]
    ApiFormat { page: String, message: String },

    /// Cache file exists but could not be parsed. Fatal: continuing
    /// would silently re-fetch and overwrite prior work.
    #[error("Cache corrupt at {path}: {message}")]
    CacheCorrupt { path: String, message: String },

    /// Writing the cache to disk failed. Fatal: the at-most-once fetch
    /// guarantee depends on every insert being durable.
    #[error("Cache persist error: {0}")]
    Persist(String),

    /// Record store operation failed.
    #[error("Store error: {0}")]
    StoreError(String),

    /// Configuration could not be read or parsed.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }

    /// Returns true if the ingestion run must stop rather than move on
    /// to the next page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::CacheCorrupt { .. } | AppError::Persist(_))
    }
}
