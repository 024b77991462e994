use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A row did not match its typed model.
    #[error("Row decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured endpoint cannot be used as a base URL.
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    /// A blob already exists under this key.
    #[error("Blob key already taken: {0}")]
    Conflict(String),

    /// Backend-specific failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
