use thiserror::Error;

#[derive(Error, Debug)]
pub enum PresenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Presence service returned status {0}")]
    Status(u16),

    #[error("Malformed presence payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid presence URL: {0}")]
    InvalidUrl(String),
}
