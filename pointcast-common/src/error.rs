// File: pointcast-common/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No credential / no trigger mapping. Callers usually treat this as
    /// "silently skip" rather than surfacing it to the viewer.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Refresh token invalid or revoked. Requires the streamer to
    /// reconnect their account; never retried automatically.
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// Upstream network failure (TTS or platform API). Degrade
    /// gracefully and log; the pipeline keeps moving.
    #[error("Transient upstream error: {0}")]
    Transient(String),

    /// Plan-tier usage limit reached. Surfaced to the streamer as an
    /// "upgrade your plan" response, never retried.
    #[error("Quota exceeded for {resource} (limit {limit})")]
    QuotaExceeded { resource: String, limit: i64 },

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl Error {
    pub fn quota(resource: &str, limit: i64) -> Self {
        Error::QuotaExceeded {
            resource: resource.to_string(),
            limit,
        }
    }
}
