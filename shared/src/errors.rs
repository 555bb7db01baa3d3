/// Unified error types for Model Fetch.
use std::path::PathBuf;
use thiserror::Error;

/// Boxed transport error carried by [`FetchError::Transfer`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for a download attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server could not report the artifact size.
    #[error("Could not get remote file size: {0}")]
    RemoteMetadata(String),

    /// Network or transport failure while streaming the body.
    #[error("Download failed: {0}")]
    Transfer(#[source] BoxError),

    /// The stream ended but the byte count does not match the remote size.
    #[error("Download incomplete: {downloaded} != {expected}")]
    IncompleteTransfer { downloaded: u64, expected: u64 },

    /// Post-download size or checksum check failed. Nothing is deleted.
    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("File not downloaded: {}", .0.display())]
    NotDownloaded(PathBuf),

    #[error("Unsupported checksum algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unknown model: {key}. Available: {available}")]
    UnknownModel { key: String, available: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Wrap a transport-level failure.
    pub fn transfer(err: impl Into<BoxError>) -> Self {
        FetchError::Transfer(err.into())
    }

    /// Whether a later invocation with resume enabled can pick up where this one stopped.
    pub fn is_resumable(&self) -> bool {
        matches!(self,
            FetchError::Transfer(_)
            | FetchError::IncompleteTransfer { .. }
            | FetchError::Io(_)
        )
    }
}

/// Result type alias for Model Fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;
