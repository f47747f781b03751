use thiserror::Error;

/// Result type for zipstream operations
pub type Result<T> = std::result::Result<T, ZipStreamError>;

/// Unified error type for archive production.
///
/// Every variant carries owned data so the enum is `Clone`: once streaming
/// fails the producer stores the error and returns the same value from every
/// subsequent `read` call until it is discarded.
#[derive(Debug, Clone, Error)]
pub enum ZipStreamError {
    // Registration errors
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(String),

    // Streaming errors
    #[error("Source unavailable: {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    // Programmer errors
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
