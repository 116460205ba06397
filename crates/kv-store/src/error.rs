//! Error types for key-value tables

/// Errors from key-value table operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result alias for key-value operations.
pub type Result<T> = std::result::Result<T, Error>;
