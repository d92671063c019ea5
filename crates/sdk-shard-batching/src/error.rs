//! Batching error types.

use thiserror::Error;

/// Batching error type.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sdk_database::DatabaseError),

    /// Request could not be handed to the request manager
    #[error("Send failed: {0}")]
    Send(String),

    /// Invalid batching parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A merge was asked for an empty chunk
    #[error("Cannot merge an empty chunk")]
    EmptyChunk,

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using BatchError.
pub type BatchResult<T> = Result<T, BatchError>;
