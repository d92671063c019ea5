//! Container error types.

use thiserror::Error;

/// Container error type.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] sdk_config_and_utils::CoreError),

    /// Database error, including failed triggers
    #[error(transparent)]
    Database(#[from] sdk_database::DatabaseError),

    /// Batching error
    #[error(transparent)]
    Batch(#[from] sdk_shard_batching::BatchError),

    /// Event payload could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ContainerError.
pub type ContainerResult<T> = Result<T, ContainerError>;
