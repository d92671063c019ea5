//! Errors raised while loading settings and preparing the SDK directories.

use thiserror::Error;

/// Failure to load, validate or store the SDK configuration.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A setting is missing or out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Reading or writing the config file or creating a directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The batch endpoint is not a valid URL
    #[error("Invalid batch endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The config file is not valid JSON for [`Config`](crate::Config)
    #[error("Malformed config file: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory to place `~/.sdk-core` under
    #[error("Cannot resolve SDK directory: {0}")]
    Path(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
