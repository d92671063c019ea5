//! Configuration, paths, logging and shared errors for the SDK core.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    BatchingConfig, Config, LogFormat, DEFAULT_BATCH_ENDPOINT_URL, DEFAULT_DATABASE_FILE_NAME,
    DEFAULT_LOG_LEVEL, LOG_LEVEL_ENV,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
