//! SQLite layer for the SDK core.
//!
//! This crate provides:
//! - `DelegatingDatabase`: a thin wrapper over one SQLite connection that
//!   runs registered BEFORE/AFTER callbacks around inserts, updates and deletes
//! - `DbHelper`: opens the database and applies migrations
//! - A `Repository` abstraction with a generic SQLite implementation
//! - The shard model and repository used to buffer tracked events
//! - A key-value store for small persisted settings
//!
//! # Triggers
//!
//! ```ignore
//! let db = Arc::new(DbHelper::open(path, TriggerMap::new())?);
//! db.register_trigger(SHARD_TABLE, TriggerType::After, TriggerEvent::Insert, || {
//!     tracing::info!("shard stored");
//!     Ok(())
//! });
//! ```
//!
//! Callbacks never receive arguments. A callback that needs the database
//! should capture a `Weak` handle to avoid a reference cycle through the
//! trigger registry.

mod content_values;
mod delegating;
mod error;
mod helper;
mod key_value;
mod migrations;
mod providers;
mod repository;
mod shard;
mod trigger;

pub use content_values::ContentValues;
pub use delegating::DelegatingDatabase;
pub use error::{DatabaseError, DatabaseResult};
pub use helper::DbHelper;
pub use key_value::{KeyValueStore, SqliteKeyValueStore, KEY_VALUE_TABLE};
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use providers::{RandomUuidProvider, SystemTimestampProvider, TimestampProvider, UuidProvider};
pub use repository::{Everything, ModelMapper, Repository, SqlSpecification, SqliteRepository};
pub use shard::{
    FilterByShardIds, FilterByShardType, ShardModel, ShardModelBuilder, ShardModelMapper,
    ShardRepository, DEFAULT_SHARD_TTL, SHARD_TABLE,
};
pub use trigger::{
    Trigger, TriggerError, TriggerEvent, TriggerKey, TriggerMap, TriggerResult, TriggerType,
};

// Re-exported so callers can build values and bind arguments without a
// direct rusqlite dependency.
pub use rusqlite::{types::Value, ToSql};
