//! Persisted string settings.

use crate::{ContentValues, DatabaseResult, DelegatingDatabase};
use std::sync::Arc;
use tracing::debug;

/// Table holding key-value settings.
pub const KEY_VALUE_TABLE: &str = "key_value";

/// Small string settings that outlive the process.
pub trait KeyValueStore: Send + Sync {
    fn put_string(&self, key: &str, value: &str) -> DatabaseResult<()>;

    fn get_string(&self, key: &str) -> DatabaseResult<Option<String>>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> DatabaseResult<()>;
}

/// Key-value store in the core database. Writes go through the delegating
/// database, so triggers on `key_value` fire.
pub struct SqliteKeyValueStore {
    db: Arc<DelegatingDatabase>,
}

impl SqliteKeyValueStore {
    pub fn new(db: Arc<DelegatingDatabase>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn put_string(&self, key: &str, value: &str) -> DatabaseResult<()> {
        let mut values = ContentValues::new();
        values.put("value", value.to_string());

        self.db.exclusive(|| -> DatabaseResult<()> {
            let updated = self
                .db
                .update(KEY_VALUE_TABLE, &values, Some("key = ?"), &[&key])?;
            if updated == 0 {
                values.put("key", key.to_string());
                self.db.insert(KEY_VALUE_TABLE, &values)?;
            }
            debug!(key, "Stored setting");
            Ok(())
        })
    }

    fn get_string(&self, key: &str) -> DatabaseResult<Option<String>> {
        let mut rows = self.db.query(
            "SELECT value FROM key_value WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        )?;
        Ok(rows.pop())
    }

    fn remove(&self, key: &str) -> DatabaseResult<()> {
        let removed = self
            .db
            .delete(KEY_VALUE_TABLE, Some("key = ?"), &[&key])?;
        debug!(key, removed, "Removed setting");
        Ok(())
    }
}
