//! Opening the core database.

use crate::{migrations, DatabaseResult, DelegatingDatabase, TriggerMap};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Opens the core database, applies the schema and wraps the connection in
/// a [`DelegatingDatabase`] seeded with `triggers`.
pub struct DbHelper;

impl DbHelper {
    /// Open a database at the given path, running migrations if needed.
    pub fn open(path: &Path, triggers: TriggerMap) -> DatabaseResult<DelegatingDatabase> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        migrations::run_migrations(&conn)?;

        info!(path = %path.display(), "Core database opened");
        Ok(DelegatingDatabase::with_triggers(conn, triggers))
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory(triggers: TriggerMap) -> DatabaseResult<DelegatingDatabase> {
        let conn = Connection::open_in_memory()?;
        // WAL doesn't apply to in-memory databases
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        migrations::run_migrations(&conn)?;
        Ok(DelegatingDatabase::with_triggers(conn, triggers))
    }
}
