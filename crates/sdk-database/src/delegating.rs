//! Delegating database with trigger dispatch.
//!
//! `DelegatingDatabase` forwards every operation to a single SQLite
//! connection. Mutations (insert, update, delete) additionally run the
//! callbacks registered for `(table, BEFORE, event)` before the statement and
//! `(table, AFTER, event)` after it completed.
//!
//! Callbacks run synchronously on the calling thread and may re-enter the
//! database: the connection lock is not held while callbacks run, and the
//! connection sits behind a re-entrant mutex so a callback fired from inside
//! `transaction()` or `exclusive()` can still issue statements on the same
//! thread.
//!
//! Inside `transaction()` AFTER callbacks are queued and only run once the
//! transaction committed. A rollback drops them.

use crate::{
    ContentValues, DatabaseError, DatabaseResult, SqlSpecification, Trigger, TriggerEvent,
    TriggerKey, TriggerMap, TriggerResult, TriggerType,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row, ToSql};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, error};

/// SQLite connection wrapper that dispatches registered triggers.
pub struct DelegatingDatabase {
    conn: ReentrantMutex<Connection>,
    triggers: RwLock<TriggerMap>,
    deferred: Mutex<Option<DeferredTriggers>>,
}

/// AFTER triggers held back while `owner` has a transaction open.
struct DeferredTriggers {
    owner: ThreadId,
    pending: Vec<(String, TriggerEvent)>,
}

/// Defers AFTER triggers for the current thread until dropped or finished.
struct Deferral<'a> {
    slot: &'a Mutex<Option<DeferredTriggers>>,
}

impl<'a> Deferral<'a> {
    fn begin(slot: &'a Mutex<Option<DeferredTriggers>>) -> Self {
        *slot.lock() = Some(DeferredTriggers {
            owner: thread::current().id(),
            pending: Vec::new(),
        });
        Self { slot }
    }

    fn finish(self) -> Vec<(String, TriggerEvent)> {
        self.slot
            .lock()
            .take()
            .map(|deferred| deferred.pending)
            .unwrap_or_default()
    }
}

impl Drop for Deferral<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

impl DelegatingDatabase {
    /// Wrap a connection with no registered triggers.
    pub fn new(conn: Connection) -> Self {
        Self::with_triggers(conn, TriggerMap::new())
    }

    /// Wrap a connection, seeding the trigger registry.
    pub fn with_triggers(conn: Connection, triggers: TriggerMap) -> Self {
        Self {
            conn: ReentrantMutex::new(conn),
            triggers: RwLock::new(triggers),
            deferred: Mutex::new(None),
        }
    }

    /// Register a callback for `(table_name, trigger_type, trigger_event)`.
    ///
    /// Callbacks accumulate: earlier registrations under the same key are
    /// kept and run first.
    pub fn register_trigger<F>(
        &self,
        table_name: &str,
        trigger_type: TriggerType,
        trigger_event: TriggerEvent,
        trigger: F,
    ) where
        F: Fn() -> TriggerResult + Send + Sync + 'static,
    {
        self.register_shared_trigger(
            TriggerKey::new(table_name, trigger_type, trigger_event),
            Arc::new(trigger),
        );
    }

    /// Register an already shared callback under `key`.
    pub fn register_shared_trigger(&self, key: TriggerKey, trigger: Trigger) {
        debug!(trigger = %key, "Registering trigger");
        self.triggers.write().entry(key).or_default().push(trigger);
    }

    /// Number of callbacks registered under `key`.
    pub fn trigger_count(&self, key: &TriggerKey) -> usize {
        self.triggers.read().get(key).map_or(0, Vec::len)
    }

    // ==========================================
    // Mutations
    // ==========================================

    /// Insert a row and return its rowid.
    ///
    /// Empty `values` inserts a row of column defaults.
    pub fn insert(&self, table: &str, values: &ContentValues) -> DatabaseResult<i64> {
        let sql = if values.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            let columns = values.columns().collect::<Vec<_>>().join(", ");
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
        };

        self.mutate(table, TriggerEvent::Insert, |conn| {
            conn.execute(&sql, params_from_iter(values.values()))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Update matching rows and return how many changed.
    pub fn update(
        &self,
        table: &str,
        values: &ContentValues,
        where_clause: Option<&str>,
        where_args: &[&dyn ToSql],
    ) -> DatabaseResult<usize> {
        if values.is_empty() {
            return Err(DatabaseError::InvalidData(format!(
                "Update of {table} requires at least one column"
            )));
        }

        let assignments = values
            .columns()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {table} SET {assignments}{}", where_sql(where_clause));

        let params: Vec<&dyn ToSql> = values
            .values()
            .map(|v| v as &dyn ToSql)
            .chain(where_args.iter().copied())
            .collect();

        self.mutate(table, TriggerEvent::Update, |conn| {
            conn.execute(&sql, params.as_slice())
        })
    }

    /// Delete matching rows and return how many were removed.
    ///
    /// `None` deletes every row of the table.
    pub fn delete(
        &self,
        table: &str,
        where_clause: Option<&str>,
        where_args: &[&dyn ToSql],
    ) -> DatabaseResult<usize> {
        let sql = format!("DELETE FROM {table}{}", where_sql(where_clause));

        self.mutate(table, TriggerEvent::Delete, |conn| {
            conn.execute(&sql, where_args)
        })
    }

    fn mutate<R, F>(&self, table: &str, event: TriggerEvent, op: F) -> DatabaseResult<R>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<R>,
    {
        self.run_before_triggers(table, event)?;

        let result = {
            let conn = self.conn.lock();
            op(&*conn)?
        };

        if !self.defer_after_triggers(table, event) {
            self.run_after_triggers(table, event)?;
        }
        Ok(result)
    }

    /// Queue the AFTER triggers if this thread has a transaction open.
    fn defer_after_triggers(&self, table: &str, event: TriggerEvent) -> bool {
        match self.deferred.lock().as_mut() {
            Some(deferred) if deferred.owner == thread::current().id() => {
                deferred.pending.push((table.to_string(), event));
                true
            }
            _ => false,
        }
    }

    fn matching_triggers(&self, key: &TriggerKey) -> Vec<Trigger> {
        self.triggers.read().get(key).cloned().unwrap_or_default()
    }

    /// A failing BEFORE trigger aborts the mutation; later callbacks are skipped.
    fn run_before_triggers(&self, table: &str, event: TriggerEvent) -> DatabaseResult<()> {
        let key = TriggerKey::new(table, TriggerType::Before, event);
        let triggers = self.matching_triggers(&key);
        if triggers.is_empty() {
            return Ok(());
        }

        debug!(trigger = %key, count = triggers.len(), "Running triggers");
        for trigger in triggers {
            if let Err(source) = trigger() {
                error!(trigger = %key, error = %source, "Trigger failed, mutation aborted");
                return Err(DatabaseError::Trigger { key, source });
            }
        }
        Ok(())
    }

    /// Every AFTER trigger runs; the first failure is reported.
    fn run_after_triggers(&self, table: &str, event: TriggerEvent) -> DatabaseResult<()> {
        let key = TriggerKey::new(table, TriggerType::After, event);
        let triggers = self.matching_triggers(&key);
        if triggers.is_empty() {
            return Ok(());
        }

        debug!(trigger = %key, count = triggers.len(), "Running triggers");
        let mut first_error = None;
        for trigger in triggers {
            if let Err(source) = trigger() {
                error!(trigger = %key, error = %source, "Trigger failed");
                first_error.get_or_insert(source);
            }
        }

        match first_error {
            Some(source) => Err(DatabaseError::Trigger { key, source }),
            None => Ok(()),
        }
    }

    // ==========================================
    // Reads and pass-through
    // ==========================================

    /// Run a raw query and map every row.
    pub fn query<T, P, F>(&self, sql: &str, params: P, mapper: F) -> DatabaseResult<Vec<T>>
    where
        P: rusqlite::Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Select every column of `table` narrowed by `spec`.
    pub fn query_table<T, F>(
        &self,
        table: &str,
        spec: &dyn SqlSpecification,
        mapper: F,
    ) -> DatabaseResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut sql = format!("SELECT * FROM {table}{}", where_sql(spec.selection().as_deref()));
        if let Some(order_by) = spec.order_by() {
            sql.push_str(&format!(" ORDER BY {order_by}"));
        }
        if let Some(limit) = spec.limit() {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let args: Vec<Value> = spec.selection_args();
        self.query(&sql, params_from_iter(args.iter()), mapper)
    }

    /// Count rows of `table`, optionally narrowed by a WHERE clause.
    pub fn count(
        &self,
        table: &str,
        where_clause: Option<&str>,
        where_args: &[&dyn ToSql],
    ) -> DatabaseResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {table}{}", where_sql(where_clause));
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(&sql, where_args, |row| row.get(0))?;
        Ok(count)
    }

    /// Execute SQL without trigger dispatch (schema changes, pragmas).
    pub fn execute_batch(&self, sql: &str) -> DatabaseResult<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Run a closure against the backing connection. No triggers fire.
    pub fn with_connection<R, F>(&self, f: F) -> DatabaseResult<R>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<R>,
    {
        let conn = self.conn.lock();
        Ok(f(&*conn)?)
    }

    /// Run `f` while holding the connection, so no other thread can read or
    /// write until it returns. Calls made from `f` on this thread, including
    /// the triggers they fire, go through as usual.
    pub fn exclusive<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _conn = self.conn.lock();
        f()
    }

    /// Run `f` inside a transaction on this thread.
    ///
    /// Commits when `f` returns `Ok`, rolls back on `Err` or unwind. Other
    /// threads block on the connection until the transaction ends.
    ///
    /// BEFORE triggers run inline. AFTER triggers of the mutations made by
    /// `f` run in order once the commit succeeded, and are discarded on
    /// rollback; the first failing one is returned with the data committed.
    pub fn transaction<R, F>(&self, f: F) -> DatabaseResult<R>
    where
        F: FnOnce(&Self) -> DatabaseResult<R>,
    {
        let (result, pending) = {
            let conn = self.conn.lock();
            let tx = conn.unchecked_transaction()?;
            let deferral = Deferral::begin(&self.deferred);
            let result = f(self)?;
            tx.commit()?;
            (result, deferral.finish())
        };

        let mut first_error = None;
        for (table, event) in pending {
            if let Err(err) = self.run_after_triggers(&table, event) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }
}

fn where_sql(where_clause: Option<&str>) -> String {
    match where_clause {
        Some(clause) if !clause.trim().is_empty() => format!(" WHERE {clause}"),
        _ => String::new(),
    }
}
