//! Repository abstraction over the delegating database.

use crate::{ContentValues, DatabaseResult, DelegatingDatabase};
use rusqlite::types::Value;
use rusqlite::Row;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Describes a row selection on a table.
pub trait SqlSpecification: Send + Sync {
    /// WHERE clause with `?` placeholders, or `None` for every row.
    fn selection(&self) -> Option<String> {
        None
    }

    /// Arguments bound to the placeholders of [`selection`](Self::selection).
    fn selection_args(&self) -> Vec<Value> {
        Vec::new()
    }

    fn order_by(&self) -> Option<String> {
        None
    }

    fn limit(&self) -> Option<u32> {
        None
    }
}

/// Selects every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct Everything;

impl SqlSpecification for Everything {}

/// Storage of model items addressed through specifications.
pub trait Repository<T>: Send + Sync {
    fn add(&self, item: &T) -> DatabaseResult<()>;

    /// Remove matching items and return how many were removed.
    fn remove(&self, spec: &dyn SqlSpecification) -> DatabaseResult<usize>;

    fn query(&self, spec: &dyn SqlSpecification) -> DatabaseResult<Vec<T>>;

    fn is_empty(&self) -> DatabaseResult<bool>;

    /// Run `f` while no other thread can use the backing store.
    fn exclusive(&self, f: &mut dyn FnMut());
}

/// Maps a model type to and from a table.
pub trait ModelMapper: Send + Sync {
    type Model;

    fn table_name(&self) -> &'static str;

    fn content_values(&self, item: &Self::Model) -> DatabaseResult<ContentValues>;

    fn from_row(&self, row: &Row<'_>) -> rusqlite::Result<Self::Model>;

    /// Ordering applied when a specification does not pick one.
    fn default_order_by(&self) -> Option<&'static str> {
        None
    }
}

/// Generic SQLite repository. Every write goes through the delegating
/// database, so registered triggers fire for repository mutations.
pub struct SqliteRepository<M: ModelMapper> {
    db: Arc<DelegatingDatabase>,
    mapper: M,
    _model: PhantomData<fn() -> M::Model>,
}

impl<M: ModelMapper> SqliteRepository<M> {
    pub fn new(db: Arc<DelegatingDatabase>, mapper: M) -> Self {
        Self {
            db,
            mapper,
            _model: PhantomData,
        }
    }

    pub fn database(&self) -> &Arc<DelegatingDatabase> {
        &self.db
    }
}

impl<M: ModelMapper> Repository<M::Model> for SqliteRepository<M> {
    fn add(&self, item: &M::Model) -> DatabaseResult<()> {
        let values = self.mapper.content_values(item)?;
        let rowid = self.db.insert(self.mapper.table_name(), &values)?;
        debug!(table = self.mapper.table_name(), rowid, "Added item");
        Ok(())
    }

    fn remove(&self, spec: &dyn SqlSpecification) -> DatabaseResult<usize> {
        let selection = spec.selection();
        let args = spec.selection_args();
        let where_args: Vec<&dyn rusqlite::ToSql> =
            args.iter().map(|v| v as &dyn rusqlite::ToSql).collect();

        let removed = self
            .db
            .delete(self.mapper.table_name(), selection.as_deref(), &where_args)?;
        debug!(table = self.mapper.table_name(), removed, "Removed items");
        Ok(removed)
    }

    fn query(&self, spec: &dyn SqlSpecification) -> DatabaseResult<Vec<M::Model>> {
        match (spec.order_by(), self.mapper.default_order_by()) {
            (None, Some(default_order)) => {
                let ordered = OrderedBy {
                    inner: spec,
                    order_by: default_order,
                };
                self.db
                    .query_table(self.mapper.table_name(), &ordered, |row| self.mapper.from_row(row))
            }
            _ => self
                .db
                .query_table(self.mapper.table_name(), spec, |row| self.mapper.from_row(row)),
        }
    }

    fn is_empty(&self) -> DatabaseResult<bool> {
        Ok(self.db.count(self.mapper.table_name(), None, &[])? == 0)
    }

    fn exclusive(&self, f: &mut dyn FnMut()) {
        self.db.exclusive(f)
    }
}

/// Specification wrapper that supplies an ordering.
struct OrderedBy<'a> {
    inner: &'a dyn SqlSpecification,
    order_by: &'static str,
}

impl SqlSpecification for OrderedBy<'_> {
    fn selection(&self) -> Option<String> {
        self.inner.selection()
    }

    fn selection_args(&self) -> Vec<Value> {
        self.inner.selection_args()
    }

    fn order_by(&self) -> Option<String> {
        Some(self.order_by.to_string())
    }

    fn limit(&self) -> Option<u32> {
        self.inner.limit()
    }
}
