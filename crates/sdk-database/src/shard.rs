//! Shard model, its table mapping and shard specifications.
//!
//! A shard is a tracked event buffered locally until a batching trigger
//! merges a group of them into one outbound request.

use crate::{
    ContentValues, DatabaseError, DatabaseResult, ModelMapper, SqlSpecification, SqliteRepository,
    TimestampProvider, UuidProvider,
};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Table holding buffered shards.
pub const SHARD_TABLE: &str = "shard";

/// TTL for shards that never expire.
pub const DEFAULT_SHARD_TTL: i64 = i64::MAX;

/// Repository of buffered shards.
pub type ShardRepository = SqliteRepository<ShardModelMapper>;

/// A locally buffered event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardModel {
    pub id: String,
    #[serde(rename = "type")]
    pub shard_type: String,
    pub data: Map<String, serde_json::Value>,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Lifetime in milliseconds.
    pub ttl: i64,
}

impl ShardModel {
    pub fn builder<'a>(
        timestamp_provider: &'a dyn TimestampProvider,
        uuid_provider: &'a dyn UuidProvider,
    ) -> ShardModelBuilder<'a> {
        ShardModelBuilder {
            timestamp_provider,
            uuid_provider,
            shard_type: None,
            data: Map::new(),
            ttl: DEFAULT_SHARD_TTL,
        }
    }
}

/// Builds shards with an id and timestamp taken from the providers.
pub struct ShardModelBuilder<'a> {
    timestamp_provider: &'a dyn TimestampProvider,
    uuid_provider: &'a dyn UuidProvider,
    shard_type: Option<String>,
    data: Map<String, serde_json::Value>,
    ttl: i64,
}

impl ShardModelBuilder<'_> {
    pub fn shard_type(mut self, shard_type: impl Into<String>) -> Self {
        self.shard_type = Some(shard_type.into());
        self
    }

    pub fn payload_entry(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn ttl(mut self, ttl: i64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn build(self) -> DatabaseResult<ShardModel> {
        let shard_type = self
            .shard_type
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| DatabaseError::InvalidData("Shard type must be set".to_string()))?;

        Ok(ShardModel {
            id: self.uuid_provider.provide_id(),
            shard_type,
            data: self.data,
            timestamp: self.timestamp_provider.provide_timestamp(),
            ttl: self.ttl,
        })
    }
}

/// Maps [`ShardModel`] onto the `shard` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardModelMapper;

impl ModelMapper for ShardModelMapper {
    type Model = ShardModel;

    fn table_name(&self) -> &'static str {
        SHARD_TABLE
    }

    fn content_values(&self, item: &ShardModel) -> DatabaseResult<ContentValues> {
        let mut values = ContentValues::new();
        values
            .put("id", item.id.clone())
            .put("type", item.shard_type.clone())
            .put("data", serde_json::to_string(&item.data)?)
            .put("timestamp", item.timestamp)
            .put("ttl", item.ttl);
        Ok(values)
    }

    fn from_row(&self, row: &Row<'_>) -> rusqlite::Result<ShardModel> {
        let raw_data: String = row.get("data")?;
        let data = serde_json::from_str(&raw_data)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

        Ok(ShardModel {
            id: row.get("id")?,
            shard_type: row.get("type")?,
            data,
            timestamp: row.get("timestamp")?,
            ttl: row.get("ttl")?,
        })
    }

    fn default_order_by(&self) -> Option<&'static str> {
        Some("timestamp ASC, rowid ASC")
    }
}

/// Selects the shards with the given ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterByShardIds(pub Vec<String>);

impl FilterByShardIds {
    pub fn from_shards(shards: &[ShardModel]) -> Self {
        Self(shards.iter().map(|s| s.id.clone()).collect())
    }
}

impl SqlSpecification for FilterByShardIds {
    fn selection(&self) -> Option<String> {
        if self.0.is_empty() {
            // IN () is not valid SQL; match nothing instead of everything.
            return Some("0".to_string());
        }
        let placeholders = vec!["?"; self.0.len()].join(", ");
        Some(format!("id IN ({placeholders})"))
    }

    fn selection_args(&self) -> Vec<Value> {
        self.0.iter().cloned().map(Value::Text).collect()
    }
}

/// Selects the shards of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterByShardType(pub String);

impl SqlSpecification for FilterByShardType {
    fn selection(&self) -> Option<String> {
        Some("type = ?".to_string())
    }

    fn selection_args(&self) -> Vec<Value> {
        vec![Value::Text(self.0.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DbHelper, Everything, Repository, TriggerMap};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    struct FixedTimestamp(AtomicI64);

    impl TimestampProvider for FixedTimestamp {
        fn provide_timestamp(&self) -> i64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    struct SequentialIds(AtomicI64);

    impl UuidProvider for SequentialIds {
        fn provide_id(&self) -> String {
            format!("shard-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn providers() -> (FixedTimestamp, SequentialIds) {
        (FixedTimestamp(AtomicI64::new(1000)), SequentialIds(AtomicI64::new(1)))
    }

    fn create_repository() -> ShardRepository {
        let db = Arc::new(DbHelper::open_in_memory(TriggerMap::new()).unwrap());
        ShardRepository::new(db, ShardModelMapper)
    }

    #[test]
    fn test_builder_uses_providers() {
        let (ts, ids) = providers();
        let shard = ShardModel::builder(&ts, &ids)
            .shard_type("predict_item_view")
            .payload_entry("v", "i:1234")
            .ttl(60_000)
            .build()
            .unwrap();

        assert_eq!(shard.id, "shard-1");
        assert_eq!(shard.timestamp, 1000);
        assert_eq!(shard.ttl, 60_000);
        assert_eq!(shard.data["v"], "i:1234");
    }

    #[test]
    fn test_builder_requires_type() {
        let (ts, ids) = providers();
        let result = ShardModel::builder(&ts, &ids).payload_entry("q", "shoes").build();
        assert!(matches!(result, Err(DatabaseError::InvalidData(_))));
    }

    #[test]
    fn test_repository_add_and_query_in_timestamp_order() {
        let repo = create_repository();
        let (ts, ids) = providers();

        let first = ShardModel::builder(&ts, &ids)
            .shard_type("a")
            .payload_entry("n", 1)
            .build()
            .unwrap();
        let second = ShardModel::builder(&ts, &ids)
            .shard_type("b")
            .payload_entry("n", 2)
            .build()
            .unwrap();

        // Insert out of order; query sorts by timestamp.
        repo.add(&second).unwrap();
        repo.add(&first).unwrap();

        let shards = repo.query(&Everything).unwrap();
        assert_eq!(shards, vec![first, second]);
    }

    #[test]
    fn test_filter_by_type_and_ids() {
        let repo = create_repository();
        let (ts, ids) = providers();

        let shards: Vec<_> = ["cart", "view", "cart"]
            .iter()
            .map(|t| ShardModel::builder(&ts, &ids).shard_type(*t).build().unwrap())
            .collect();
        for shard in &shards {
            repo.add(shard).unwrap();
        }

        let carts = repo.query(&FilterByShardType("cart".to_string())).unwrap();
        assert_eq!(carts.len(), 2);

        let removed = repo.remove(&FilterByShardIds::from_shards(&carts)).unwrap();
        assert_eq!(removed, 2);

        let remaining = repo.query(&Everything).unwrap();
        assert_eq!(remaining, vec![shards[1].clone()]);
    }

    #[test]
    fn test_filter_by_empty_ids_matches_nothing() {
        let repo = create_repository();
        let (ts, ids) = providers();
        repo.add(&ShardModel::builder(&ts, &ids).shard_type("a").build().unwrap())
            .unwrap();

        assert_eq!(repo.remove(&FilterByShardIds(Vec::new())).unwrap(), 0);
        assert!(!repo.is_empty().unwrap());
    }

    #[test]
    fn test_is_empty() {
        let repo = create_repository();
        assert!(repo.is_empty().unwrap());

        let (ts, ids) = providers();
        repo.add(&ShardModel::builder(&ts, &ids).shard_type("a").build().unwrap())
            .unwrap();
        assert!(!repo.is_empty().unwrap());

        repo.remove(&Everything).unwrap();
        assert!(repo.is_empty().unwrap());
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let repo = create_repository();
        let (ts, ids) = providers();
        let shard = ShardModel::builder(&ts, &ids).shard_type("a").build().unwrap();

        repo.add(&shard).unwrap();
        assert!(matches!(repo.add(&shard), Err(DatabaseError::Sqlite(_))));
    }

    #[test]
    fn test_shard_serializes_type_field() {
        let (ts, ids) = providers();
        let shard = ShardModel::builder(&ts, &ids).shard_type("a").build().unwrap();
        let json = serde_json::to_value(&shard).unwrap();
        assert_eq!(json["type"], "a");
    }
}
