//! Flush predicates, chunking and merging of shard lists.

use crate::{BatchError, BatchResult, RequestMethod, RequestModel};
use sdk_database::{ShardModel, TimestampProvider, UuidProvider};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Decides whether a queried shard list should be flushed.
pub trait ShardPredicate: Send + Sync {
    fn evaluate(&self, shards: &[ShardModel]) -> bool;
}

/// Splits a shard list into request-sized groups.
pub trait ShardChunker: Send + Sync {
    fn chunk(&self, shards: Vec<ShardModel>) -> Vec<Vec<ShardModel>>;
}

/// Turns one group of shards into one request.
pub trait ShardMerger: Send + Sync {
    fn merge(&self, chunk: &[ShardModel]) -> BatchResult<RequestModel>;
}

/// Holds once at least `threshold` shards are buffered.
#[derive(Debug, Clone, Copy)]
pub struct ListSizeAtLeast {
    threshold: usize,
}

impl ListSizeAtLeast {
    pub fn new(threshold: usize) -> BatchResult<Self> {
        if threshold == 0 {
            return Err(BatchError::InvalidConfig(
                "Batch threshold must be at least 1".to_string(),
            ));
        }
        Ok(Self { threshold })
    }
}

impl ShardPredicate for ListSizeAtLeast {
    fn evaluate(&self, shards: &[ShardModel]) -> bool {
        shards.len() >= self.threshold
    }
}

/// Splits into consecutive chunks of `chunk_size`; the last may be shorter.
#[derive(Debug, Clone, Copy)]
pub struct ListChunker {
    chunk_size: usize,
}

impl ListChunker {
    pub fn new(chunk_size: usize) -> BatchResult<Self> {
        if chunk_size == 0 {
            return Err(BatchError::InvalidConfig(
                "Chunk size must be at least 1".to_string(),
            ));
        }
        Ok(Self { chunk_size })
    }
}

impl ShardChunker for ListChunker {
    fn chunk(&self, shards: Vec<ShardModel>) -> Vec<Vec<ShardModel>> {
        let mut chunks = Vec::with_capacity(shards.len().div_ceil(self.chunk_size));
        let mut iter = shards.into_iter().peekable();
        while iter.peek().is_some() {
            chunks.push(iter.by_ref().take(self.chunk_size).collect());
        }
        chunks
    }
}

#[derive(Serialize)]
struct MergedShard<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    shard_type: &'a str,
    data: &'a serde_json::Map<String, serde_json::Value>,
    timestamp: i64,
}

#[derive(Serialize)]
struct MergedPayload<'a> {
    shards: Vec<MergedShard<'a>>,
}

/// Merges a chunk into a single POST with a `{"shards": [...]}` body.
pub struct ShardListMerger {
    url: String,
    headers: BTreeMap<String, String>,
    timestamp_provider: Arc<dyn TimestampProvider>,
    uuid_provider: Arc<dyn UuidProvider>,
}

impl ShardListMerger {
    pub fn new(
        url: impl Into<String>,
        timestamp_provider: Arc<dyn TimestampProvider>,
        uuid_provider: Arc<dyn UuidProvider>,
    ) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            url: url.into(),
            headers,
            timestamp_provider,
            uuid_provider,
        }
    }

    /// Add a header sent with every merged request.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

impl ShardMerger for ShardListMerger {
    fn merge(&self, chunk: &[ShardModel]) -> BatchResult<RequestModel> {
        // Requests live as long as the longest-lived shard they carry.
        let ttl = chunk
            .iter()
            .map(|s| s.ttl)
            .max()
            .ok_or(BatchError::EmptyChunk)?;

        let payload = MergedPayload {
            shards: chunk
                .iter()
                .map(|s| MergedShard {
                    id: &s.id,
                    shard_type: &s.shard_type,
                    data: &s.data,
                    timestamp: s.timestamp,
                })
                .collect(),
        };

        Ok(RequestModel {
            id: self.uuid_provider.provide_id(),
            url: self.url.clone(),
            method: RequestMethod::Post,
            payload: Some(serde_json::to_value(&payload)?),
            headers: self.headers.clone(),
            timestamp: self.timestamp_provider.provide_timestamp(),
            ttl,
        })
    }
}
