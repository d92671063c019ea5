//! Batching of buffered shards into outbound requests.
//!
//! This crate provides:
//! - `BatchingShardTrigger`: queries buffered shards and, once a predicate
//!   holds, submits one merged request per chunk and removes those shards
//! - Predicate, chunker and merger seams with list-size, fixed-chunk and
//!   JSON-merge implementations
//! - `RequestManager`: the hand-off point to the host's transport, with a
//!   tokio channel implementation

mod batch;
mod error;
mod request;
mod trigger;

pub use batch::{
    ListChunker, ListSizeAtLeast, ShardChunker, ShardListMerger, ShardMerger, ShardPredicate,
};
pub use error::{BatchError, BatchResult};
pub use request::{ChannelRequestManager, RequestManager, RequestMethod, RequestModel};
pub use trigger::BatchingShardTrigger;
