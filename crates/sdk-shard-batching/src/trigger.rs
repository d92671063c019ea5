//! Trigger that flushes buffered shards as merged requests.

use crate::{BatchResult, RequestManager, ShardChunker, ShardMerger, ShardPredicate};
use sdk_database::{
    FilterByShardIds, Repository, ShardModel, SqlSpecification, Trigger, TriggerResult,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Queries buffered shards and, once the predicate holds, submits one merged
/// request per chunk and removes the shards that went into it.
///
/// Meant to be registered as an AFTER INSERT trigger on the shard table.
pub struct BatchingShardTrigger {
    repository: Arc<dyn Repository<ShardModel>>,
    predicate: Box<dyn ShardPredicate>,
    query_specification: Box<dyn SqlSpecification>,
    chunker: Box<dyn ShardChunker>,
    merger: Box<dyn ShardMerger>,
    request_manager: Arc<dyn RequestManager>,
}

impl BatchingShardTrigger {
    pub fn new(
        repository: Arc<dyn Repository<ShardModel>>,
        predicate: Box<dyn ShardPredicate>,
        query_specification: Box<dyn SqlSpecification>,
        chunker: Box<dyn ShardChunker>,
        merger: Box<dyn ShardMerger>,
        request_manager: Arc<dyn RequestManager>,
    ) -> Self {
        Self {
            repository,
            predicate,
            query_specification,
            chunker,
            merger,
            request_manager,
        }
    }

    /// Run one flush pass.
    ///
    /// The pass holds the store exclusively from query to removal, so
    /// concurrent passes never pick up the same shards. A chunk is removed
    /// only after its request was accepted; a failed submit leaves that chunk
    /// and every later chunk buffered.
    pub fn run(&self) -> BatchResult<()> {
        let mut result = Ok(());
        self.repository.exclusive(&mut || result = self.flush());
        result
    }

    fn flush(&self) -> BatchResult<()> {
        let shards = self.repository.query(self.query_specification.as_ref())?;
        if !self.predicate.evaluate(&shards) {
            debug!(count = shards.len(), "Flush condition not met");
            return Ok(());
        }

        let total = shards.len();
        let chunks = self.chunker.chunk(shards);
        let chunk_count = chunks.len();

        for chunk in chunks {
            let request = self.merger.merge(&chunk)?;
            let request_id = request.id.clone();
            self.request_manager.submit_now(request)?;

            let removed = self.repository.remove(&FilterByShardIds::from_shards(&chunk))?;
            debug!(request_id = %request_id, shards = chunk.len(), removed, "Chunk flushed");
        }

        info!(shards = total, requests = chunk_count, "Shards flushed");
        Ok(())
    }

    /// Wrap as a database trigger holding only a weak reference, so the
    /// trigger registry does not keep the repository (and with it the
    /// database) alive.
    pub fn as_trigger(self: &Arc<Self>) -> Trigger {
        let weak = Arc::downgrade(self);
        Arc::new(move || -> TriggerResult {
            match weak.upgrade() {
                Some(trigger) => trigger.run().map_err(Into::into),
                None => Ok(()),
            }
        })
    }
}
