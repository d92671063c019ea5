//! Wiring of database, shard repository and batching trigger.

use crate::{ContainerResult, Predict};
use sdk_config_and_utils::{Config, Paths};
use sdk_database::{
    DbHelper, DelegatingDatabase, Everything, KeyValueStore, RandomUuidProvider, Repository,
    ShardModel, ShardModelBuilder, ShardModelMapper, ShardRepository, SqliteKeyValueStore,
    SystemTimestampProvider, TimestampProvider, TriggerEvent, TriggerKey, TriggerMap,
    TriggerType, UuidProvider, SHARD_TABLE,
};
use sdk_shard_batching::{
    BatchingShardTrigger, ListChunker, ListSizeAtLeast, RequestManager, ShardListMerger,
};
use std::sync::Arc;
use tracing::info;

/// Owns the core database and the shard batching pipeline.
///
/// Shards added through [`submit`](Self::submit) are flushed to the request
/// manager by an AFTER INSERT trigger on the shard table once the configured
/// threshold is reached.
pub struct CoreContainer {
    config: Config,
    database: Arc<DelegatingDatabase>,
    shard_repository: Arc<ShardRepository>,
    batching_trigger: Arc<BatchingShardTrigger>,
    key_value_store: Arc<dyn KeyValueStore>,
    timestamp_provider: Arc<dyn TimestampProvider>,
    uuid_provider: Arc<dyn UuidProvider>,
}

impl CoreContainer {
    /// Open the database file under `paths` and wire the pipeline.
    pub fn open(
        config: Config,
        paths: &Paths,
        request_manager: Arc<dyn RequestManager>,
    ) -> ContainerResult<Self> {
        config.validate()?;
        paths.ensure_dirs()?;

        let db_path = paths.database_file(&config.database_file_name);
        let database = DbHelper::open(&db_path, TriggerMap::new())?;
        Self::from_database(
            config,
            database,
            request_manager,
            Arc::new(SystemTimestampProvider),
            Arc::new(RandomUuidProvider),
        )
    }

    /// Wire the pipeline over an in-memory database.
    pub fn open_in_memory(
        config: Config,
        request_manager: Arc<dyn RequestManager>,
    ) -> ContainerResult<Self> {
        let database = DbHelper::open_in_memory(TriggerMap::new())?;
        Self::from_database(
            config,
            database,
            request_manager,
            Arc::new(SystemTimestampProvider),
            Arc::new(RandomUuidProvider),
        )
    }

    /// Wire the pipeline over an already opened database.
    pub fn from_database(
        config: Config,
        database: DelegatingDatabase,
        request_manager: Arc<dyn RequestManager>,
        timestamp_provider: Arc<dyn TimestampProvider>,
        uuid_provider: Arc<dyn UuidProvider>,
    ) -> ContainerResult<Self> {
        config.validate()?;

        let database = Arc::new(database);
        let shard_repository = Arc::new(ShardRepository::new(database.clone(), ShardModelMapper));

        let batching_trigger = Arc::new(BatchingShardTrigger::new(
            shard_repository.clone(),
            Box::new(ListSizeAtLeast::new(config.batching.threshold)?),
            Box::new(Everything),
            Box::new(ListChunker::new(config.batching.chunk_size)?),
            Box::new(ShardListMerger::new(
                config.batching.endpoint_url.clone(),
                timestamp_provider.clone(),
                uuid_provider.clone(),
            )),
            request_manager,
        ));

        database.register_shared_trigger(
            TriggerKey::new(SHARD_TABLE, TriggerType::After, TriggerEvent::Insert),
            batching_trigger.as_trigger(),
        );

        let key_value_store: Arc<dyn KeyValueStore> =
            Arc::new(SqliteKeyValueStore::new(database.clone()));

        info!(
            threshold = config.batching.threshold,
            chunk_size = config.batching.chunk_size,
            "Core container ready"
        );

        Ok(Self {
            config,
            database,
            shard_repository,
            batching_trigger,
            key_value_store,
            timestamp_provider,
            uuid_provider,
        })
    }

    /// Start a shard of `shard_type` with the configured TTL.
    pub fn new_shard(&self, shard_type: &str) -> ShardModelBuilder<'_> {
        ShardModel::builder(self.timestamp_provider.as_ref(), self.uuid_provider.as_ref())
            .shard_type(shard_type)
            .ttl(self.config.batching.shard_ttl_ms)
    }

    /// Buffer a shard. May flush a batch before returning.
    ///
    /// If the flush fails the shard stays buffered and the error is returned.
    pub fn submit(&self, shard: &ShardModel) -> ContainerResult<()> {
        self.shard_repository.add(shard)?;
        Ok(())
    }

    /// Run a flush pass outside of an insert, e.g. after a failed submit.
    pub fn flush(&self) -> ContainerResult<()> {
        self.batching_trigger.run()?;
        Ok(())
    }

    /// Predict event tracking on top of [`submit`](Self::submit).
    pub fn predict(&self) -> Predict<'_> {
        Predict::new(self)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Arc<DelegatingDatabase> {
        &self.database
    }

    pub fn shard_repository(&self) -> &Arc<ShardRepository> {
        &self.shard_repository
    }

    pub fn key_value_store(&self) -> &Arc<dyn KeyValueStore> {
        &self.key_value_store
    }
}
