//! Injectable sources of time and identifiers.

/// Supplies the current time in milliseconds since the Unix epoch.
pub trait TimestampProvider: Send + Sync {
    fn provide_timestamp(&self) -> i64;
}

/// Supplies fresh unique identifiers.
pub trait UuidProvider: Send + Sync {
    fn provide_id(&self) -> String;
}

/// Wall-clock timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimestampProvider;

impl TimestampProvider for SystemTimestampProvider {
    fn provide_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUuidProvider;

impl UuidProvider for RandomUuidProvider {
    fn provide_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
