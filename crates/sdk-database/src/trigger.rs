//! Trigger keys and callback types.
//!
//! A trigger is a zero-argument callback registered against a
//! `(table, timing, event)` triple. The delegating database looks callbacks
//! up by exact key, so a callback registered for `BEFORE INSERT` on `shard`
//! never sees an `AFTER INSERT` or a `BEFORE DELETE` on the same table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// When a trigger runs relative to the underlying mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerType {
    Before,
    After,
}

impl TriggerType {
    pub const ALL: [TriggerType; 2] = [Self::Before, Self::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
        }
    }
}

/// The mutation kind a trigger is registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub const ALL: [TriggerEvent; 3] = [Self::Insert, Self::Update, Self::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// Composite lookup key for registered triggers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerKey {
    pub table_name: String,
    pub trigger_type: TriggerType,
    pub trigger_event: TriggerEvent,
}

impl TriggerKey {
    pub fn new(table_name: &str, trigger_type: TriggerType, trigger_event: TriggerEvent) -> Self {
        Self {
            table_name: table_name.to_string(),
            trigger_type,
            trigger_event,
        }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ON {}",
            self.trigger_type.as_str(),
            self.trigger_event.as_str(),
            self.table_name
        )
    }
}

/// Error returned by a failing trigger callback.
pub type TriggerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of running a trigger callback.
pub type TriggerResult = Result<(), TriggerError>;

/// A registered trigger callback.
pub type Trigger = Arc<dyn Fn() -> TriggerResult + Send + Sync>;

/// Registered callbacks, in registration order per key.
pub type TriggerMap = std::collections::HashMap<TriggerKey, Vec<Trigger>>;
