//! Entry point wiring the SDK core together.
//!
//! `CoreContainer` opens the shard database, builds the batching pipeline
//! from [`Config`](sdk_config_and_utils::Config) and registers it as an
//! AFTER INSERT trigger on the shard table. Submitted shards are flushed to
//! the host's [`RequestManager`](sdk_shard_batching::RequestManager).
//!
//! [`Predict`] tracks cart, purchase, view and search events as typed shards.

mod container;
mod error;
mod predict;

pub use container::CoreContainer;
pub use error::{ContainerError, ContainerResult};
pub use predict::{
    CartItem, Predict, CONTACT_ID_KEY, TYPE_CART, TYPE_CATEGORY_VIEW, TYPE_ITEM_VIEW,
    TYPE_PURCHASE, TYPE_SEARCH_TERM,
};
