//! Predict event tracking.
//!
//! Every tracking call buffers one typed shard through the container and
//! returns the shard id. The shard leaves with the next flushed batch.

use crate::{ContainerError, ContainerResult, CoreContainer};
use sdk_database::{DatabaseError, TriggerType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const TYPE_CART: &str = "predict_cart";
pub const TYPE_PURCHASE: &str = "predict_purchase";
pub const TYPE_ITEM_VIEW: &str = "predict_item_view";
pub const TYPE_CATEGORY_VIEW: &str = "predict_category_view";
pub const TYPE_SEARCH_TERM: &str = "predict_search_term";

/// Setting holding the contact attached to tracked events.
pub const CONTACT_ID_KEY: &str = "predict_contact_id";

/// One line of a cart or an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub item_id: String,
    pub price: f64,
    pub quantity: f64,
}

impl CartItem {
    pub fn new(item_id: impl Into<String>, price: f64, quantity: f64) -> Self {
        Self {
            item_id: item_id.into(),
            price,
            quantity,
        }
    }
}

/// Tracks Predict events through a [`CoreContainer`].
///
/// Obtained from [`CoreContainer::predict`].
pub struct Predict<'a> {
    container: &'a CoreContainer,
}

impl<'a> Predict<'a> {
    pub(crate) fn new(container: &'a CoreContainer) -> Self {
        Self { container }
    }

    /// Attach `contact_id` to every event tracked from now on. Persisted.
    pub fn set_contact(&self, contact_id: &str) -> ContainerResult<()> {
        self.container
            .key_value_store()
            .put_string(CONTACT_ID_KEY, contact_id)?;
        Ok(())
    }

    pub fn clear_contact(&self) -> ContainerResult<()> {
        self.container.key_value_store().remove(CONTACT_ID_KEY)?;
        Ok(())
    }

    pub fn contact(&self) -> ContainerResult<Option<String>> {
        Ok(self.container.key_value_store().get_string(CONTACT_ID_KEY)?)
    }

    pub fn track_cart(&self, items: &[CartItem]) -> ContainerResult<String> {
        self.track(
            TYPE_CART,
            [("cv", json!(1)), ("ca", serde_json::to_value(items)?)],
        )
    }

    pub fn track_purchase(&self, order_id: &str, items: &[CartItem]) -> ContainerResult<String> {
        self.track(
            TYPE_PURCHASE,
            [("oi", json!(order_id)), ("co", serde_json::to_value(items)?)],
        )
    }

    pub fn track_item_view(&self, item_id: &str) -> ContainerResult<String> {
        self.track(TYPE_ITEM_VIEW, [("v", json!(item_id))])
    }

    pub fn track_category_view(&self, category_path: &str) -> ContainerResult<String> {
        self.track(TYPE_CATEGORY_VIEW, [("vc", json!(category_path))])
    }

    pub fn track_search_term(&self, search_term: &str) -> ContainerResult<String> {
        self.track(TYPE_SEARCH_TERM, [("q", json!(search_term))])
    }

    /// Buffer one event. A flush that fails after the shard was stored is
    /// logged and left to the next flush; the id is still returned.
    fn track<const N: usize>(
        &self,
        shard_type: &str,
        payload: [(&str, Value); N],
    ) -> ContainerResult<String> {
        let mut builder = self.container.new_shard(shard_type);
        for (key, value) in payload {
            builder = builder.payload_entry(key, value);
        }
        if let Some(contact_id) = self.contact()? {
            builder = builder.payload_entry("ci", contact_id);
        }
        let shard = builder.build()?;

        match self.container.submit(&shard) {
            Ok(()) => {}
            Err(ContainerError::Database(DatabaseError::Trigger { key, source }))
                if key.trigger_type == TriggerType::After =>
            {
                warn!(shard_id = %shard.id, trigger = %key, error = %source, "Event buffered, flush failed");
            }
            Err(err) => return Err(err),
        }

        debug!(shard_id = %shard.id, shard_type, "Tracked event");
        Ok(shard.id)
    }
}
