//! Tracking Predict events end to end, from the tracking call to the merged
//! request handed to the request manager.

use std::sync::Arc;

use sdk_config_and_utils::{Config, Paths};
use sdk_core::{
    CartItem, CoreContainer, TYPE_CART, TYPE_CATEGORY_VIEW, TYPE_ITEM_VIEW, TYPE_PURCHASE,
    TYPE_SEARCH_TERM,
};
use sdk_database::{Everything, Repository};
use sdk_shard_batching::{ChannelRequestManager, RequestModel};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::sync::mpsc::UnboundedReceiver;

fn config(threshold: usize) -> Config {
    let mut config = Config::default();
    config.batching.threshold = threshold;
    config
}

fn open(threshold: usize) -> (CoreContainer, UnboundedReceiver<RequestModel>) {
    let (manager, rx) = ChannelRequestManager::new();
    let container = CoreContainer::open_in_memory(config(threshold), Arc::new(manager)).unwrap();
    (container, rx)
}

/// The shards carried by the single request waiting on the channel.
fn sent_shards(rx: &mut UnboundedReceiver<RequestModel>) -> Vec<Value> {
    let request = rx.try_recv().expect("a merged request");
    assert!(rx.try_recv().is_err(), "exactly one request");
    request.payload.unwrap()["shards"].as_array().unwrap().clone()
}

fn cart_items() -> Vec<CartItem> {
    vec![
        CartItem::new("item1", 1.1, 10.0),
        CartItem::new("item2", 2.2, 20.0),
        CartItem::new("item3", 3.3, 30.0),
    ]
}

#[test]
fn test_track_cart() {
    let (container, mut rx) = open(1);

    let id = container.predict().track_cart(&cart_items()).unwrap();

    let shards = sent_shards(&mut rx);
    assert_eq!(shards.len(), 1);
    assert_eq!(shards[0]["id"], id.as_str());
    assert_eq!(shards[0]["type"], TYPE_CART);
    assert_eq!(shards[0]["data"]["cv"], 1);
    assert_eq!(
        shards[0]["data"]["ca"][1],
        json!({ "item_id": "item2", "price": 2.2, "quantity": 20.0 })
    );
}

#[test]
fn test_track_purchase() {
    let (container, mut rx) = open(1);
    let order_id = "orderId_1234567892345678";

    let id = container
        .predict()
        .track_purchase(order_id, &cart_items())
        .unwrap();

    let shards = sent_shards(&mut rx);
    assert_eq!(shards[0]["id"], id.as_str());
    assert_eq!(shards[0]["type"], TYPE_PURCHASE);
    assert_eq!(shards[0]["data"]["oi"], order_id);
    assert_eq!(shards[0]["data"]["co"].as_array().unwrap().len(), 3);
}

#[test]
fn test_track_views_and_search_term() {
    let (container, mut rx) = open(1);
    let predict = container.predict();

    let cases = [
        (
            predict.track_item_view("itemId123456789").unwrap(),
            TYPE_ITEM_VIEW,
            "v",
            "itemId123456789",
        ),
        (
            predict.track_category_view("categoryId123456789").unwrap(),
            TYPE_CATEGORY_VIEW,
            "vc",
            "categoryId123456789",
        ),
        (
            predict.track_search_term("searchTerm123456789").unwrap(),
            TYPE_SEARCH_TERM,
            "q",
            "searchTerm123456789",
        ),
    ];

    for (id, shard_type, key, value) in cases {
        let payload = rx.try_recv().unwrap().payload.unwrap();
        let shard = &payload["shards"][0];
        assert_eq!(shard["id"], id.as_str());
        assert_eq!(shard["type"], shard_type);
        assert_eq!(shard["data"][key], value);
    }
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_multiple_invocations_are_merged_in_order() {
    let (container, mut rx) = open(5);
    let predict = container.predict();

    predict.track_cart(&cart_items()).unwrap();
    predict.track_purchase("order-1", &cart_items()).unwrap();
    predict.track_category_view("shoes").unwrap();
    predict.track_item_view("item1").unwrap();
    assert!(rx.try_recv().is_err());

    predict.track_search_term("boots").unwrap();

    let types: Vec<String> = sent_shards(&mut rx)
        .iter()
        .map(|s| s["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        types,
        vec![TYPE_CART, TYPE_PURCHASE, TYPE_CATEGORY_VIEW, TYPE_ITEM_VIEW, TYPE_SEARCH_TERM]
    );
}

#[test]
fn test_contact_is_attached_until_cleared() {
    let (container, mut rx) = open(1);
    let predict = container.predict();

    predict.track_item_view("before").unwrap();
    assert!(sent_shards(&mut rx)[0]["data"].get("ci").is_none());

    predict.set_contact("contact-1").unwrap();
    predict.track_item_view("during").unwrap();
    assert_eq!(sent_shards(&mut rx)[0]["data"]["ci"], "contact-1");

    predict.clear_contact().unwrap();
    assert_eq!(predict.contact().unwrap(), None);
    predict.track_item_view("after").unwrap();
    assert!(sent_shards(&mut rx)[0]["data"].get("ci").is_none());
}

#[test]
fn test_contact_survives_reopen() {
    let dir = tempdir().unwrap();
    let paths = Paths::with_base_dir(dir.path().to_path_buf());

    {
        let (manager, _rx) = ChannelRequestManager::new();
        let container = CoreContainer::open(config(1), &paths, Arc::new(manager)).unwrap();
        container.predict().set_contact("contact-1").unwrap();
    }

    let (manager, _rx) = ChannelRequestManager::new();
    let container = CoreContainer::open(config(1), &paths, Arc::new(manager)).unwrap();
    assert_eq!(
        container.predict().contact().unwrap().as_deref(),
        Some("contact-1")
    );
}

#[test]
fn test_failed_flush_still_returns_id_and_buffers_event() {
    let (manager, rx) = ChannelRequestManager::new();
    drop(rx);
    let container = CoreContainer::open_in_memory(config(1), Arc::new(manager)).unwrap();

    let id = container.predict().track_search_term("boots").unwrap();

    let buffered = container.shard_repository().query(&Everything).unwrap();
    assert_eq!(buffered.len(), 1);
    assert_eq!(buffered[0].id, id);
    assert_eq!(buffered[0].shard_type, TYPE_SEARCH_TERM);
}
