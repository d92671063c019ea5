//! Outbound request model and the request manager seam.

use crate::{BatchError, BatchResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::debug;

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// A request waiting to be sent by the host's transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestModel {
    pub id: String,
    pub url: String,
    pub method: RequestMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Lifetime in milliseconds.
    pub ttl: i64,
}

/// Accepts requests for immediate delivery.
///
/// Transport is the host's concern; implementations hand requests over and
/// return once the request is accepted, not once it is delivered.
pub trait RequestManager: Send + Sync {
    fn submit_now(&self, request: RequestModel) -> BatchResult<()>;
}

/// Forwards requests over an unbounded tokio channel.
///
/// Submitting never blocks, so it is safe to call from a trigger running on
/// any thread; the receiving half is drained by an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelRequestManager {
    tx: mpsc::UnboundedSender<RequestModel>,
}

impl ChannelRequestManager {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RequestModel>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RequestManager for ChannelRequestManager {
    fn submit_now(&self, request: RequestModel) -> BatchResult<()> {
        let request_id = request.id.clone();
        self.tx
            .send(request)
            .map_err(|_| BatchError::Send(format!("Receiver dropped, request {request_id} lost")))?;
        debug!(request_id = %request_id, "Request submitted");
        Ok(())
    }
}
