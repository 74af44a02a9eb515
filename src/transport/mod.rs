//! Peer Transport
//!
//! Request/response delivery between named nodes. The log core only ever
//! needs one primitive from it: send a request to a peer and wait for the
//! reply correlated with it. Delivery guarantees (and any retrying) belong
//! to the implementation, not to the caller.
//!
//! - **`protocol`**: the peer envelopes and the internal endpoint they travel on.
//! - **`http`**: `HttpTransport`, JSON over HTTP using each member's address.

pub mod http;
pub mod protocol;

use crate::membership::types::NodeId;
use protocol::{PeerReply, PeerRequest};
use std::future::Future;

pub trait Transport: Send + Sync + 'static {
    /// Delivers `request` to `target` and resolves with the peer's reply.
    fn call(
        &self,
        target: &NodeId,
        request: PeerRequest,
    ) -> impl Future<Output = anyhow::Result<PeerReply>> + Send;
}
