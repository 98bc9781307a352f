//! Event source wrapper

use crate::ports::outbound::{ConnectionState, EventHub};
use shared_types::{MspId, PeerInfo};
use std::fmt;
use std::sync::Arc;

/// One peer able to emit transaction events, tagged with its organization.
///
/// The organization id is copied from the peer at construction and cannot be
/// changed afterwards. Cloning shares the underlying hub.
#[derive(Clone)]
pub struct EventSource {
    peer: PeerInfo,
    msp_id: MspId,
    hub: Arc<dyn EventHub>,
}

impl EventSource {
    pub fn new(peer: PeerInfo, hub: Arc<dyn EventHub>) -> Self {
        Self {
            msp_id: peer.msp_id().clone(),
            peer,
            hub,
        }
    }

    pub fn peer(&self) -> &PeerInfo {
        &self.peer
    }

    pub fn peer_name(&self) -> &str {
        &self.peer.name
    }

    pub fn msp_id(&self) -> &MspId {
        &self.msp_id
    }

    pub fn hub(&self) -> &Arc<dyn EventHub> {
        &self.hub
    }

    /// Whether both sources are backed by the same hub instance.
    pub fn shares_hub(&self, other: &EventSource) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.hub), Arc::as_ptr(&other.hub))
    }

    /// A source is live when the hub reports a connection and its channel
    /// state is `Ready`. `Idle` and `Connecting` do not count.
    pub async fn is_live(&self) -> bool {
        self.hub.is_connected() && self.hub.check_connection(false).await == ConnectionState::Ready
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("peer", &self.peer.name)
            .field("msp_id", &self.msp_id)
            .field("connected", &self.hub.is_connected())
            .finish()
    }
}
