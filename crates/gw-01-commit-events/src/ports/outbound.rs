//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The event hub is the client library's per-peer event stream. The gateway
//! never implements the wire protocol; it only registers callbacks and reads
//! connection state.

use crate::error::EventHubError;
use async_trait::async_trait;
use shared_types::{PeerInfo, TxId, TxValidationCode};
use std::fmt;
use std::sync::Arc;

/// Called with the commit code of the registered transaction.
pub type TxEventCallback = Box<dyn Fn(TxValidationCode) + Send + Sync>;

/// Called with the number of each received block.
pub type BlockEventCallback = Box<dyn Fn(u64) + Send + Sync>;

/// Called when the stream behind a registration fails.
pub type EventErrorCallback = Box<dyn Fn(EventHubError) + Send + Sync>;

/// Handle returned by a registration, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg-{}", self.0)
    }
}

/// Connectivity state of the channel underneath an event hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Ready,
    TransientFailure,
    Shutdown,
}

/// Event stream of a single peer.
#[async_trait]
pub trait EventHub: Send + Sync {
    /// Name of the peer this hub streams from.
    fn peer_name(&self) -> &str;

    /// Start connecting. Returns immediately; the outcome is reported through
    /// registered block callbacks (first block or error).
    fn connect(&self, full_block: bool);

    /// Close the stream. Outstanding registrations receive an error.
    fn disconnect(&self);

    /// Current connection state. With `force_reconnect` a hub that is not
    /// ready attempts to reconnect.
    async fn check_connection(&self, force_reconnect: bool) -> ConnectionState;

    /// Whether the hub believes it is connected.
    fn is_connected(&self) -> bool;

    /// Listen for the commit of one transaction.
    fn register_tx_event(
        &self,
        tx_id: &TxId,
        on_event: TxEventCallback,
        on_error: EventErrorCallback,
    ) -> Result<RegistrationId, EventHubError>;

    /// Remove a transaction registration. Unknown handles are ignored.
    fn unregister_tx_event(&self, registration: RegistrationId);

    /// Listen for every block.
    fn register_block_event(
        &self,
        on_block: BlockEventCallback,
        on_error: EventErrorCallback,
    ) -> Result<RegistrationId, EventHubError>;

    /// Remove a block registration. Unknown handles are ignored.
    fn unregister_block_event(&self, registration: RegistrationId);
}

/// Creates event hubs for peers of one channel.
pub trait EventHubFactory: Send + Sync {
    fn create(&self, peer: &PeerInfo) -> Arc<dyn EventHub>;
}
