//! Outbound port to the underlying client library

use crate::error::GatewayResult;
use gw_01_commit_events::EventHubFactory;
use shared_types::{ChannelGateway, MspId};
use std::sync::Arc;

/// Connection to the network on behalf of one identity.
pub trait ClientConnector: Send + Sync {
    /// Organization of the current identity.
    fn msp_id(&self) -> MspId;

    /// Channel handle by name.
    fn channel(&self, name: &str) -> GatewayResult<Arc<dyn ChannelGateway>>;

    /// Factory for event hubs on the peers of `channel`.
    fn event_hub_factory(&self, channel: &str) -> GatewayResult<Arc<dyn EventHubFactory>>;
}
