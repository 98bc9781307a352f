//! Query handler implementations

mod round_robin;
mod single_peer;
mod sticky;

#[cfg(test)]
pub(crate) mod test_support;

pub use round_robin::RoundRobinQueryHandler;
pub use sticky::StickyQueryHandler;

use crate::domain::{PeerUsageTable, QueryHandlerKind};
use crate::ports::inbound::QueryHandler;
use shared_types::{ChannelGateway, MspId, PeerInfo, PeerMap};
use std::sync::Arc;

/// Peers of `msp_id` that answer chaincode queries, in peer map order.
pub fn queryable_peers(msp_id: &MspId, peer_map: &PeerMap) -> Vec<PeerInfo> {
    peer_map
        .get(msp_id)
        .iter()
        .filter(|peer| peer.roles.chaincode_query)
        .cloned()
        .collect()
}

/// Build the handler selected by `kind` over the queryable peers of `msp_id`.
pub fn create_query_handler(
    kind: QueryHandlerKind,
    channel: Arc<dyn ChannelGateway>,
    msp_id: &MspId,
    peer_map: &PeerMap,
    usage: &PeerUsageTable,
) -> Arc<dyn QueryHandler> {
    let peers = queryable_peers(msp_id, peer_map);
    match kind {
        QueryHandlerKind::Sticky => Arc::new(StickyQueryHandler::new(channel, peers)),
        QueryHandlerKind::RoundRobin => {
            Arc::new(RoundRobinQueryHandler::new(channel, peers, usage.clone()))
        }
    }
}
