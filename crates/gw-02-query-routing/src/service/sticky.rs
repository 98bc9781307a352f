//! Sticky failover routing
//!
//! Keeps asking the peer that last answered. When it fails, the remaining
//! peers are scanned in order and the first one that answers becomes the
//! new sticky peer.

use super::single_peer::{query_single_peer, PeerOutcome};
use crate::domain::ChaincodeQuery;
use crate::error::{QueryError, QueryResult};
use crate::ports::inbound::QueryHandler;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{ChannelGateway, PeerInfo};
use std::sync::Arc;
use tracing::debug;

pub struct StickyQueryHandler {
    channel: Arc<dyn ChannelGateway>,
    peers: Vec<PeerInfo>,
    cursor: Mutex<Option<usize>>,
}

impl StickyQueryHandler {
    pub fn new(channel: Arc<dyn ChannelGateway>, peers: Vec<PeerInfo>) -> Self {
        Self {
            channel,
            peers,
            cursor: Mutex::new(None),
        }
    }

    pub fn peers(&self) -> &[PeerInfo] {
        &self.peers
    }

    /// Index of the peer that answered last.
    pub fn sticky_index(&self) -> Option<usize> {
        *self.cursor.lock()
    }

    pub async fn query_chaincode(&self, query: &ChaincodeQuery) -> QueryResult<Vec<u8>> {
        if self.peers.is_empty() {
            return Err(QueryError::NoPeersAvailable { last_error: None });
        }

        let mut last_error = None;
        let sticky = self.sticky_index();

        if let Some(index) = sticky {
            match query_single_peer(self.channel.as_ref(), &self.peers[index], query).await {
                PeerOutcome::Answered(answer) => return answer,
                PeerOutcome::Unusable(reason) => last_error = Some(reason),
            }
        }

        *self.cursor.lock() = None;
        for (index, peer) in self.peers.iter().enumerate() {
            if Some(index) == sticky {
                continue;
            }
            match query_single_peer(self.channel.as_ref(), peer, query).await {
                PeerOutcome::Answered(answer) => {
                    debug!(peer = %peer.name, index, "New sticky query peer");
                    *self.cursor.lock() = Some(index);
                    return answer;
                }
                PeerOutcome::Unusable(reason) => last_error = Some(reason),
            }
        }

        Err(QueryError::NoPeersAvailable { last_error })
    }
}

#[async_trait]
impl QueryHandler for StickyQueryHandler {
    async fn query_chaincode(&self, query: &ChaincodeQuery) -> QueryResult<Vec<u8>> {
        StickyQueryHandler::query_chaincode(self, query).await
    }

    async fn dispose(&self) {
        *self.cursor.lock() = None;
    }
}
