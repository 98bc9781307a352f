//! Usage-weighted round robin routing
//!
//! Each query starts with the least used peer. A peer's counter grows only
//! when it answers.

use super::single_peer::{query_single_peer, PeerOutcome};
use crate::domain::{ChaincodeQuery, PeerUsageTable};
use crate::error::{QueryError, QueryResult};
use crate::ports::inbound::QueryHandler;
use async_trait::async_trait;
use shared_types::{ChannelGateway, PeerInfo};
use std::sync::Arc;

pub struct RoundRobinQueryHandler {
    channel: Arc<dyn ChannelGateway>,
    peers: Vec<PeerInfo>,
    usage: PeerUsageTable,
}

impl RoundRobinQueryHandler {
    pub fn new(channel: Arc<dyn ChannelGateway>, peers: Vec<PeerInfo>, usage: PeerUsageTable) -> Self {
        Self {
            channel,
            peers,
            usage,
        }
    }

    pub fn usage(&self) -> &PeerUsageTable {
        &self.usage
    }

    /// Handler peers sorted by ascending usage.
    pub fn peers_in_order(&self) -> Vec<PeerInfo> {
        self.usage.order(&self.peers)
    }

    pub async fn query_chaincode(&self, query: &ChaincodeQuery) -> QueryResult<Vec<u8>> {
        if self.peers.is_empty() {
            return Err(QueryError::NoPeersAvailable { last_error: None });
        }

        let mut last_error = None;
        for peer in self.peers_in_order() {
            match query_single_peer(self.channel.as_ref(), &peer, query).await {
                PeerOutcome::Answered(answer) => {
                    self.usage.record_success(&peer.name);
                    return answer;
                }
                PeerOutcome::Unusable(reason) => last_error = Some(reason),
            }
        }

        Err(QueryError::NoPeersAvailable { last_error })
    }
}

#[async_trait]
impl QueryHandler for RoundRobinQueryHandler {
    async fn query_chaincode(&self, query: &ChaincodeQuery) -> QueryResult<Vec<u8>> {
        RoundRobinQueryHandler::query_chaincode(self, query).await
    }
}
