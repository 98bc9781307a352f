//! # Channel Port
//!
//! Driven port implemented by the underlying client library. Every remote
//! operation the gateway performs on a channel goes through this trait.

use crate::entities::PeerInfo;
use crate::errors::ChannelError;
use crate::proposal::{
    BroadcastResponse, Endorsement, ProposalRequest, ProposalResult, TransactionRequest,
};
use async_trait::async_trait;

/// Options for channel initialization against a single peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelInitOptions {
    /// Peer to load the channel configuration from.
    pub target: Option<PeerInfo>,
    /// Use service discovery for endorsement targets.
    pub discover: bool,
    /// Map discovered addresses to localhost (development networks).
    pub as_localhost: bool,
}

/// Operations the gateway consumes from a channel.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Channel name.
    fn name(&self) -> &str;

    /// All peers currently known on the channel.
    fn peers(&self) -> Vec<PeerInfo>;

    /// Load channel configuration from `options.target`.
    async fn initialize(&self, options: ChannelInitOptions) -> Result<(), ChannelError>;

    /// Send a proposal to the endorsers (or to `request.targets`).
    async fn send_transaction_proposal(
        &self,
        request: ProposalRequest,
    ) -> Result<ProposalResult, ChannelError>;

    /// Broadcast an endorsed transaction to the ordering service.
    async fn send_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<BroadcastResponse, ChannelError>;

    /// Verify the endorser signature on a proposal response.
    fn verify_proposal_response(&self, response: &Endorsement) -> bool;

    /// True when every response carries the same read/write set.
    fn compare_proposal_response_results(&self, responses: &[Endorsement]) -> bool;

    /// Release channel resources.
    fn close(&self);
}
