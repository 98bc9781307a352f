//! # Proposal Types
//!
//! Requests and responses exchanged with endorsing peers and the ordering
//! service. Payloads are opaque bytes.

use crate::entities::{PeerInfo, TxId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chaincode response status for success.
pub const STATUS_OK: u32 = 200;

/// gRPC status code for an unavailable service.
pub const GRPC_UNAVAILABLE: u32 = 14;

/// Broadcast status returned by the orderer on acceptance.
pub const BROADCAST_SUCCESS: &str = "SUCCESS";

/// A transaction proposal to be endorsed (or evaluated, for queries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<String>,
    pub tx_id: TxId,
    /// Explicit target peers. `None` lets the client library pick endorsers.
    pub targets: Option<Vec<PeerInfo>>,
}

impl ProposalRequest {
    pub fn new(
        chaincode_id: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
        tx_id: TxId,
    ) -> Self {
        Self {
            chaincode_id: chaincode_id.into(),
            function: function.into(),
            args,
            tx_id,
            targets: None,
        }
    }

    #[must_use]
    pub fn with_targets(mut self, targets: Vec<PeerInfo>) -> Self {
        self.targets = Some(targets);
        self
    }
}

/// Signed proposal handle, returned by the endorsement round and handed back
/// unchanged when the transaction is broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub tx_id: TxId,
    pub bytes: Vec<u8>,
}

/// Chaincode-level response embedded in an endorsement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeResponse {
    pub status: u32,
    pub message: String,
    pub payload: Vec<u8>,
}

impl ChaincodeResponse {
    pub fn ok(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: STATUS_OK,
            message: String::new(),
            payload: payload.into(),
        }
    }
}

/// A proposal response that came back from a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    /// Name of the endorsing peer.
    pub peer: String,
    pub response: ChaincodeResponse,
    /// Simulation results (read/write set), compared across endorsers.
    pub results: Vec<u8>,
}

/// A peer-level failure in place of an endorsement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerResponseError {
    pub peer: Option<String>,
    /// Transport or chaincode status code when one was reported.
    pub code: Option<u32>,
    pub message: String,
    /// The error was produced by the peer's proposal processing rather than
    /// by the transport.
    pub is_proposal_response: bool,
}

impl PeerResponseError {
    pub fn transport(peer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            peer: Some(peer.into()),
            code: None,
            message: message.into(),
            is_proposal_response: false,
        }
    }

    pub fn unavailable(peer: impl Into<String>) -> Self {
        Self {
            peer: Some(peer.into()),
            code: Some(GRPC_UNAVAILABLE),
            message: "14 UNAVAILABLE: connect failed".to_string(),
            is_proposal_response: false,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.code == Some(GRPC_UNAVAILABLE)
    }
}

impl fmt::Display for PeerResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.peer {
            Some(peer) => write!(f, "{}: {}", peer, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// One entry per targeted peer.
pub type ProposalResponse = Result<Endorsement, PeerResponseError>;

/// Outcome of an endorsement round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalResult {
    pub responses: Vec<ProposalResponse>,
    pub proposal: Proposal,
}

/// Endorsed transaction to broadcast to the ordering service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub proposal: Proposal,
    pub responses: Vec<Endorsement>,
}

/// Orderer acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub status: String,
    pub info: String,
}

impl BroadcastResponse {
    pub fn success() -> Self {
        Self {
            status: BROADCAST_SUCCESS.to_string(),
            info: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BROADCAST_SUCCESS
    }
}
