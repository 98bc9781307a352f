//! Scripted channel for handler tests.

use crate::domain::ChaincodeQuery;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    BroadcastResponse, ChaincodeResponse, ChannelError, ChannelGateway, ChannelInitOptions,
    Endorsement, PeerInfo, PeerResponseError, Proposal, ProposalRequest, ProposalResult,
    TransactionRequest, TxId,
};
use std::collections::HashMap;

#[derive(Clone)]
pub(crate) enum PeerScript {
    Payload(Vec<u8>),
    Status(u32, String),
    ChaincodeError(String),
    Unavailable,
    Transport,
    Empty,
}

pub(crate) struct ScriptedChannel {
    scripts: Mutex<HashMap<String, PeerScript>>,
    calls: Mutex<Vec<String>>,
    max_targets: Mutex<usize>,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            max_targets: Mutex::new(0),
        }
    }

    pub(crate) fn script(&self, peer: &str, script: PeerScript) {
        self.scripts.lock().insert(peer.to_string(), script);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub(crate) fn max_targets(&self) -> usize {
        *self.max_targets.lock()
    }
}

pub(crate) fn peers(names: &[&str]) -> Vec<PeerInfo> {
    names.iter().map(|n| PeerInfo::new(*n, "Org1MSP")).collect()
}

pub(crate) fn query() -> ChaincodeQuery {
    ChaincodeQuery::new("fabcar", "queryCar", vec!["CAR1".into()], TxId::new("q1"))
}

#[async_trait]
impl ChannelGateway for ScriptedChannel {
    fn name(&self) -> &str {
        "mychannel"
    }

    fn peers(&self) -> Vec<PeerInfo> {
        Vec::new()
    }

    async fn initialize(&self, _options: ChannelInitOptions) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn send_transaction_proposal(
        &self,
        request: ProposalRequest,
    ) -> Result<ProposalResult, ChannelError> {
        let targets = request.targets.clone().unwrap_or_default();
        {
            let mut max = self.max_targets.lock();
            *max = (*max).max(targets.len());
        }
        let peer = targets
            .first()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        self.calls.lock().push(peer.clone());

        let script = self
            .scripts
            .lock()
            .get(&peer)
            .cloned()
            .unwrap_or(PeerScript::Unavailable);
        let response = match script {
            PeerScript::Transport => {
                return Err(ChannelError::Transport {
                    target: peer,
                    reason: "connection refused".into(),
                })
            }
            PeerScript::Empty => None,
            PeerScript::Payload(payload) => Some(Ok(Endorsement {
                peer: peer.clone(),
                response: ChaincodeResponse::ok(payload),
                results: Vec::new(),
            })),
            PeerScript::Status(status, message) => Some(Ok(Endorsement {
                peer: peer.clone(),
                response: ChaincodeResponse {
                    status,
                    message,
                    payload: Vec::new(),
                },
                results: Vec::new(),
            })),
            PeerScript::ChaincodeError(message) => Some(Err(PeerResponseError {
                peer: Some(peer.clone()),
                code: Some(2),
                message,
                is_proposal_response: true,
            })),
            PeerScript::Unavailable => Some(Err(PeerResponseError::unavailable(peer.clone()))),
        };

        Ok(ProposalResult {
            responses: response.into_iter().collect(),
            proposal: Proposal {
                tx_id: request.tx_id,
                bytes: Vec::new(),
            },
        })
    }

    async fn send_transaction(
        &self,
        _request: TransactionRequest,
    ) -> Result<BroadcastResponse, ChannelError> {
        Ok(BroadcastResponse::success())
    }

    fn verify_proposal_response(&self, _response: &Endorsement) -> bool {
        true
    }

    fn compare_proposal_response_results(&self, _responses: &[Endorsement]) -> bool {
        true
    }

    fn close(&self) {}
}
