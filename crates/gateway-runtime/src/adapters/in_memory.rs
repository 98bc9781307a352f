//! # In-Memory Network
//!
//! A channel and client that run entirely in process. Endorsement calls a
//! registered chaincode function on each target peer; an accepted broadcast
//! emits the configured validation code on every event-source peer's
//! in-memory event hub.

use crate::error::{GatewayError, GatewayResult};
use crate::ports::ClientConnector;
use async_trait::async_trait;
use gw_01_commit_events::{EventHubFactory, InMemoryEventHubFactory};
use parking_lot::Mutex;
use shared_types::{
    BroadcastResponse, ChaincodeResponse, ChannelError, ChannelGateway, ChannelInitOptions,
    Endorsement, MspId, PeerInfo, PeerResponseError, Proposal, ProposalRequest, ProposalResult,
    TransactionRequest, TxValidationCode, BROADCAST_SUCCESS,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Chaincode logic: function name and args to a response.
pub type ChaincodeFn = Arc<dyn Fn(&str, &[String]) -> ChaincodeResponse + Send + Sync>;

struct ChannelState {
    chaincodes: HashMap<String, ChaincodeFn>,
    unreachable: HashSet<String>,
    init_failures: HashSet<String>,
    init_attempts: Vec<String>,
    init_options: Option<ChannelInitOptions>,
    broadcast_status: String,
    commit_code: TxValidationCode,
    proposals: Vec<ProposalRequest>,
    broadcasts: usize,
    closed: bool,
}

/// In-process channel backed by in-memory event hubs.
pub struct InMemoryChannel {
    name: String,
    peers: Vec<PeerInfo>,
    hubs: Arc<InMemoryEventHubFactory>,
    state: Mutex<ChannelState>,
}

impl InMemoryChannel {
    pub fn new(name: impl Into<String>, peers: Vec<PeerInfo>) -> Self {
        Self {
            name: name.into(),
            peers,
            hubs: Arc::new(InMemoryEventHubFactory::new()),
            state: Mutex::new(ChannelState {
                chaincodes: HashMap::new(),
                unreachable: HashSet::new(),
                init_failures: HashSet::new(),
                init_attempts: Vec::new(),
                init_options: None,
                broadcast_status: BROADCAST_SUCCESS.to_string(),
                commit_code: TxValidationCode::Valid,
                proposals: Vec::new(),
                broadcasts: 0,
                closed: false,
            }),
        }
    }

    /// Install chaincode logic for `chaincode_id` on every peer.
    pub fn install_chaincode(&self, chaincode_id: &str, logic: ChaincodeFn) {
        self.state
            .lock()
            .chaincodes
            .insert(chaincode_id.to_string(), logic);
    }

    /// Make a peer unreachable (or reachable again).
    pub fn set_unreachable(&self, peer: &str, unreachable: bool) {
        let mut state = self.state.lock();
        if unreachable {
            state.unreachable.insert(peer.to_string());
        } else {
            state.unreachable.remove(peer);
        }
    }

    /// Fail channel initialization when `peer` is the target.
    pub fn fail_initialization_from(&self, peer: &str) {
        self.state.lock().init_failures.insert(peer.to_string());
    }

    pub fn set_broadcast_status(&self, status: impl Into<String>) {
        self.state.lock().broadcast_status = status.into();
    }

    /// Validation code reported by every peer after an accepted broadcast.
    pub fn set_commit_code(&self, code: TxValidationCode) {
        self.state.lock().commit_code = code;
    }

    pub fn hubs(&self) -> Arc<InMemoryEventHubFactory> {
        self.hubs.clone()
    }

    pub fn init_attempts(&self) -> Vec<String> {
        self.state.lock().init_attempts.clone()
    }

    pub fn init_options(&self) -> Option<ChannelInitOptions> {
        self.state.lock().init_options.clone()
    }

    /// Peer names targeted by each proposal so far.
    pub fn proposal_targets(&self) -> Vec<Vec<String>> {
        self.state
            .lock()
            .proposals
            .iter()
            .map(|p| {
                p.targets
                    .as_ref()
                    .map(|t| t.iter().map(|peer| peer.name.clone()).collect())
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn broadcast_count(&self) -> usize {
        self.state.lock().broadcasts
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn endorse(
        &self,
        peer: &PeerInfo,
        request: &ProposalRequest,
        state: &ChannelState,
    ) -> Result<Endorsement, PeerResponseError> {
        if state.unreachable.contains(&peer.name) {
            return Err(PeerResponseError::unavailable(peer.name.clone()));
        }
        let response = match state.chaincodes.get(&request.chaincode_id) {
            Some(logic) => logic(&request.function, &request.args),
            None => {
                return Err(PeerResponseError {
                    peer: Some(peer.name.clone()),
                    code: Some(500),
                    message: format!("chaincode {} is not installed", request.chaincode_id),
                    is_proposal_response: true,
                })
            }
        };
        Ok(Endorsement {
            peer: peer.name.clone(),
            results: response.payload.clone(),
            response,
        })
    }
}

#[async_trait]
impl ChannelGateway for InMemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn peers(&self) -> Vec<PeerInfo> {
        self.peers.clone()
    }

    async fn initialize(&self, options: ChannelInitOptions) -> Result<(), ChannelError> {
        let target = options
            .target
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let mut state = self.state.lock();
        state.init_attempts.push(target.clone());
        if state.init_failures.contains(&target) || state.unreachable.contains(&target) {
            return Err(ChannelError::Transport {
                target,
                reason: "connection refused".to_string(),
            });
        }
        state.init_options = Some(options);
        state.closed = false;
        Ok(())
    }

    async fn send_transaction_proposal(
        &self,
        request: ProposalRequest,
    ) -> Result<ProposalResult, ChannelError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ChannelError::Closed {
                channel: self.name.clone(),
            });
        }
        let targets: Vec<PeerInfo> = match &request.targets {
            Some(targets) => targets.clone(),
            None => self.peers.iter().filter(|p| p.roles.endorsing).cloned().collect(),
        };
        let responses = targets
            .iter()
            .map(|peer| self.endorse(peer, &request, &state))
            .collect();
        let proposal = Proposal {
            tx_id: request.tx_id.clone(),
            bytes: request.function.as_bytes().to_vec(),
        };
        state.proposals.push(request);
        Ok(ProposalResult {
            responses,
            proposal,
        })
    }

    async fn send_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<BroadcastResponse, ChannelError> {
        let (status, code) = {
            let mut state = self.state.lock();
            state.broadcasts += 1;
            (state.broadcast_status.clone(), state.commit_code.clone())
        };
        if status == BROADCAST_SUCCESS {
            let tx_id = &request.proposal.tx_id;
            for peer in self.peers.iter().filter(|p| p.roles.event_source) {
                let delivered = self.hubs.hub(&peer.name).emit_tx_event(tx_id, code.clone());
                debug!(peer = %peer.name, tx_id = %tx_id, delivered, "Commit event emitted");
            }
        }
        Ok(BroadcastResponse {
            status,
            info: String::new(),
        })
    }

    fn verify_proposal_response(&self, response: &Endorsement) -> bool {
        self.peers.iter().any(|p| p.name == response.peer)
    }

    fn compare_proposal_response_results(&self, responses: &[Endorsement]) -> bool {
        responses
            .windows(2)
            .all(|pair| pair[0].results == pair[1].results)
    }

    fn close(&self) {
        self.state.lock().closed = true;
    }
}

/// In-process client holding a fixed set of channels.
pub struct InMemoryClient {
    msp_id: MspId,
    channels: Mutex<HashMap<String, Arc<InMemoryChannel>>>,
}

impl InMemoryClient {
    pub fn new(msp_id: impl Into<MspId>) -> Self {
        Self {
            msp_id: msp_id.into(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_channel(&self, channel: Arc<InMemoryChannel>) {
        self.channels
            .lock()
            .insert(channel.name().to_string(), channel);
    }

    fn lookup(&self, name: &str) -> GatewayResult<Arc<InMemoryChannel>> {
        self.channels
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownChannel(name.to_string()))
    }
}

impl ClientConnector for InMemoryClient {
    fn msp_id(&self) -> MspId {
        self.msp_id.clone()
    }

    fn channel(&self, name: &str) -> GatewayResult<Arc<dyn ChannelGateway>> {
        Ok(self.lookup(name)?)
    }

    fn event_hub_factory(&self, channel: &str) -> GatewayResult<Arc<dyn EventHubFactory>> {
        Ok(self.lookup(channel)?.hubs())
    }
}
