//! # Ledger
//!
//! Binding of the gateway to one channel: the initialised channel, its
//! organization → peers map, the event manager, the query handler and the
//! contracts created so far.

use crate::config::{DiscoverySection, GatewayConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::ports::ClientConnector;
use gw_01_commit_events::{EventManager, EventManagerApi};
use gw_02_query_routing::{create_query_handler, PeerUsageTable, QueryHandler};
use gw_03_transactions::Contract;
use parking_lot::Mutex;
use shared_types::{ChannelGateway, ChannelInitOptions, PeerInfo, PeerMap};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Ledger {
    channel: Arc<dyn ChannelGateway>,
    peer_map: PeerMap,
    event_manager: Option<EventManager>,
    query_handler: Arc<dyn QueryHandler>,
    contracts: Mutex<HashMap<String, Arc<Contract>>>,
}

impl Ledger {
    /// Initialise the channel and build the handlers for it.
    ///
    /// # Errors
    ///
    /// - `NoLedgerPeers` / `ChannelInitialization` when the channel cannot
    ///   be initialised from any ledger-query peer
    /// - `NoOrganizationPeers` when no channel peer has an organization
    /// - `Commit` when the event manager cannot establish its sources
    pub async fn initialize(
        channel: Arc<dyn ChannelGateway>,
        client: &dyn ClientConnector,
        config: &GatewayConfig,
        usage: &PeerUsageTable,
    ) -> GatewayResult<Self> {
        initialize_channel(channel.as_ref(), &config.discovery).await?;
        let peer_map = map_peers_to_msp(channel.peers())?;
        let msp_id = client.msp_id();

        let event_manager = if config.event_manager.enabled {
            let manager = EventManager::new(
                channel.name(),
                msp_id.clone(),
                peer_map.clone(),
                client.event_hub_factory(channel.name())?,
                config.event_manager.to_event_manager_config(),
            )?;
            manager.initialize().await?;
            Some(manager)
        } else {
            None
        };

        let query_handler = create_query_handler(
            config.query.handler,
            channel.clone(),
            &msp_id,
            &peer_map,
            usage,
        );
        query_handler.initialize().await?;

        info!(
            channel = %channel.name(),
            msp_id = %msp_id,
            organizations = peer_map.len(),
            query_handler = %config.query.handler,
            events = event_manager.is_some(),
            "Ledger initialized"
        );

        Ok(Self {
            channel,
            peer_map,
            event_manager,
            query_handler,
            contracts: Mutex::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        self.channel.name()
    }

    pub fn channel(&self) -> Arc<dyn ChannelGateway> {
        self.channel.clone()
    }

    pub fn peer_map(&self) -> &PeerMap {
        &self.peer_map
    }

    pub fn event_manager(&self) -> Option<&EventManager> {
        self.event_manager.as_ref()
    }

    /// Contract for `chaincode_id`, cached under `chaincode_id` or
    /// `chaincode_id~namespace`.
    pub fn get_contract(&self, chaincode_id: &str, namespace: Option<&str>) -> Arc<Contract> {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        let key = match namespace {
            Some(ns) => format!("{}~{}", chaincode_id, ns),
            None => chaincode_id.to_string(),
        };

        self.contracts
            .lock()
            .entry(key)
            .or_insert_with(|| {
                let event_manager = self
                    .event_manager
                    .clone()
                    .map(|m| Arc::new(m) as Arc<dyn EventManagerApi>);
                Arc::new(Contract::new(
                    self.channel.clone(),
                    chaincode_id,
                    namespace.map(str::to_string),
                    event_manager,
                    self.query_handler.clone(),
                ))
            })
            .clone()
    }

    pub fn contract_count(&self) -> usize {
        self.contracts.lock().len()
    }

    /// Dispose the handlers, close the channel and forget every contract.
    pub async fn dispose(&self) {
        if let Some(manager) = &self.event_manager {
            manager.dispose().await;
        }
        self.query_handler.dispose().await;
        self.channel.close();
        self.contracts.lock().clear();
        info!(channel = %self.channel.name(), "Ledger disposed");
    }
}

/// Initialise `channel` from the first ledger-query peer that answers.
async fn initialize_channel(
    channel: &dyn ChannelGateway,
    discovery: &DiscoverySection,
) -> GatewayResult<()> {
    let ledger_peers: Vec<PeerInfo> = channel
        .peers()
        .into_iter()
        .filter(|p| p.roles.ledger_query)
        .collect();
    if ledger_peers.is_empty() {
        return Err(GatewayError::NoLedgerPeers);
    }

    let mut last_error = String::new();
    for peer in &ledger_peers {
        let options = ChannelInitOptions {
            target: Some(peer.clone()),
            discover: discovery.enabled,
            as_localhost: discovery.enabled && discovery.as_localhost,
        };
        match channel.initialize(options).await {
            Ok(()) => {
                debug!(channel = %channel.name(), peer = %peer.name, "Channel initialized");
                return Ok(());
            }
            Err(err) => {
                warn!(channel = %channel.name(), peer = %peer.name, error = %err, "Channel initialization failed");
                last_error = err.to_string();
            }
        }
    }

    Err(GatewayError::ChannelInitialization {
        attempted: ledger_peers.len(),
        last_error,
    })
}

fn map_peers_to_msp(peers: Vec<PeerInfo>) -> GatewayResult<PeerMap> {
    let peer_map = PeerMap::from_peers(peers);
    if peer_map.is_empty() {
        return Err(GatewayError::NoOrganizationPeers);
    }
    Ok(peer_map)
}
