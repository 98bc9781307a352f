//! # Gateway
//!
//! Entry point for one client identity: owns the configuration and caches
//! one initialised `Ledger` per channel.

use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::ledger::Ledger;
use crate::ports::ClientConnector;
use gw_02_query_routing::PeerUsageTable;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub struct Gateway {
    config: GatewayConfig,
    client: Arc<dyn ClientConnector>,
    /// Round-robin usage counts shared by every ledger of this gateway.
    usage: PeerUsageTable,
    ledgers: Mutex<HashMap<String, Arc<Ledger>>>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, client: Arc<dyn ClientConnector>) -> Self {
        Self {
            config,
            client,
            usage: PeerUsageTable::new(),
            ledgers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn usage(&self) -> &PeerUsageTable {
        &self.usage
    }

    /// Initialised ledger for `channel_name`, created on first use.
    ///
    /// Concurrent callers for the same channel share one initialisation.
    pub async fn get_ledger(&self, channel_name: &str) -> GatewayResult<Arc<Ledger>> {
        let mut ledgers = self.ledgers.lock().await;
        if let Some(ledger) = ledgers.get(channel_name) {
            return Ok(ledger.clone());
        }

        let channel = self.client.channel(channel_name)?;
        let ledger = Arc::new(
            Ledger::initialize(channel, self.client.as_ref(), &self.config, &self.usage).await?,
        );
        ledgers.insert(channel_name.to_string(), ledger.clone());
        Ok(ledger)
    }

    pub async fn ledger_count(&self) -> usize {
        self.ledgers.lock().await.len()
    }

    /// Dispose every ledger and clear the cache.
    pub async fn dispose(&self) {
        let ledgers: Vec<Arc<Ledger>> = self.ledgers.lock().await.drain().map(|(_, l)| l).collect();
        for ledger in &ledgers {
            ledger.dispose().await;
        }
        info!(ledgers = ledgers.len(), "Gateway disposed");
    }
}
