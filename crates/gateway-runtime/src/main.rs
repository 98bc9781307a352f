//! # Gateway Runtime
//!
//! Runs one submit/query round trip against an in-process network.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging from `GW_*` environment variables
//! 2. Load configuration (file given as first argument, then environment)
//! 3. Open the ledger for `mychannel`
//! 4. Submit and query through a contract
//! 5. Dispose and log the metrics

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::info;

use gateway_runtime::adapters::{InMemoryChannel, InMemoryClient};
use gateway_runtime::{Gateway, GatewayConfig};
use gateway_telemetry::{gather_metrics, init_logging, TelemetryConfig};
use shared_types::{ChaincodeResponse, PeerInfo};

const CHANNEL: &str = "mychannel";
const CHAINCODE: &str = "assets";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::from_env()).context("initialising logging")?;

    let mut config = match std::env::args().nth(1) {
        Some(path) => GatewayConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => GatewayConfig::default(),
    };
    config.apply_env_overrides()?;
    info!(
        strategy = %config.event_manager.commit_strategy,
        query_handler = %config.query.handler,
        "Configuration loaded"
    );

    let gateway = Gateway::new(config, build_network());
    let ledger = gateway.get_ledger(CHANNEL).await?;
    let contract = ledger.get_contract(CHAINCODE, None);

    contract
        .submit_transaction("put", vec!["asset1".into(), "blue".into()], None)
        .await?;
    let value = contract.query("get", vec!["asset1".into()], None).await?;
    info!(
        value = %String::from_utf8_lossy(&value.unwrap_or_default()),
        "Query answered"
    );

    gateway.dispose().await;
    info!(metrics = %gather_metrics()?, "Final metrics");
    Ok(())
}

/// Two organizations, two peers each, with a key/value chaincode.
fn build_network() -> Arc<InMemoryClient> {
    let peers = vec![
        PeerInfo::new("peer0.org1.example.com", "Org1MSP"),
        PeerInfo::new("peer1.org1.example.com", "Org1MSP"),
        PeerInfo::new("peer0.org2.example.com", "Org2MSP"),
        PeerInfo::new("peer1.org2.example.com", "Org2MSP"),
    ];
    let channel = Arc::new(InMemoryChannel::new(CHANNEL, peers));

    let store: Arc<Mutex<HashMap<String, String>>> = Arc::default();
    channel.install_chaincode(
        CHAINCODE,
        Arc::new(move |function: &str, args: &[String]| {
            let mut store = store.lock();
            match (function, args) {
                ("put", [key, value]) => {
                    store.insert(key.clone(), value.clone());
                    ChaincodeResponse::ok(Vec::new())
                }
                ("get", [key]) => {
                    ChaincodeResponse::ok(store.get(key).cloned().unwrap_or_default())
                }
                _ => ChaincodeResponse {
                    status: 500,
                    message: format!("unknown function {}", function),
                    payload: Vec::new(),
                },
            }
        }),
    );

    let client = Arc::new(InMemoryClient::new("Org1MSP"));
    client.add_channel(channel);
    client
}
