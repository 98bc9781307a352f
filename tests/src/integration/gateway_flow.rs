//! # Gateway Flow
//!
//! Gateway → Ledger → Contract against an in-process network with a
//! key/value chaincode.

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use gateway_runtime::adapters::{InMemoryChannel, InMemoryClient};
    use gateway_runtime::{Gateway, GatewayConfig};
    use gateway_telemetry::gather_metrics;
    use gw_01_commit_events::{CommitError, CommitStrategy};
    use gw_02_query_routing::QueryHandlerKind;
    use gw_03_transactions::TransactionError;
    use parking_lot::Mutex;
    use shared_types::{ChaincodeResponse, PeerInfo, TxId, TxValidationCode};
    use std::collections::HashMap;
    use std::sync::Arc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const CHANNEL: &str = "mychannel";
    const PEERS: [(&str, &str); 4] = [
        ("peer0.org1", "Org1MSP"),
        ("peer1.org1", "Org1MSP"),
        ("peer0.org2", "Org2MSP"),
        ("peer1.org2", "Org2MSP"),
    ];

    fn network() -> (Arc<InMemoryChannel>, Arc<InMemoryClient>) {
        let channel = Arc::new(InMemoryChannel::new(
            CHANNEL,
            PEERS.iter().map(|(name, msp)| PeerInfo::new(*name, *msp)).collect(),
        ));

        let store: Arc<Mutex<HashMap<String, String>>> = Arc::default();
        channel.install_chaincode(
            "assets",
            Arc::new(move |function: &str, args: &[String]| {
                let mut store = store.lock();
                match (function, args) {
                    ("put", [key, value]) => {
                        store.insert(key.clone(), value.clone());
                        ChaincodeResponse::ok(value.clone())
                    }
                    ("get", [key]) => {
                        ChaincodeResponse::ok(store.get(key).cloned().unwrap_or_default())
                    }
                    ("ledger:height", []) => ChaincodeResponse::ok(store.len().to_string()),
                    _ => ChaincodeResponse {
                        status: 400,
                        message: format!("unknown function {}", function),
                        payload: Vec::new(),
                    },
                }
            }),
        );

        let client = Arc::new(InMemoryClient::new("Org1MSP"));
        client.add_channel(channel.clone());
        (channel, client)
    }

    fn registrations(channel: &InMemoryChannel, tx_id: &TxId) -> usize {
        PEERS
            .iter()
            .map(|(name, _)| channel.hubs().hub(name).tx_registration_count(tx_id))
            .sum()
    }

    // =============================================================================
    // SUBMIT AND QUERY
    // =============================================================================

    #[tokio::test]
    async fn test_submit_then_query() -> Result<()> {
        let (_, client) = network();
        let gateway = Gateway::new(GatewayConfig::default(), client);
        let contract = gateway.get_ledger(CHANNEL).await?.get_contract("assets", None);

        let written = contract
            .submit_transaction("put", vec!["asset1".into(), "blue".into()], None)
            .await?;
        assert_eq!(written, Some(b"blue".to_vec()));

        let value = contract.query("get", vec!["asset1".into()], None).await?;
        assert_eq!(value, Some(b"blue".to_vec()));

        let missing = contract.query("get", vec!["asset9".into()], None).await?;
        assert_eq!(missing, None);

        let metrics = gather_metrics()?;
        assert!(metrics.contains("gateway_commits_total"));
        assert!(metrics.contains("gateway_query_attempts_total"));

        gateway.dispose().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_namespaced_contract() -> Result<()> {
        let (_, client) = network();
        let gateway = Gateway::new(GatewayConfig::default(), client);
        let ledger = gateway.get_ledger(CHANNEL).await?;
        let contract = ledger.get_contract("assets", Some("ledger"));

        let height = contract.query("height", Vec::new(), None).await?;
        assert_eq!(height, Some(b"0".to_vec()));
        assert!(Arc::ptr_eq(&contract, &ledger.get_contract("assets", Some("ledger"))));
        Ok(())
    }

    #[tokio::test]
    async fn test_channel_wide_strategy_from_toml() -> Result<()> {
        let (channel, client) = network();
        let config = GatewayConfig::parse(
            r#"
            [event_manager]
            commit_strategy = "channelAll"
            commit_timeout_secs = 5

            [query]
            handler = "round_robin"
            "#,
        )?;
        let gateway = Gateway::new(config, client);
        let ledger = gateway.get_ledger(CHANNEL).await?;
        assert_eq!(
            ledger.event_manager().map(|m| m.strategy()),
            Some(CommitStrategy::ChannelAll)
        );

        let contract = ledger.get_contract("assets", None);
        contract
            .submit_transaction("put", vec!["k".into(), "v".into()], None)
            .await?;
        assert_eq!(channel.hubs().created(), 4);

        for _ in 0..4 {
            contract.query("get", vec!["k".into()], None).await?;
        }
        assert_eq!(gateway.usage().count("peer0.org1"), 2);
        assert_eq!(gateway.usage().count("peer1.org1"), 2);
        assert_eq!(gateway.config().query.handler, QueryHandlerKind::RoundRobin);
        Ok(())
    }

    // =============================================================================
    // FAILURES
    // =============================================================================

    #[tokio::test]
    async fn test_orderer_rejection_releases_registrations() -> Result<()> {
        let (channel, client) = network();
        channel.set_broadcast_status("BAD_REQUEST");
        let gateway = Gateway::new(GatewayConfig::default(), client);
        let contract = gateway.get_ledger(CHANNEL).await?.get_contract("assets", None);

        let tx_id = TxId::new("tx-bad-request");
        let err = contract
            .submit_transaction("put", vec!["a".into(), "b".into()], Some(tx_id.clone()))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransactionError::OrdererRejected {
                tx_id: tx_id.clone(),
                status: "BAD_REQUEST".into()
            }
        );
        assert_eq!(registrations(&channel, &tx_id), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_commit_code_is_reported() -> Result<()> {
        let (channel, client) = network();
        channel.set_commit_code(TxValidationCode::MvccReadConflict);
        let gateway = Gateway::new(GatewayConfig::default(), client);
        let contract = gateway.get_ledger(CHANNEL).await?.get_contract("assets", None);

        let err = contract
            .submit_transaction("put", vec!["a".into(), "b".into()], None)
            .await
            .unwrap_err();

        match err {
            TransactionError::Commit(CommitError::Rejected { code, .. }) => {
                assert_eq!(code, TxValidationCode::MvccReadConflict)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_endorsers_are_skipped() -> Result<()> {
        let (channel, client) = network();
        channel.set_unreachable("peer0.org2", true);
        let gateway = Gateway::new(GatewayConfig::default(), client);
        let contract = gateway.get_ledger(CHANNEL).await?.get_contract("assets", None);

        let written = contract
            .submit_transaction("put", vec!["a".into(), "b".into()], None)
            .await?;
        assert_eq!(written, Some(b"b".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn test_chaincode_failure_on_every_endorser() -> Result<()> {
        let (channel, client) = network();
        let gateway = Gateway::new(GatewayConfig::default(), client);
        let contract = gateway.get_ledger(CHANNEL).await?.get_contract("assets", None);

        let err = contract
            .submit_transaction("burn", Vec::new(), None)
            .await
            .unwrap_err();

        let text = err.to_string();
        assert!(text.starts_with("No valid responses from any peers."));
        assert_eq!(text.lines().count(), 1 + PEERS.len());
        assert_eq!(channel.broadcast_count(), 0);
        Ok(())
    }

    // =============================================================================
    // LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_without_event_manager_nothing_listens() -> Result<()> {
        let (channel, client) = network();
        let mut config = GatewayConfig::default();
        config.event_manager.enabled = false;
        let gateway = Gateway::new(config, client);
        let ledger = gateway.get_ledger(CHANNEL).await?;
        assert!(ledger.event_manager().is_none());

        ledger
            .get_contract("assets", None)
            .submit_transaction("put", vec!["a".into(), "b".into()], None)
            .await?;
        assert_eq!(channel.hubs().created(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_dispose_then_reopen() -> Result<()> {
        let (channel, client) = network();
        let gateway = Gateway::new(GatewayConfig::default(), client);
        let first = gateway.get_ledger(CHANNEL).await?;
        first.get_contract("assets", None);

        gateway.dispose().await;
        assert!(channel.is_closed());
        assert_eq!(first.contract_count(), 0);

        let second = gateway.get_ledger(CHANNEL).await?;
        assert!(!Arc::ptr_eq(&first, &second));
        second
            .get_contract("assets", None)
            .submit_transaction("put", vec!["a".into(), "b".into()], None)
            .await?;
        Ok(())
    }
}
