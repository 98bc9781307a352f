//! # Commit Flow
//!
//! Event manager, commit handlers and quorum strategies over a two
//! organization network of in-memory event hubs.
//!
//! ```text
//! Org1MSP: peer0.org1, peer1.org1    (application owner)
//! Org2MSP: peer0.org2, peer1.org2
//! ```

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use futures::future::join_all;
    use gw_01_commit_events::{
        CommitError, CommitStrategy, ConnectBehaviour, EventManager, EventManagerConfig,
        InMemoryEventHubFactory,
    };
    use shared_types::{PeerInfo, PeerMap, TxId, TxValidationCode};
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const ORG1: [&str; 2] = ["peer0.org1", "peer1.org1"];
    const ORG2: [&str; 2] = ["peer0.org2", "peer1.org2"];

    struct Network {
        factory: Arc<InMemoryEventHubFactory>,
        manager: EventManager,
    }

    impl Network {
        /// Build the manager; `down` peers refuse connections from the start.
        async fn start(strategy: CommitStrategy, down: &[&str]) -> Result<Self> {
            let factory = Arc::new(InMemoryEventHubFactory::new());
            for peer in down {
                factory
                    .hub(peer)
                    .set_connect_behaviour(ConnectBehaviour::Fail("refused".into()));
            }

            let peers = ORG1
                .iter()
                .map(|p| PeerInfo::new(*p, "Org1MSP"))
                .chain(ORG2.iter().map(|p| PeerInfo::new(*p, "Org2MSP")));
            let manager = EventManager::new(
                "mychannel",
                "Org1MSP",
                PeerMap::from_peers(peers),
                factory.clone(),
                EventManagerConfig::default()
                    .with_strategy(strategy)
                    .with_commit_timeout(Duration::from_secs(10)),
            )?;
            manager.initialize().await?;
            Ok(Self { factory, manager })
        }

        fn commit(&self, peers: &[&str], tx_id: &TxId, code: TxValidationCode) {
            for peer in peers {
                self.factory.hub(peer).emit_tx_event(tx_id, code.clone());
            }
        }

        fn fail(&self, peers: &[&str], tx_id: &TxId) {
            for peer in peers {
                self.factory.hub(peer).emit_tx_error(tx_id, "stream reset");
            }
        }

        fn registrations(&self, tx_id: &TxId) -> usize {
            ORG1.iter()
                .chain(ORG2.iter())
                .map(|p| self.factory.hub(p).tx_registration_count(tx_id))
                .sum()
        }

        fn connect_calls(&self, peer: &str) -> u64 {
            self.factory.hub(peer).connect_calls()
        }
    }

    // =============================================================================
    // STRATEGY SCOPE
    // =============================================================================

    #[tokio::test]
    async fn test_org_strategies_only_listen_to_own_organization() -> Result<()> {
        for strategy in [CommitStrategy::MspAll, CommitStrategy::MspAny] {
            let net = Network::start(strategy, &[]).await?;
            let tx_id = TxId::generate();
            let handler = net.manager.create_commit_handler(&tx_id).await?;
            handler.start_listening().await?;

            assert_eq!(net.registrations(&tx_id), 2, "{strategy}");
            assert_eq!(net.connect_calls("peer0.org2"), 0, "{strategy}");

            net.commit(&ORG1, &tx_id, TxValidationCode::Valid);
            handler.wait_for_events().await?;
            assert_eq!(net.registrations(&tx_id), 0);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_channel_all_needs_every_organization() -> Result<()> {
        let net = Network::start(CommitStrategy::ChannelAll, &[]).await?;
        let tx_id = TxId::generate();
        let handler = net.manager.create_commit_handler(&tx_id).await?;
        handler.start_listening().await?;
        assert_eq!(net.registrations(&tx_id), 4);

        net.commit(&["peer0.org1", "peer1.org1"], &tx_id, TxValidationCode::Valid);
        let pending = tokio::time::timeout(Duration::from_millis(50), handler.wait_for_events()).await;
        assert!(pending.is_err(), "Org2 has not committed yet");

        net.fail(&["peer0.org2"], &tx_id);
        net.commit(&["peer1.org2"], &tx_id, TxValidationCode::Valid);
        handler.wait_for_events().await?;
        assert_eq!(net.registrations(&tx_id), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_channel_any_survives_a_dead_organization() -> Result<()> {
        let net = Network::start(CommitStrategy::ChannelAny, &ORG2).await?;
        let tx_id = TxId::generate();
        let handler = net.manager.create_commit_handler(&tx_id).await?;
        handler.start_listening().await?;

        net.fail(&["peer0.org1"], &tx_id);
        net.commit(&["peer1.org1"], &tx_id, TxValidationCode::Valid);
        handler.wait_for_events().await?;
        Ok(())
    }

    // =============================================================================
    // RE-ESTABLISHMENT
    // =============================================================================

    #[tokio::test]
    async fn test_dead_organization_triggers_single_reestablish() -> Result<()> {
        let net = Network::start(CommitStrategy::ChannelAll, &ORG2).await?;
        assert_eq!(net.connect_calls("peer0.org2"), 1);

        let tx_id = TxId::generate();
        let handler = net.manager.create_commit_handler(&tx_id).await?;
        let err = handler.start_listening().await.unwrap_err();

        assert_eq!(
            err,
            CommitError::StrategyUnsatisfiable {
                strategy: CommitStrategy::ChannelAll
            }
        );
        assert_eq!(net.connect_calls("peer0.org2"), 2);
        assert_eq!(net.connect_calls("peer0.org1"), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_recovered_organization_is_picked_up_by_reestablish() -> Result<()> {
        let net = Network::start(CommitStrategy::ChannelAll, &ORG2).await?;
        for peer in ORG2 {
            net.factory
                .hub(peer)
                .set_connect_behaviour(ConnectBehaviour::Succeed);
        }

        let tx_id = TxId::generate();
        let handler = net.manager.create_commit_handler(&tx_id).await?;
        handler.start_listening().await?;
        assert_eq!(net.registrations(&tx_id), 4);

        net.commit(&["peer0.org1", "peer0.org2"], &tx_id, TxValidationCode::Valid);
        handler.wait_for_events().await?;
        Ok(())
    }

    // =============================================================================
    // MANY TRANSACTIONS
    // =============================================================================

    #[tokio::test]
    async fn test_concurrent_transactions_resolve_independently() -> Result<()> {
        let net = Network::start(CommitStrategy::MspAny, &[]).await?;

        let mut handlers = Vec::new();
        let mut tx_ids = Vec::new();
        for _ in 0..8 {
            let tx_id = TxId::generate();
            let handler = net.manager.create_commit_handler(&tx_id).await?;
            handler.start_listening().await?;
            handlers.push(handler);
            tx_ids.push(tx_id);
        }

        for (i, tx_id) in tx_ids.iter().enumerate() {
            let code = if i % 2 == 0 {
                TxValidationCode::Valid
            } else {
                TxValidationCode::MvccReadConflict
            };
            net.commit(&["peer0.org1"], tx_id, code);
        }

        let outcomes = join_all(handlers.iter().map(|h| h.wait_for_events())).await;
        for (i, outcome) in outcomes.iter().enumerate() {
            if i % 2 == 0 {
                assert!(outcome.is_ok());
            } else {
                assert!(matches!(outcome, Err(CommitError::Rejected { .. })));
            }
        }
        for tx_id in &tx_ids {
            assert_eq!(net.registrations(tx_id), 0);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_dispose_fails_pending_handlers() -> Result<()> {
        let net = Network::start(CommitStrategy::MspAll, &[]).await?;
        let tx_id = TxId::generate();
        let handler = net.manager.create_commit_handler(&tx_id).await?;
        handler.start_listening().await?;

        net.manager.dispose().await;

        assert_eq!(
            handler.wait_for_events().await.unwrap_err(),
            CommitError::EventHubsLost
        );
        assert!(!net.manager.is_initialized().await);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_network_times_out() -> Result<()> {
        let net = Network::start(CommitStrategy::MspAll, &[]).await?;
        let tx_id = TxId::new("tx-silent");
        let handler = net.manager.create_commit_handler(&tx_id).await?;
        handler.start_listening().await?;

        let err = handler.wait_for_events().await.unwrap_err();
        assert_eq!(
            err,
            CommitError::Timeout {
                tx_id,
                timeout: Duration::from_secs(10)
            }
        );
        Ok(())
    }
}
