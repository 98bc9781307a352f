//! # Query Flow
//!
//! Query handlers routing real proposals through the in-memory channel.

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use gateway_runtime::adapters::InMemoryChannel;
    use gw_02_query_routing::{
        create_query_handler, ChaincodeQuery, PeerUsageTable, QueryError, QueryHandler,
        QueryHandlerKind,
    };
    use shared_types::{ChaincodeResponse, ChannelGateway, MspId, PeerInfo, PeerMap, PeerRoles, TxId};
    use std::sync::Arc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn channel() -> Arc<InMemoryChannel> {
        let no_queries = PeerRoles {
            chaincode_query: false,
            ..PeerRoles::default()
        };
        let channel = Arc::new(InMemoryChannel::new(
            "mychannel",
            vec![
                PeerInfo::new("peer0.org1", "Org1MSP"),
                PeerInfo::new("peer1.org1", "Org1MSP"),
                PeerInfo::new("peer2.org1", "Org1MSP"),
                PeerInfo::new("orderer-side.org1", "Org1MSP").with_roles(no_queries),
                PeerInfo::new("peer0.org2", "Org2MSP"),
            ],
        ));
        channel.install_chaincode(
            "fabcar",
            Arc::new(|function: &str, args: &[String]| match function {
                "queryCar" => ChaincodeResponse::ok(format!("car:{}", args.join(","))),
                _ => ChaincodeResponse {
                    status: 500,
                    message: format!("no function {}", function),
                    payload: Vec::new(),
                },
            }),
        );
        channel
    }

    fn handler(
        kind: QueryHandlerKind,
        channel: &Arc<InMemoryChannel>,
        usage: &PeerUsageTable,
    ) -> Arc<dyn QueryHandler> {
        let peer_map = PeerMap::from_peers(channel.peers());
        create_query_handler(
            kind,
            channel.clone(),
            &MspId::new("Org1MSP"),
            &peer_map,
            usage,
        )
    }

    fn query(function: &str) -> ChaincodeQuery {
        ChaincodeQuery::new("fabcar", function, vec!["CAR1".into()], TxId::generate())
    }

    fn last_target(channel: &InMemoryChannel) -> String {
        channel
            .proposal_targets()
            .last()
            .and_then(|t| t.first().cloned())
            .unwrap_or_default()
    }

    // =============================================================================
    // STICKY
    // =============================================================================

    #[tokio::test]
    async fn test_sticky_fails_over_and_stays_on_new_peer() -> Result<()> {
        let channel = channel();
        let handler = handler(QueryHandlerKind::Sticky, &channel, &PeerUsageTable::new());
        channel.set_unreachable("peer0.org1", true);

        let payload = handler.query_chaincode(&query("queryCar")).await?;
        assert_eq!(payload, b"car:CAR1".to_vec());
        assert_eq!(last_target(&channel), "peer1.org1");

        // peer0 is back, but the handler stays on peer1.
        channel.set_unreachable("peer0.org1", false);
        handler.query_chaincode(&query("queryCar")).await?;
        assert_eq!(last_target(&channel), "peer1.org1");
        assert_eq!(channel.proposal_targets().len(), 3);

        channel.set_unreachable("peer1.org1", true);
        handler.query_chaincode(&query("queryCar")).await?;
        assert_eq!(last_target(&channel), "peer0.org1");
        Ok(())
    }

    #[tokio::test]
    async fn test_sticky_never_uses_other_orgs_or_non_query_peers() -> Result<()> {
        let channel = channel();
        let handler = handler(QueryHandlerKind::Sticky, &channel, &PeerUsageTable::new());
        for peer in ["peer0.org1", "peer1.org1", "peer2.org1"] {
            channel.set_unreachable(peer, true);
        }

        let err = handler.query_chaincode(&query("queryCar")).await.unwrap_err();
        match err {
            QueryError::NoPeersAvailable {
                last_error: Some(last),
            } => assert!(last.contains("peer2.org1")),
            other => panic!("unexpected error: {other:?}"),
        }

        let tried: Vec<String> = channel
            .proposal_targets()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(tried, vec!["peer0.org1", "peer1.org1", "peer2.org1"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_chaincode_error_is_not_failed_over() -> Result<()> {
        let channel = channel();
        let handler = handler(QueryHandlerKind::Sticky, &channel, &PeerUsageTable::new());

        let err = handler.query_chaincode(&query("deleteEverything")).await.unwrap_err();
        assert!(matches!(err, QueryError::Chaincode { ref peer, .. } if peer == "peer0.org1"));
        assert_eq!(channel.proposal_targets().len(), 1);
        Ok(())
    }

    // =============================================================================
    // ROUND ROBIN
    // =============================================================================

    #[tokio::test]
    async fn test_round_robin_spreads_load_across_handlers() -> Result<()> {
        let channel = channel();
        let usage = PeerUsageTable::new();
        let first = handler(QueryHandlerKind::RoundRobin, &channel, &usage);
        let second = handler(QueryHandlerKind::RoundRobin, &channel, &usage);

        for i in 0..6 {
            let handler = if i % 2 == 0 { &first } else { &second };
            handler.query_chaincode(&query("queryCar")).await?;
        }

        for peer in ["peer0.org1", "peer1.org1", "peer2.org1"] {
            assert_eq!(usage.count(peer), 2, "{peer}");
        }
        assert_eq!(usage.count("peer0.org2"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_round_robin_failure_does_not_count() -> Result<()> {
        let channel = channel();
        let usage = PeerUsageTable::new();
        let handler = handler(QueryHandlerKind::RoundRobin, &channel, &usage);
        channel.set_unreachable("peer0.org1", true);

        for _ in 0..4 {
            handler.query_chaincode(&query("queryCar")).await?;
        }

        assert_eq!(usage.count("peer0.org1"), 0);
        assert_eq!(usage.count("peer1.org1") + usage.count("peer2.org1"), 4);
        Ok(())
    }
}
