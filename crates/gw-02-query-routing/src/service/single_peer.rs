//! One query against one peer

use crate::domain::ChaincodeQuery;
use crate::error::{QueryError, QueryResult};
use gateway_telemetry::metrics::{record_query_attempt, QueryAttemptOutcome};
use gateway_telemetry::log_peer_event;
use shared_types::{ChannelGateway, PeerInfo, STATUS_OK};

/// What asking a single peer produced.
pub(crate) enum PeerOutcome {
    /// The peer answered: a payload or a chaincode error for the caller.
    Answered(QueryResult<Vec<u8>>),
    /// The peer could not be used; try the next one.
    Unusable(String),
}

/// Send `query` as a proposal targeting only `peer`. No retries.
pub(crate) async fn query_single_peer(
    channel: &dyn ChannelGateway,
    peer: &PeerInfo,
    query: &ChaincodeQuery,
) -> PeerOutcome {
    let request = query.to_request().with_targets(vec![peer.clone()]);

    let outcome = match channel.send_transaction_proposal(request).await {
        Err(e) => PeerOutcome::Unusable(e.to_string()),
        Ok(result) => match result.responses.into_iter().next() {
            None => PeerOutcome::Unusable(format!(
                "No payloads were returned from the query request: {}",
                query.function
            )),
            // An empty payload with status 200 is still an answer. Callers
            // such as `Contract::query` turn it into "no result".
            Some(Ok(endorsement)) if endorsement.response.status == STATUS_OK => {
                PeerOutcome::Answered(Ok(endorsement.response.payload))
            }
            Some(Ok(endorsement)) => PeerOutcome::Answered(Err(QueryError::Chaincode {
                peer: endorsement.peer,
                message: format!(
                    "status {}: {}",
                    endorsement.response.status, endorsement.response.message
                ),
            })),
            Some(Err(error)) if error.is_unavailable() => PeerOutcome::Unusable(error.to_string()),
            Some(Err(error)) => PeerOutcome::Answered(Err(QueryError::Chaincode {
                peer: error.peer.unwrap_or_else(|| peer.name.clone()),
                message: error.message,
            })),
        },
    };

    match &outcome {
        PeerOutcome::Answered(Ok(_)) => record_query_attempt(QueryAttemptOutcome::Success),
        PeerOutcome::Answered(Err(_)) => record_query_attempt(QueryAttemptOutcome::ChaincodeError),
        PeerOutcome::Unusable(reason) => {
            record_query_attempt(QueryAttemptOutcome::Failover);
            log_peer_event!(warn, "Query peer unusable", peer.name, error = %reason);
        }
    }
    outcome
}
