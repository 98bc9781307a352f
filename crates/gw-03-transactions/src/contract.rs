//! Transaction coordinator for one chaincode

use crate::error::{TransactionError, TransactionResult};
use crate::validation::validate_peer_responses;
use gateway_telemetry::log_tx_event;
use gw_01_commit_events::{CommitHandlerApi, EventManagerApi};
use gw_02_query_routing::{ChaincodeQuery, QueryHandler};
use shared_types::{ChannelGateway, ProposalRequest, ProposalResult, TransactionRequest, TxId};
use std::fmt;
use std::sync::Arc;

/// Submits and evaluates transactions against one chaincode on one channel.
///
/// Commit confirmation is skipped when the ledger was built without an
/// event manager.
pub struct Contract {
    channel: Arc<dyn ChannelGateway>,
    chaincode_id: String,
    namespace: Option<String>,
    event_manager: Option<Arc<dyn EventManagerApi>>,
    query_handler: Arc<dyn QueryHandler>,
}

impl Contract {
    pub fn new(
        channel: Arc<dyn ChannelGateway>,
        chaincode_id: impl Into<String>,
        namespace: Option<String>,
        event_manager: Option<Arc<dyn EventManagerApi>>,
        query_handler: Arc<dyn QueryHandler>,
    ) -> Self {
        Self {
            channel,
            chaincode_id: chaincode_id.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()),
            event_manager,
            query_handler,
        }
    }

    pub fn chaincode_id(&self) -> &str {
        &self.chaincode_id
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Issue a fresh transaction id.
    pub fn create_tx_id(&self) -> TxId {
        TxId::generate()
    }

    /// Function name as sent to the chaincode: `namespace:name` when a
    /// namespace is set.
    pub fn qualified_name(&self, name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, name),
            None => name.to_string(),
        }
    }

    /// Endorse, order and (when an event manager is configured) wait for the
    /// commit of a transaction.
    ///
    /// Returns the payload of the first valid endorsement, or `None` when it
    /// is empty.
    pub async fn submit_transaction(
        &self,
        name: &str,
        args: Vec<String>,
        tx_id: Option<TxId>,
    ) -> TransactionResult<Option<Vec<u8>>> {
        let tx_id = tx_id.unwrap_or_else(|| self.create_tx_id());
        let function = self.qualified_name(name);
        log_tx_event!(debug, "Submitting transaction", tx_id, function = %function);

        let commit_handler: Option<Box<dyn CommitHandlerApi>> = match &self.event_manager {
            Some(manager) => {
                let handler = manager.create_commit_handler(&tx_id).await?;
                handler.quick_check_event_hubs();
                Some(handler)
            }
            None => None,
        };

        let request = ProposalRequest::new(self.chaincode_id.clone(), function, args, tx_id.clone());
        let ProposalResult { responses, proposal } =
            self.channel.send_transaction_proposal(request).await?;

        let validated =
            validate_peer_responses(&responses, |e| self.channel.verify_proposal_response(e))?;
        for message in &validated.invalid_messages {
            log_tx_event!(warn, "Ignoring endorsement", tx_id, reason = %message);
        }

        if let Some(handler) = &commit_handler {
            handler.start_listening().await?;
        }

        let broadcast = self
            .channel
            .send_transaction(TransactionRequest {
                proposal,
                responses: validated.valid.clone(),
            })
            .await?;

        if !broadcast.is_success() {
            if let Some(handler) = &commit_handler {
                handler.cancel_listening().await;
            }
            return Err(TransactionError::OrdererRejected {
                tx_id,
                status: broadcast.status,
            });
        }

        if let Some(handler) = &commit_handler {
            if let Err(err) = handler.wait_for_events().await {
                if validated.valid.len() >= 2
                    && !self.channel.compare_proposal_response_results(&validated.valid)
                {
                    log_tx_event!(warn, "Peers do not agree, read/write sets differ", tx_id);
                }
                return Err(err.into());
            }
        }

        Ok(first_payload(validated.valid.first().map(|e| &e.response.payload)))
    }

    /// Evaluate a read-only function through the ledger's query handler.
    ///
    /// Returns `None` when the chaincode answered with an empty payload.
    pub async fn query(
        &self,
        name: &str,
        args: Vec<String>,
        tx_id: Option<TxId>,
    ) -> TransactionResult<Option<Vec<u8>>> {
        let tx_id = tx_id.unwrap_or_else(|| self.create_tx_id());
        let query = ChaincodeQuery::new(
            self.chaincode_id.clone(),
            self.qualified_name(name),
            args,
            tx_id,
        );
        let payload = self.query_handler.query_chaincode(&query).await?;
        Ok(first_payload(Some(&payload)))
    }
}

fn first_payload(payload: Option<&Vec<u8>>) -> Option<Vec<u8>> {
    payload.filter(|p| !p.is_empty()).cloned()
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("channel", &self.channel.name())
            .field("chaincode_id", &self.chaincode_id)
            .field("namespace", &self.namespace)
            .field("event_manager", &self.event_manager.is_some())
            .finish()
    }
}
