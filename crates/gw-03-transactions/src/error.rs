//! Error types for transaction submission

use gw_01_commit_events::CommitError;
use gw_02_query_routing::QueryError;
use shared_types::{ChannelError, TxId};
use thiserror::Error;

/// Transaction coordinator errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
    /// The endorsement round produced no responses at all
    #[error("No results were returned from the request")]
    NoResponses,

    /// No endorsement passed verification with status 200
    #[error("{}", invalid_responses_message(.messages))]
    InvalidProposalResponse { messages: Vec<String> },

    /// The orderer refused the endorsed transaction
    #[error("Failed to send peer responses for transaction '{tx_id}' to orderer. Response status '{status}'")]
    OrdererRejected { tx_id: TxId, status: String },

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

fn invalid_responses_message(messages: &[String]) -> String {
    let mut lines = vec!["No valid responses from any peers."];
    lines.extend(messages.iter().map(String::as_str));
    lines.join("\n")
}

/// Result type for transaction operations
pub type TransactionResult<T> = Result<T, TransactionError>;
