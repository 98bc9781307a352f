//! Error types for commit confirmation

use crate::domain::CommitStrategy;
use shared_types::{TxId, TxValidationCode};
use std::time::Duration;
use thiserror::Error;

/// Commit confirmation errors.
///
/// Cloneable so every concurrent `wait_for_events` caller receives the same
/// outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitError {
    /// Invalid strategy name, missing transaction id, bad option value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The pool was empty after establishment
    #[error("No available event hubs found for strategy {strategy}")]
    NoEventSources { strategy: CommitStrategy },

    /// The live sources cannot satisfy the strategy, even after re-establishment
    #[error("Not enough connected event hubs to satisfy strategy {strategy}")]
    StrategyUnsatisfiable { strategy: CommitStrategy },

    /// A peer committed the transaction with a non-valid code
    #[error("Peer {peer} has rejected transaction '{tx_id}' with code {code}")]
    Rejected {
        peer: String,
        tx_id: TxId,
        code: TxValidationCode,
    },

    /// No terminal signal before the deadline
    #[error("Event strategy not satisfied within {timeout:?} for transaction '{tx_id}'")]
    Timeout { tx_id: TxId, timeout: Duration },

    /// Sources errored until the strategy could no longer pass
    #[error("Not possible to satisfy the event strategy due to loss of event hub comms")]
    EventHubsLost,

    /// The handler was cancelled before it resolved
    #[error("Listening for transaction '{tx_id}' was cancelled")]
    Cancelled { tx_id: TxId },

    /// `wait_for_events` called before `start_listening`
    #[error("Cannot wait for notification: handler is not listening")]
    NotListening,
}

/// Result type for commit operations
pub type CommitResult<T> = Result<T, CommitError>;

/// Errors reported by an event hub through its error callbacks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventHubError {
    #[error("Event hub {peer} is not connected")]
    NotConnected { peer: String },

    #[error("Event hub {peer} failed to connect: {reason}")]
    ConnectionFailed { peer: String, reason: String },

    #[error("Event hub {peer} has been shut down")]
    Shutdown { peer: String },

    #[error("Event hub {peer}: {reason}")]
    Stream { peer: String, reason: String },
}
