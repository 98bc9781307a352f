//! Gateway error types

use gw_01_commit_events::CommitError;
use gw_02_query_routing::QueryError;
use shared_types::ChannelError;
use thiserror::Error;

/// Errors raised while building or tearing down gateways and ledgers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("Failed to read config file {path}: {error}")]
    ConfigIo { path: String, error: String },

    /// The client has no channel by this name
    #[error("Channel {0} is not known to the client")]
    UnknownChannel(String),

    /// No peer with the ledger-query role
    #[error("no suitable peers available to initialize from")]
    NoLedgerPeers,

    /// Every ledger-query peer failed channel initialization
    #[error("Unable to initialize channel. Attempted to contact {attempted} peers. Last error was {last_error}")]
    ChannelInitialization { attempted: usize, last_error: String },

    /// No channel peer carries an organization id
    #[error("no suitable peers associated with mspIds were found")]
    NoOrganizationPeers,

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
