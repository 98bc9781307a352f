//! # Error Types
//!
//! Errors raised by the underlying client library through the channel port.

use thiserror::Error;

/// Errors from channel-level operations (proposal, broadcast, initialization).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The request never reached the target (connection refused, reset, ...).
    #[error("Transport failure contacting {target}: {reason}")]
    Transport { target: String, reason: String },

    /// The target did not answer within the client library's own deadline.
    #[error("Request to {target} timed out")]
    Timeout { target: String },

    /// The channel was closed before or during the request.
    #[error("Channel {channel} is closed")]
    Closed { channel: String },

    /// The channel could not be initialized from the chosen peer.
    #[error("Channel initialization failed: {0}")]
    Initialization(String),

    /// Anything else reported by the client library.
    #[error("{0}")]
    Other(String),
}
