//! Error types for query routing

use thiserror::Error;

/// Query routing errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Unknown handler name or similar setup problem
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Every candidate peer failed, or there were none
    #[error("{}", no_peers_message(.last_error))]
    NoPeersAvailable { last_error: Option<String> },

    /// A peer answered with a chaincode error
    #[error("Chaincode error from {peer}: {message}")]
    Chaincode { peer: String, message: String },
}

fn no_peers_message(last_error: &Option<String>) -> String {
    match last_error {
        Some(last) => format!("No peers available to query. last error was {}", last),
        None => "No peers have been provided that can be queried".to_string(),
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_peers_message_includes_last_error() {
        let err = QueryError::NoPeersAvailable {
            last_error: Some("peer2: 14 UNAVAILABLE: connect failed".into()),
        };
        assert!(err.to_string().contains("14 UNAVAILABLE: connect failed"));

        let err = QueryError::NoPeersAvailable { last_error: None };
        assert_eq!(
            err.to_string(),
            "No peers have been provided that can be queried"
        );
    }
}
