//! Driving Ports (API - Inbound)

use crate::domain::ChaincodeQuery;
use crate::error::QueryResult;
use async_trait::async_trait;

/// Routes read-only chaincode queries to peers.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    /// Prepare the handler. Called once by the ledger.
    async fn initialize(&self) -> QueryResult<()> {
        Ok(())
    }

    /// Evaluate `query` on one peer and return its payload.
    async fn query_chaincode(&self, query: &ChaincodeQuery) -> QueryResult<Vec<u8>>;

    /// Release handler resources.
    async fn dispose(&self) {}
}
