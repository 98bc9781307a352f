//! Driving Ports (API - Inbound)

use crate::error::CommitResult;
use async_trait::async_trait;
use shared_types::TxId;

/// Owner of the event source pool for one channel.
#[async_trait]
pub trait EventManagerApi: Send + Sync {
    /// Establish the event sources. No-op when already initialized.
    async fn initialize(&self) -> CommitResult<()>;

    /// Discard the current pool and connect a fresh one.
    async fn establish_sources_for_strategy(&self) -> CommitResult<()>;

    /// Ask every source to refresh its connection in the background.
    fn check_health(&self);

    /// Create a commit handler bound to the current pool.
    async fn create_commit_handler(&self, tx_id: &TxId) -> CommitResult<Box<dyn CommitHandlerApi>>;

    /// Disconnect every source and clear the pool.
    async fn dispose(&self);
}

/// Waits for the commit of one transaction.
#[async_trait]
pub trait CommitHandlerApi: Send + Sync {
    /// Snapshot live sources and register for the transaction.
    async fn start_listening(&self) -> CommitResult<()>;

    /// Wait for the single resolution. Safe to call concurrently.
    async fn wait_for_events(&self) -> CommitResult<()>;

    /// Stop listening. Idempotent.
    async fn cancel_listening(&self);

    /// Non-blocking hint to refresh unhealthy sources.
    fn quick_check_event_hubs(&self);
}
