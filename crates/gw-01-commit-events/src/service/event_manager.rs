//! Event Manager - event source pool for one channel
//!
//! Owns the pool of event sources, rebuilds it on demand, and hands out
//! commit handlers bound to it.
//!
//! ## Pool discipline
//!
//! Rebuilds hold the pool's write lock for the whole establishment, and
//! every rebuild bumps the pool generation. Commit handlers take snapshots
//! under the read lock, so a snapshot never observes a half-built pool.
//!
//! Each generation carries a [`PoolLease`]. Sources discarded by a rebuild
//! are retired and stay connected while any lease on their generation is
//! held. Released generations are disconnected on the next rebuild or
//! snapshot. `dispose` disconnects everything, retired or not.

use crate::config::EventManagerConfig;
use crate::domain::{CommitStrategy, EventSource, StrategyScope};
use crate::error::{CommitError, CommitResult, EventHubError};
use crate::ports::inbound::{CommitHandlerApi, EventManagerApi};
use crate::ports::outbound::EventHubFactory;
use crate::service::commit_handler::CommitHandler;
use async_trait::async_trait;
use futures::future::join_all;
use gateway_telemetry::{
    clear_event_sources_connected, log_peer_event, set_event_sources_connected,
};
use parking_lot::Mutex;
use shared_types::{MspId, PeerInfo, PeerMap, TxId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tracing::{debug, info, warn};

/// Keeps the sources of one pool generation connected while held.
#[derive(Clone, Debug, Default)]
pub struct PoolLease(Arc<()>);

impl PoolLease {
    /// The pool keeps one copy of every lease it hands out.
    fn is_held(&self) -> bool {
        Arc::strong_count(&self.0) > 1
    }
}

/// Consistent view of the pool at one generation.
#[derive(Clone, Debug)]
pub struct PoolSnapshot {
    pub generation: u64,
    pub sources: Vec<EventSource>,
    pub lease: PoolLease,
}

struct RetiredGeneration {
    lease: PoolLease,
    sources: Vec<EventSource>,
}

#[derive(Default)]
struct SourcePool {
    sources: Vec<EventSource>,
    lease: PoolLease,
    generation: u64,
    initialized: bool,
    retired: Mutex<Vec<RetiredGeneration>>,
}

impl SourcePool {
    /// Move the current sources to the retired list under a fresh lease.
    fn retire_current(&mut self) {
        let sources = std::mem::take(&mut self.sources);
        let lease = std::mem::take(&mut self.lease);
        if !sources.is_empty() {
            self.retired.get_mut().push(RetiredGeneration { lease, sources });
        }
    }

    /// Drop retired generations nobody holds. Returns the sources to
    /// disconnect: released ones whose hub is not still in use elsewhere.
    fn sweep_retired(&self) -> Vec<EventSource> {
        let mut retired = self.retired.lock();
        let (released, held): (Vec<_>, Vec<_>) =
            retired.drain(..).partition(|generation| !generation.lease.is_held());
        *retired = held;

        let in_use: Vec<&EventSource> = self
            .sources
            .iter()
            .chain(retired.iter().flat_map(|generation| &generation.sources))
            .collect();
        let mut closing: Vec<EventSource> = Vec::new();
        for source in released.into_iter().flat_map(|generation| generation.sources) {
            let still_used = in_use.iter().any(|other| other.shares_hub(&source));
            let queued = closing.iter().any(|other| other.shares_hub(&source));
            if !still_used && !queued {
                closing.push(source);
            }
        }
        closing
    }

    /// Every current and retired source, one entry per hub.
    fn drain_all(&mut self) -> Vec<EventSource> {
        let retired = std::mem::take(self.retired.get_mut());
        let mut all: Vec<EventSource> = Vec::new();
        for source in self
            .sources
            .drain(..)
            .chain(retired.into_iter().flat_map(|generation| generation.sources))
        {
            if !all.iter().any(|other| other.shares_hub(&source)) {
                all.push(source);
            }
        }
        all
    }
}

fn disconnect_all(sources: Vec<EventSource>) {
    for source in sources {
        debug!(peer = %source.peer_name(), "Disconnecting event source");
        source.hub().disconnect();
    }
}

struct ManagerInner {
    channel_name: String,
    msp_id: MspId,
    peer_map: PeerMap,
    factory: Arc<dyn EventHubFactory>,
    config: EventManagerConfig,
    pool: RwLock<SourcePool>,
}

/// Event source pool for one channel. Cloning shares the pool.
#[derive(Clone)]
pub struct EventManager {
    inner: Arc<ManagerInner>,
}

impl EventManager {
    pub fn new(
        channel_name: impl Into<String>,
        msp_id: impl Into<MspId>,
        peer_map: PeerMap,
        factory: Arc<dyn EventHubFactory>,
        config: EventManagerConfig,
    ) -> CommitResult<Self> {
        let msp_id = msp_id.into();
        if msp_id.is_empty() {
            return Err(CommitError::Configuration(
                "an organization id is required for the event manager".to_string(),
            ));
        }
        Ok(Self {
            inner: Arc::new(ManagerInner {
                channel_name: channel_name.into(),
                msp_id,
                peer_map,
                factory,
                config,
                pool: RwLock::new(SourcePool::default()),
            }),
        })
    }

    pub fn channel_name(&self) -> &str {
        &self.inner.channel_name
    }

    pub fn msp_id(&self) -> &MspId {
        &self.inner.msp_id
    }

    pub fn config(&self) -> &EventManagerConfig {
        &self.inner.config
    }

    pub fn strategy(&self) -> CommitStrategy {
        self.inner.config.commit_strategy
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.pool.read().await.initialized
    }

    /// Connect the sources for the configured strategy. No-op when already
    /// initialized.
    pub async fn initialize(&self) -> CommitResult<()> {
        let mut pool = self.inner.pool.write().await;
        if pool.initialized {
            debug!(channel = %self.inner.channel_name, "Event manager already initialized");
            return Ok(());
        }
        self.rebuild(&mut pool).await?;
        pool.initialized = true;
        Ok(())
    }

    /// Discard the pool and connect a fresh one.
    pub async fn establish_sources_for_strategy(&self) -> CommitResult<()> {
        let mut pool = self.inner.pool.write().await;
        self.rebuild(&mut pool).await
    }

    /// Rebuild only if nobody else rebuilt since `generation` was observed.
    pub(crate) async fn reestablish_if_unchanged(&self, generation: u64) -> CommitResult<()> {
        let mut pool = self.inner.pool.write().await;
        if pool.generation != generation {
            debug!(
                observed = generation,
                current = pool.generation,
                "Pool already re-established"
            );
            return Ok(());
        }
        self.rebuild(&mut pool).await
    }

    pub async fn snapshot(&self) -> PoolSnapshot {
        let pool = self.inner.pool.read().await;
        disconnect_all(pool.sweep_retired());
        PoolSnapshot {
            generation: pool.generation,
            sources: pool.sources.clone(),
            lease: pool.lease.clone(),
        }
    }

    /// Number of discarded generations still held by in-flight handlers.
    pub async fn retired_generations(&self) -> usize {
        self.inner.pool.read().await.retired.lock().len()
    }

    /// Ask every source to refresh its connection, without waiting.
    ///
    /// Does nothing outside a tokio runtime, or while a rebuild holds the pool.
    pub fn check_health(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime available for event hub health check");
            return;
        };
        let (sources, lease) = match self.inner.pool.try_read() {
            Ok(pool) => (pool.sources.clone(), pool.lease.clone()),
            Err(_) => {
                debug!("Pool is being rebuilt, skipping health check");
                return;
            }
        };
        runtime.spawn(async move {
            let _lease = lease;
            for source in sources {
                let state = source.hub().check_connection(true).await;
                debug!(peer = %source.peer_name(), ?state, "Event hub health checked");
            }
        });
    }

    /// Create a commit handler for `tx_id`.
    pub async fn create_commit_handler(&self, tx_id: &TxId) -> CommitResult<CommitHandler> {
        if tx_id.is_empty() {
            return Err(CommitError::Configuration(
                "No transaction id provided".to_string(),
            ));
        }
        if self.inner.pool.read().await.sources.is_empty() {
            return Err(CommitError::NoEventSources {
                strategy: self.strategy(),
            });
        }
        Ok(CommitHandler::new(self.clone(), tx_id.clone()))
    }

    /// Disconnect every source and clear the pool. Idempotent.
    pub async fn dispose(&self) {
        let mut pool = self.inner.pool.write().await;
        disconnect_all(pool.drain_all());
        pool.initialized = false;
        clear_event_sources_connected(&self.inner.channel_name);
        info!(channel = %self.inner.channel_name, "Event manager disposed");
    }

    fn candidate_peers(&self) -> Vec<PeerInfo> {
        let peer_map = &self.inner.peer_map;
        let peers: Vec<&PeerInfo> = match self.strategy().scope() {
            StrategyScope::Organization => peer_map.get(&self.inner.msp_id).iter().collect(),
            StrategyScope::Channel => peer_map.iter().flat_map(|(_, peers)| peers).collect(),
        };
        peers
            .into_iter()
            .filter(|peer| peer.roles.event_source)
            .cloned()
            .collect()
    }

    async fn rebuild(&self, pool: &mut SourcePool) -> CommitResult<()> {
        pool.retire_current();

        let sources: Vec<EventSource> = self
            .candidate_peers()
            .into_iter()
            .map(|peer| {
                let hub = self.inner.factory.create(&peer);
                EventSource::new(peer, hub)
            })
            .collect();

        let full_block = self.inner.config.use_full_blocks_for_all;
        let probe_timeout = self.inner.config.effective_probe_timeout();
        let outcomes = join_all(
            sources
                .iter()
                .map(|source| probe_source(source, full_block, probe_timeout)),
        )
        .await;
        let connected = outcomes.iter().filter(|ok| **ok).count();

        pool.generation += 1;
        pool.sources = sources;
        disconnect_all(pool.sweep_retired());
        set_event_sources_connected(&self.inner.channel_name, connected);

        info!(
            channel = %self.inner.channel_name,
            strategy = %self.strategy(),
            generation = pool.generation,
            sources = pool.sources.len(),
            connected,
            "Event sources established"
        );

        if pool.sources.is_empty() {
            return Err(CommitError::NoEventSources {
                strategy: self.strategy(),
            });
        }
        Ok(())
    }
}

/// Connect one source and wait for its first block or error.
///
/// Settles after `timeout` at the latest. Returns whether a block arrived.
async fn probe_source(source: &EventSource, full_block: bool, timeout: Duration) -> bool {
    let hub = source.hub();
    let (tx, rx) = oneshot::channel::<Result<(), EventHubError>>();
    let slot = Arc::new(Mutex::new(Some(tx)));

    let on_block = {
        let slot = slot.clone();
        Box::new(move |_block: u64| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(Ok(()));
            }
        })
    };
    let on_error = {
        let slot = slot.clone();
        Box::new(move |error: EventHubError| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(Err(error));
            }
        })
    };

    let registration = match hub.register_block_event(on_block, on_error) {
        Ok(registration) => registration,
        Err(e) => {
            log_peer_event!(warn, "Block registration failed", source.peer_name(), error = %e);
            return false;
        }
    };
    hub.connect(full_block);

    let outcome = tokio::time::timeout(timeout, rx).await;
    hub.unregister_block_event(registration);

    match outcome {
        Ok(Ok(Ok(()))) => {
            log_peer_event!(debug, "Event hub connected", source.peer_name());
            true
        }
        Ok(Ok(Err(e))) => {
            log_peer_event!(warn, "Event hub failed to connect", source.peer_name(), error = %e);
            false
        }
        Ok(Err(_)) => false,
        Err(_) => {
            log_peer_event!(
                warn,
                "Event hub readiness probe timed out",
                source.peer_name(),
                timeout_secs = timeout.as_secs()
            );
            false
        }
    }
}

#[async_trait]
impl EventManagerApi for EventManager {
    async fn initialize(&self) -> CommitResult<()> {
        EventManager::initialize(self).await
    }

    async fn establish_sources_for_strategy(&self) -> CommitResult<()> {
        EventManager::establish_sources_for_strategy(self).await
    }

    fn check_health(&self) {
        EventManager::check_health(self)
    }

    async fn create_commit_handler(
        &self,
        tx_id: &TxId,
    ) -> CommitResult<Box<dyn CommitHandlerApi>> {
        let handler = EventManager::create_commit_handler(self, tx_id).await?;
        Ok(Box::new(handler))
    }

    async fn dispose(&self) {
        EventManager::dispose(self).await
    }
}
