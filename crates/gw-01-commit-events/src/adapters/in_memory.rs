//! In-memory event hub
//!
//! Behaves like a peer event stream whose every transition is driven by the
//! caller: connection outcomes are scripted up front and transaction events
//! are emitted by hand. Callbacks are always invoked with no internal lock
//! held, so a callback may call back into the hub.

use crate::error::EventHubError;
use crate::ports::outbound::{
    BlockEventCallback, ConnectionState, EventErrorCallback, EventHub, EventHubFactory,
    RegistrationId, TxEventCallback,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{PeerInfo, TxId, TxValidationCode};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type SharedTxCallback = Arc<dyn Fn(TxValidationCode) + Send + Sync>;
type SharedBlockCallback = Arc<dyn Fn(u64) + Send + Sync>;
type SharedErrorCallback = Arc<dyn Fn(EventHubError) + Send + Sync>;

/// What `connect` does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectBehaviour {
    /// Connect and deliver a first block to block listeners
    Succeed,
    /// Fail and deliver an error to block listeners
    Fail(String),
    /// Never report anything
    Hang,
}

struct TxRegistration {
    tx_id: TxId,
    on_event: SharedTxCallback,
    on_error: SharedErrorCallback,
}

struct HubState {
    behaviour: ConnectBehaviour,
    connected: bool,
    connection_state: ConnectionState,
    full_block: Option<bool>,
    block_height: u64,
    tx_registrations: BTreeMap<u64, TxRegistration>,
    block_registrations: BTreeMap<u64, (SharedBlockCallback, SharedErrorCallback)>,
    connect_calls: u64,
    forced_checks: u64,
    disconnect_calls: u64,
}

/// Scriptable event hub for a single peer.
pub struct InMemoryEventHub {
    peer_name: String,
    next_registration: AtomicU64,
    state: Mutex<HubState>,
}

impl InMemoryEventHub {
    pub fn new(peer_name: impl Into<String>) -> Self {
        Self {
            peer_name: peer_name.into(),
            next_registration: AtomicU64::new(1),
            state: Mutex::new(HubState {
                behaviour: ConnectBehaviour::Succeed,
                connected: false,
                connection_state: ConnectionState::Idle,
                full_block: None,
                block_height: 0,
                tx_registrations: BTreeMap::new(),
                block_registrations: BTreeMap::new(),
                connect_calls: 0,
                forced_checks: 0,
                disconnect_calls: 0,
            }),
        }
    }

    /// Script the outcome of subsequent `connect` and forced reconnects.
    pub fn set_connect_behaviour(&self, behaviour: ConnectBehaviour) {
        self.state.lock().behaviour = behaviour;
    }

    /// Override the reported connection state without touching `connected`.
    pub fn set_connection_state(&self, connection_state: ConnectionState) {
        self.state.lock().connection_state = connection_state;
    }

    /// Deliver a commit code to every registration for `tx_id`.
    /// Returns how many registrations were notified.
    pub fn emit_tx_event(&self, tx_id: &TxId, code: TxValidationCode) -> usize {
        let callbacks: Vec<SharedTxCallback> = {
            let state = self.state.lock();
            state
                .tx_registrations
                .values()
                .filter(|reg| &reg.tx_id == tx_id)
                .map(|reg| reg.on_event.clone())
                .collect()
        };
        for callback in &callbacks {
            callback(code.clone());
        }
        callbacks.len()
    }

    /// Deliver a stream error to every registration for `tx_id`.
    pub fn emit_tx_error(&self, tx_id: &TxId, reason: &str) -> usize {
        let callbacks: Vec<SharedErrorCallback> = {
            let state = self.state.lock();
            state
                .tx_registrations
                .values()
                .filter(|reg| &reg.tx_id == tx_id)
                .map(|reg| reg.on_error.clone())
                .collect()
        };
        let error = EventHubError::Stream {
            peer: self.peer_name.clone(),
            reason: reason.to_string(),
        };
        for callback in &callbacks {
            callback(error.clone());
        }
        callbacks.len()
    }

    /// Deliver a block to every block registration.
    pub fn emit_block(&self) -> usize {
        let (height, callbacks) = {
            let mut state = self.state.lock();
            state.block_height += 1;
            let callbacks: Vec<SharedBlockCallback> = state
                .block_registrations
                .values()
                .map(|(on_block, _)| on_block.clone())
                .collect();
            (state.block_height, callbacks)
        };
        for callback in &callbacks {
            callback(height);
        }
        callbacks.len()
    }

    pub fn tx_registration_count(&self, tx_id: &TxId) -> usize {
        self.state
            .lock()
            .tx_registrations
            .values()
            .filter(|reg| &reg.tx_id == tx_id)
            .count()
    }

    pub fn total_tx_registrations(&self) -> usize {
        self.state.lock().tx_registrations.len()
    }

    pub fn block_registration_count(&self) -> usize {
        self.state.lock().block_registrations.len()
    }

    pub fn connect_calls(&self) -> u64 {
        self.state.lock().connect_calls
    }

    pub fn forced_checks(&self) -> u64 {
        self.state.lock().forced_checks
    }

    pub fn disconnect_calls(&self) -> u64 {
        self.state.lock().disconnect_calls
    }

    /// Block mode requested by the last `connect`.
    pub fn full_block_mode(&self) -> Option<bool> {
        self.state.lock().full_block
    }

    fn next_id(&self) -> u64 {
        self.next_registration.fetch_add(1, Ordering::Relaxed)
    }

    /// Apply the scripted behaviour. Returns the block listeners to notify.
    fn attempt_connection(
        &self,
        state: &mut HubState,
    ) -> (Vec<SharedBlockCallback>, Vec<SharedErrorCallback>, Option<EventHubError>) {
        match state.behaviour.clone() {
            ConnectBehaviour::Succeed => {
                state.connected = true;
                state.connection_state = ConnectionState::Ready;
                state.block_height += 1;
                let on_block = state
                    .block_registrations
                    .values()
                    .map(|(on_block, _)| on_block.clone())
                    .collect();
                (on_block, Vec::new(), None)
            }
            ConnectBehaviour::Fail(reason) => {
                state.connected = false;
                state.connection_state = ConnectionState::TransientFailure;
                let on_error = state
                    .block_registrations
                    .values()
                    .map(|(_, on_error)| on_error.clone())
                    .collect();
                let error = EventHubError::ConnectionFailed {
                    peer: self.peer_name.clone(),
                    reason,
                };
                (Vec::new(), on_error, Some(error))
            }
            ConnectBehaviour::Hang => {
                state.connected = false;
                state.connection_state = ConnectionState::Connecting;
                (Vec::new(), Vec::new(), None)
            }
        }
    }
}

#[async_trait]
impl EventHub for InMemoryEventHub {
    fn peer_name(&self) -> &str {
        &self.peer_name
    }

    fn connect(&self, full_block: bool) {
        let (on_block, on_error, error, height) = {
            let mut state = self.state.lock();
            state.connect_calls += 1;
            state.full_block = Some(full_block);
            let (on_block, on_error, error) = self.attempt_connection(&mut state);
            (on_block, on_error, error, state.block_height)
        };
        for callback in &on_block {
            callback(height);
        }
        if let Some(error) = error {
            for callback in &on_error {
                callback(error.clone());
            }
        }
    }

    fn disconnect(&self) {
        let (tx_errors, block_errors) = {
            let mut state = self.state.lock();
            state.disconnect_calls += 1;
            state.connected = false;
            state.connection_state = ConnectionState::Shutdown;
            let tx_errors: Vec<SharedErrorCallback> = std::mem::take(&mut state.tx_registrations)
                .into_values()
                .map(|reg| reg.on_error)
                .collect();
            let block_errors: Vec<SharedErrorCallback> =
                std::mem::take(&mut state.block_registrations)
                    .into_values()
                    .map(|(_, on_error)| on_error)
                    .collect();
            (tx_errors, block_errors)
        };
        let error = EventHubError::Shutdown {
            peer: self.peer_name.clone(),
        };
        for callback in tx_errors.iter().chain(block_errors.iter()) {
            callback(error.clone());
        }
    }

    async fn check_connection(&self, force_reconnect: bool) -> ConnectionState {
        let mut state = self.state.lock();
        if force_reconnect {
            state.forced_checks += 1;
            if state.connection_state != ConnectionState::Ready
                && state.behaviour == ConnectBehaviour::Succeed
            {
                state.connected = true;
                state.connection_state = ConnectionState::Ready;
            }
        }
        let current = state.connection_state;
        drop(state);
        current
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn register_tx_event(
        &self,
        tx_id: &TxId,
        on_event: TxEventCallback,
        on_error: EventErrorCallback,
    ) -> Result<RegistrationId, EventHubError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(EventHubError::NotConnected {
                peer: self.peer_name.clone(),
            });
        }
        let id = self.next_id();
        state.tx_registrations.insert(
            id,
            TxRegistration {
                tx_id: tx_id.clone(),
                on_event: Arc::from(on_event),
                on_error: Arc::from(on_error),
            },
        );
        Ok(RegistrationId(id))
    }

    fn unregister_tx_event(&self, registration: RegistrationId) {
        self.state.lock().tx_registrations.remove(&registration.0);
    }

    fn register_block_event(
        &self,
        on_block: BlockEventCallback,
        on_error: EventErrorCallback,
    ) -> Result<RegistrationId, EventHubError> {
        let id = self.next_id();
        self.state
            .lock()
            .block_registrations
            .insert(id, (Arc::from(on_block), Arc::from(on_error)));
        Ok(RegistrationId(id))
    }

    fn unregister_block_event(&self, registration: RegistrationId) {
        self.state.lock().block_registrations.remove(&registration.0);
    }
}

/// Hands out one `InMemoryEventHub` per peer name, reusing it across
/// establishments so tests can keep scripting the same hub.
#[derive(Default)]
pub struct InMemoryEventHubFactory {
    hubs: Mutex<HashMap<String, Arc<InMemoryEventHub>>>,
    created: AtomicU64,
}

impl InMemoryEventHubFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub for `peer_name`, created on first use.
    pub fn hub(&self, peer_name: &str) -> Arc<InMemoryEventHub> {
        self.hubs
            .lock()
            .entry(peer_name.to_string())
            .or_insert_with(|| Arc::new(InMemoryEventHub::new(peer_name)))
            .clone()
    }

    /// Number of `create` calls so far.
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }
}

impl EventHubFactory for InMemoryEventHubFactory {
    fn create(&self, peer: &PeerInfo) -> Arc<dyn EventHub> {
        self.created.fetch_add(1, Ordering::Relaxed);
        self.hub(&peer.name)
    }
}
