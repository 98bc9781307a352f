//! # gw-01-commit-events
//!
//! Commit confirmation for submitted transactions.
//!
//! ## Overview
//!
//! This crate provides:
//! - **Event source pool**: one `EventSource` per peer able to emit
//!   transaction events, established according to the configured strategy
//! - **Quorum strategies**: `mspAll`, `mspAny`, `channelAll`, `channelAny`
//! - **Commit handlers**: per-transaction state machine that fans in events
//!   from every live source and resolves exactly once
//!
//! ## Architecture
//!
//! ```text
//! Contract ──create_commit_handler──→ EventManager ──snapshot──→ [EventSource..]
//!                                                                     │
//!     ┌──────────────── tx event / error callbacks ───────────────────┘
//!     ▼
//! CommitHandler ──CommitTally──→ CommitStrategy::on_signal ──→ PASSED | FAILED | ONGOING
//! ```
//!
//! ## Commit Handler Lifecycle
//!
//! ```text
//! [CREATED] ──start_listening──→ [LISTENING] ──strategy passed──→ [RESOLVED: Ok]
//!                                     │
//!                                     ├──strategy failed / rejected code──→ [RESOLVED: Err]
//!                                     ├──timer fired──→ [RESOLVED: Timeout]
//!                                     └──cancel_listening──→ [RESOLVED: Cancelled]
//! ```
//!
//! Every registration is removed before the outcome becomes visible to
//! `wait_for_events` callers.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gw_01_commit_events::{EventManager, EventManagerConfig};
//!
//! let manager = EventManager::new("mychannel", "Org1MSP", peer_map, factory, config)?;
//! manager.initialize().await?;
//!
//! let handler = manager.create_commit_handler(&tx_id).await?;
//! handler.start_listening().await?;
//! // ... send the transaction to the orderer ...
//! handler.wait_for_events().await?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::in_memory::{ConnectBehaviour, InMemoryEventHub, InMemoryEventHubFactory};
pub use config::EventManagerConfig;
pub use domain::{
    CommitStrategy, CommitTally, EventSource, OrgCommitCount, StrategyScope, StrategyVerdict,
};
pub use error::{CommitError, CommitResult, EventHubError};
pub use ports::inbound::{CommitHandlerApi, EventManagerApi};
pub use ports::outbound::{
    BlockEventCallback, ConnectionState, EventErrorCallback, EventHub, EventHubFactory,
    RegistrationId, TxEventCallback,
};
pub use service::{CommitHandler, EventManager};
