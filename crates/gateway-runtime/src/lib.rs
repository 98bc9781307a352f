//! # Gateway Runtime
//!
//! Network-level facade over the gateway crates.
//!
//! ## Structure
//!
//! - `config` - layered `GatewayConfig` (defaults, TOML file, environment)
//! - `ports` - `ClientConnector`, implemented by the underlying client library
//! - `gateway` - `Gateway`, one per identity, caching ledgers by channel
//! - `ledger` - `Ledger`, one per channel, caching contracts by chaincode
//! - `adapters` - in-process channel and client
//!
//! ## Ledger Initialisation
//!
//! ```text
//! ledger-query peers ──initialize (failover)──→ channel ready
//!         │
//!         ▼
//! PeerMap (org → peers) ──→ EventManager::initialize  (if enabled)
//!         │
//!         └──────────────→ create_query_handler(sticky | round_robin)
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod ports;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
pub use ledger::Ledger;
pub use ports::ClientConnector;
