//! # gw-03-transactions
//!
//! The transaction coordinator (`Contract`) for one chaincode on one channel.
//!
//! ## Submit Flow
//!
//! ```text
//! create_commit_handler ─→ quick_check_event_hubs
//!         │
//!         ▼
//! send_transaction_proposal ─→ validate_peer_responses ─→ start_listening
//!                                                              │
//!         ┌────────────────────────────────────────────────────┘
//!         ▼
//! send_transaction ──status != SUCCESS──→ cancel_listening, OrdererRejected
//!         │
//!         ▼
//! wait_for_events ─→ payload of the first valid endorsement
//! ```
//!
//! Queries bypass ordering entirely and go through the ledger's query
//! handler.

pub mod contract;
pub mod error;
pub mod validation;

pub use contract::Contract;
pub use error::{TransactionError, TransactionResult};
pub use validation::{validate_peer_responses, ValidatedResponses};
