//! # Shared Types Crate
//!
//! This crate contains the peer, transaction and proposal types exchanged
//! between the gateway crates, together with the `ChannelGateway` port that
//! the underlying client library implements.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Explicit Ownership**: An organization id is carried by value on every
//!   peer, never injected into transport objects after the fact.
//! - **Opaque Payloads**: Chaincode payloads and proposals are byte buffers;
//!   nothing in the gateway interprets business data.

pub mod channel;
pub mod entities;
pub mod errors;
pub mod proposal;

pub use channel::{ChannelGateway, ChannelInitOptions};
pub use entities::*;
pub use errors::*;
pub use proposal::*;
