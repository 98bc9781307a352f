//! Ports for query routing
//!
//! The outbound side is the channel port from `shared-types`.

pub mod inbound;
