//! Ports for commit confirmation
//!
//! - `inbound`: what the transaction coordinator drives
//! - `outbound`: what the client library must provide (event hubs)

pub mod inbound;
pub mod outbound;
