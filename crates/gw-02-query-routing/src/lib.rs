//! # gw-02-query-routing
//!
//! Chooses which peer answers a read-only chaincode query and recovers from
//! peer failure without involving the caller.
//!
//! ## Handlers
//!
//! | handler | order tried | state |
//! |---------|-------------|-------|
//! | `StickyQueryHandler` | last successful peer, then the rest in order | cursor per handler |
//! | `RoundRobinQueryHandler` | ascending usage count | `PeerUsageTable` shared between handlers |
//!
//! Peers are tried one at a time. A peer that is unreachable, or answers
//! with gRPC status 14 (UNAVAILABLE), is skipped; any other answer,
//! including a chaincode error, is returned to the caller.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{ChaincodeQuery, PeerUsageTable, QueryHandlerKind};
pub use error::{QueryError, QueryResult};
pub use ports::inbound::QueryHandler;
pub use service::{create_query_handler, RoundRobinQueryHandler, StickyQueryHandler};
