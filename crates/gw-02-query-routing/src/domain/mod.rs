//! Domain layer for query routing

pub mod peer_usage;
pub mod query;

pub use peer_usage::PeerUsageTable;
pub use query::{ChaincodeQuery, QueryHandlerKind};
