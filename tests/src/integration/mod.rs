//! Cross-crate integration flows.

pub mod commit_flow;
pub mod gateway_flow;
pub mod query_flow;
