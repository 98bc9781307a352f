//! Adapters for the outbound ports
//!
//! - `in_memory`: scriptable event hubs for tests and local development

pub mod in_memory;
