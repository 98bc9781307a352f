//! Adapters for the gateway ports

pub mod in_memory;

pub use in_memory::{ChaincodeFn, InMemoryChannel, InMemoryClient};
