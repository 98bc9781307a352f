//! Commit confirmation services

pub mod commit_handler;
pub mod event_manager;

pub use commit_handler::CommitHandler;
pub use event_manager::{EventManager, PoolLease, PoolSnapshot};
