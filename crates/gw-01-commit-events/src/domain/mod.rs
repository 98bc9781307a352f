//! Domain layer for commit confirmation
//!
//! Pure logic with no I/O: quorum strategies, per-organization counters,
//! and the event source wrapper.

pub mod event_source;
pub mod strategy;
pub mod tally;

pub use event_source::EventSource;
pub use strategy::{CommitStrategy, StrategyScope, StrategyVerdict};
pub use tally::{CommitTally, OrgCommitCount};
