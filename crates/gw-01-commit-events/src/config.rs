//! Event manager configuration

use crate::domain::CommitStrategy;
use std::time::Duration;

/// Default seconds before a pending commit wait is abandoned.
pub const DEFAULT_COMMIT_TIMEOUT_SECS: u64 = 60;

/// Default upper bound on a single readiness probe.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Options recognised by the event manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventManagerConfig {
    /// Quorum strategy applied by every commit handler
    pub commit_strategy: CommitStrategy,
    /// Time allowed for a commit wait; zero falls back to the default
    pub commit_timeout: Duration,
    /// Subscribe to full blocks instead of filtered events
    pub use_full_blocks_for_all: bool,
    /// Bound on each connection readiness probe
    pub probe_timeout: Duration,
}

impl Default for EventManagerConfig {
    fn default() -> Self {
        Self {
            commit_strategy: CommitStrategy::MspAll,
            commit_timeout: Duration::from_secs(DEFAULT_COMMIT_TIMEOUT_SECS),
            use_full_blocks_for_all: false,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

impl EventManagerConfig {
    pub fn with_strategy(mut self, strategy: CommitStrategy) -> Self {
        self.commit_strategy = strategy;
        self
    }

    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_full_blocks(mut self, full: bool) -> Self {
        self.use_full_blocks_for_all = full;
        self
    }

    /// Commit timeout with the zero value mapped to the default.
    pub fn effective_commit_timeout(&self) -> Duration {
        if self.commit_timeout.is_zero() {
            Duration::from_secs(DEFAULT_COMMIT_TIMEOUT_SECS)
        } else {
            self.commit_timeout
        }
    }

    /// Probe timeout with the zero value mapped to the default.
    pub fn effective_probe_timeout(&self) -> Duration {
        if self.probe_timeout.is_zero() {
            Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS)
        } else {
            self.probe_timeout
        }
    }
}
