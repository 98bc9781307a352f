//! # Gateway Configuration
//!
//! Layered configuration: defaults, then an optional TOML file, then
//! environment overrides.
//!
//! ## Config File Format
//!
//! ```toml
//! [event_manager]
//! enabled = true
//! commit_strategy = "mspAll"
//! commit_timeout_secs = 60
//! use_full_blocks_for_all = false
//! probe_timeout_secs = 30
//!
//! [query]
//! handler = "sticky"
//!
//! [discovery]
//! enabled = false
//! as_localhost = false
//! ```
//!
//! Every key is optional.

use crate::error::{GatewayError, GatewayResult};
use gw_01_commit_events::config::{DEFAULT_COMMIT_TIMEOUT_SECS, DEFAULT_PROBE_TIMEOUT_SECS};
use gw_01_commit_events::{CommitStrategy, EventManagerConfig};
use gw_02_query_routing::QueryHandlerKind;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub event_manager: EventManagerSection,
    pub query: QuerySection,
    pub discovery: DiscoverySection,
}

/// `[event_manager]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventManagerSection {
    /// Wait for commit events on submit.
    pub enabled: bool,
    pub commit_strategy: CommitStrategy,
    pub commit_timeout_secs: u64,
    pub use_full_blocks_for_all: bool,
    pub probe_timeout_secs: u64,
}

impl Default for EventManagerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            commit_strategy: CommitStrategy::MspAll,
            commit_timeout_secs: DEFAULT_COMMIT_TIMEOUT_SECS,
            use_full_blocks_for_all: false,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

impl EventManagerSection {
    pub fn to_event_manager_config(&self) -> EventManagerConfig {
        EventManagerConfig::default()
            .with_strategy(self.commit_strategy)
            .with_commit_timeout(Duration::from_secs(self.commit_timeout_secs))
            .with_probe_timeout(Duration::from_secs(self.probe_timeout_secs))
            .with_full_blocks(self.use_full_blocks_for_all)
    }
}

/// `[query]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySection {
    pub handler: QueryHandlerKind,
}

/// `[discovery]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverySection {
    pub enabled: bool,
    /// Map discovered endpoints to localhost.
    pub as_localhost: bool,
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| GatewayError::ConfigIo {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> GatewayResult<Self> {
        toml::from_str(content).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Apply `GW_*` environment overrides.
    ///
    /// - `GW_COMMIT_STRATEGY`
    /// - `GW_COMMIT_TIMEOUT_SECS`
    /// - `GW_USE_FULL_BLOCKS`
    /// - `GW_QUERY_HANDLER`
    pub fn apply_env_overrides(&mut self) -> GatewayResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> GatewayResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("GW_COMMIT_STRATEGY") {
            self.event_manager.commit_strategy = value
                .parse()
                .map_err(|e: gw_01_commit_events::CommitError| GatewayError::Config(e.to_string()))?;
        }
        if let Some(value) = lookup("GW_COMMIT_TIMEOUT_SECS") {
            self.event_manager.commit_timeout_secs = value.trim().parse().map_err(|_| {
                GatewayError::Config(format!("GW_COMMIT_TIMEOUT_SECS is not a number: {}", value))
            })?;
        }
        if let Some(value) = lookup("GW_USE_FULL_BLOCKS") {
            self.event_manager.use_full_blocks_for_all = parse_flag(&value);
        }
        if let Some(value) = lookup("GW_QUERY_HANDLER") {
            self.query.handler = value
                .parse()
                .map_err(|e: gw_02_query_routing::QueryError| GatewayError::Config(e.to_string()))?;
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}
