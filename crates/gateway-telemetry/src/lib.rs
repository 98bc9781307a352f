//! # Gateway Telemetry
//!
//! Observability plumbing shared by every gateway crate.
//!
//! ## Components
//!
//! - **Logging**: `tracing` subscriber with env filter and optional JSON output
//! - **Metrics**: Prometheus counters, gauges and histograms for commit waits
//!   and query routing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_logging(&config).expect("logging");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GW_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `GW_JSON_LOGS` | `false` | Emit JSON formatted logs |
//! | `GW_SERVICE_NAME` | `ledger-gateway` | Service name attached to logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    clear_event_sources_connected, gather_metrics, record_commit_outcome, record_query_attempt,
    set_event_sources_connected, CommitOutcome, QueryAttemptOutcome,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to encode metrics: {0}")]
    MetricsEncode(String),
}
