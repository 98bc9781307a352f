//! Structured logging setup.
//!
//! Every gateway crate logs through `tracing` with a consistent set of
//! fields (`tx_id`, `peer`, `msp_id`, ...). The helper macros below keep
//! those field names uniform.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, so calling
/// this more than once is harmless.
pub fn init_logging(config: &TelemetryConfig) -> Result<bool, TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    let installed = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .is_ok()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::debug!(
            service = %config.service_name,
            json_logs = config.json_logs,
            "Logging initialized"
        );
    }
    Ok(installed)
}

/// Log a transaction-related event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $msg:expr, $tx_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            tx_id = %$tx_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a peer-related event with standard fields.
#[macro_export]
macro_rules! log_peer_event {
    ($level:ident, $msg:expr, $peer:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            peer = %$peer,
            $($($field)*,)?
            $msg
        )
    };
}
