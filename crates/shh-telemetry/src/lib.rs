//! # Shh Telemetry
//!
//! Logging and metrics for the shh node.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shh_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SHH_SERVICE_NAME` | `shh-node` | Service name in log records |
//! | `SHH_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `SHH_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `SHH_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, ADMISSIONS, DISPATCH_DROPPED,
    DISPATCH_QUEUED, ENVELOPES_POOLED, IDENTITIES_STORED, MESSAGES_POOLED, PEERS_CONNECTED,
    PROTOCOL_VIOLATIONS, SWEEP_DURATION, SWEPT_ENVELOPES, SYM_KEYS_STORED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metrics could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and register metrics.
///
/// The returned guard keeps the metrics registry handle alive.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(config)?;
    Ok(TelemetryGuard { _metrics: metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}

/// Log an envelope-related event with standard fields.
#[macro_export]
macro_rules! log_envelope_event {
    ($level:ident, $msg:expr, $hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            envelope = %$hash,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a peer-related event with standard fields.
#[macro_export]
macro_rules! log_peer_event {
    ($level:ident, $msg:expr, $peer_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            peer_id = %$peer_id,
            $($($field)*,)?
            $msg
        )
    };
}
