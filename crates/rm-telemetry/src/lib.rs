//! # RM Telemetry
//!
//! Log setup for the resource gateway.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rm_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Events are now written to stderr
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RM_LOG_LEVEL` / `RUST_LOG` | `info` | Level or `EnvFilter` directive |
//! | `RM_JSON_LOGS` | `false` | One JSON object per event |
//! | `RM_LOG_ANSI` | `false` | Colour human-readable output |
//! | `RM_SERVICE_NAME` | `rm-agent` | Service name in the startup event |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install the global subscriber.
///
/// Returns a guard to hold for the lifetime of the application; dropping it
/// logs the shutdown.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    logging::init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}
