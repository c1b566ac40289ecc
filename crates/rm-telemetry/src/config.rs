//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `rm_gateway=debug,info`
    pub log_level: String,

    /// Whether to emit one JSON object per event
    pub json_logs: bool,

    /// Whether to colour human-readable output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "rm-agent".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RM_SERVICE_NAME`: Service name (default: rm-agent)
    /// - `RM_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `RM_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `RM_LOG_ANSI`: Colour human-readable logs (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("RM_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("RM_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .filter(|level| !level.trim().is_empty())
                .unwrap_or(defaults.log_level),

            json_logs: lookup("RM_JSON_LOGS")
                .map(|v| flag(&v))
                .unwrap_or(is_container),

            ansi: lookup("RM_LOG_ANSI").map(|v| flag(&v)).unwrap_or(defaults.ansi),
        }
    }
}

fn flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
