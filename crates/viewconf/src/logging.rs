//! Logging and telemetry configuration.

use serde::{Deserialize, Serialize};

/// Verbosity and export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Verbose channel logging: binds, unbinds, pushes with no peer.
    /// Default: false
    #[serde(default)]
    pub debug: bool,

    /// Base log level (trace, debug, info, warning, error, critical).
    /// Default: warning
    #[serde(default = "LoggingConfig::default_log_level")]
    pub log_level: String,

    /// OTLP gRPC endpoint. Telemetry export is off when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl LoggingConfig {
    fn default_log_level() -> String {
        "warning".to_string()
    }

    /// Map the configured level onto a `tracing` filter directive.
    ///
    /// `warning` and `critical` are accepted alongside the usual names.
    pub fn filter_level(&self) -> &'static str {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" | "warning" => "warn",
            "error" | "critical" | "fatal" => "error",
            "off" | "none" => "off",
            _ => "warn",
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: Self::default_log_level(),
            otlp_endpoint: None,
        }
    }
}
