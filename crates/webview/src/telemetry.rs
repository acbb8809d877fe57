//! Logging setup.
//!
//! Console logging through `tracing_subscriber` always. When an OTLP endpoint
//! is configured, traces and logs are exported there as well. The level
//! filter sits behind a reload layer so debug mode can be toggled at runtime.

use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler};
use opentelemetry_sdk::Resource;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};
use viewconf::LoggingConfig;

/// Timeout for OTLP exports - prevents blocking on unavailable endpoints
const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

const SERVICE_NAME: &str = "webview";

/// Filter used when `RUST_LOG` is not set.
///
/// The configured level applies everywhere; debug mode additionally opens
/// this crate up to debug level so channel lifecycle logs show.
pub fn default_directives(config: &LoggingConfig) -> String {
    let base = config.filter_level();
    if config.debug {
        format!("{base},webview=debug")
    } else {
        base.to_string()
    }
}

/// Handle for changing the installed level filter.
///
/// When `RUST_LOG` chose the filter at startup it is left alone.
#[derive(Clone)]
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    pinned: bool,
}

impl LogControl {
    /// Rebuild the filter from `config`.
    pub fn apply(&self, config: &LoggingConfig) -> Result<()> {
        if self.pinned {
            return Ok(());
        }
        let directives = default_directives(config);
        self.handle
            .modify(|filter| *filter = EnvFilter::new(&directives))
            .context("Failed to reload log filter")
    }
}

/// The reloadable filter layer and its control handle.
///
/// `RUST_LOG` wins over `config` when set.
pub fn filter_layer(config: &LoggingConfig) -> (reload::Layer<EnvFilter, Registry>, LogControl) {
    let (filter, pinned) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_directives(config)), false),
    };
    let (layer, handle) = reload::Layer::new(filter);
    (layer, LogControl { handle, pinned })
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<LogControl> {
    let (env_filter, control) = filter_layer(config);

    let Some(otlp_endpoint) = config.otlp_endpoint.as_deref() else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to install tracing subscriber")?;
        return Ok(control);
    };

    let resource = Resource::builder_empty()
        .with_service_name(SERVICE_NAME)
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let endpoint = if otlp_endpoint.contains("://") {
        otlp_endpoint.to_string()
    } else {
        format!("http://{}", otlp_endpoint)
    };

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to create OTLP span exporter")?;

    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_span_processor(
            opentelemetry_sdk::trace::BatchSpanProcessor::builder(trace_exporter).build(),
        )
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource.clone())
        .build();

    let tracer = tracer_provider.tracer(SERVICE_NAME);
    global::set_tracer_provider(tracer_provider);

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to create OTLP log exporter")?;

    let logger_provider = opentelemetry_sdk::logs::SdkLoggerProvider::builder()
        .with_log_processor(
            opentelemetry_sdk::logs::BatchLogProcessor::builder(log_exporter).build(),
        )
        .with_resource(resource)
        .build();

    let log_appender =
        opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&logger_provider);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(log_appender)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(endpoint = otlp_endpoint, "OpenTelemetry export enabled");
    Ok(control)
}

/// Flush point for shutdown.
///
/// The batch processors flush on drop within [`EXPORT_TIMEOUT`], so there is
/// nothing to call explicitly on opentelemetry 0.28.
pub fn shutdown() -> Result<()> {
    tracing::debug!("Telemetry shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        let mut config = LoggingConfig::default();
        assert_eq!(default_directives(&config), "warn");

        config.debug = true;
        config.log_level = "info".to_string();
        assert_eq!(default_directives(&config), "info,webview=debug");
    }
}
