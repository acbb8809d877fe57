//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, Orientation, WebviewConfig};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// One config file's worth of settings.
///
/// Every field is optional so that a file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub server: ServerLayer,
    #[serde(default)]
    pub logging: LoggingLayer,
    #[serde(default)]
    pub browser: BrowserLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerLayer {
    pub title: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingLayer {
    pub debug: Option<bool>,
    pub log_level: Option<String>,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserLayer {
    pub command: Option<String>,
    pub kiosk_mode: Option<bool>,
    pub orientation: Option<Orientation>,
    pub window_size: Option<[u32; 2]>,
}

impl ConfigLayer {
    /// Overlay this layer onto `config`, field by field.
    pub fn apply_to(self, config: &mut WebviewConfig) {
        if let Some(v) = self.server.title {
            config.server.title = v;
        }
        if let Some(v) = self.server.host {
            config.server.host = v;
        }
        if let Some(v) = self.server.port {
            config.server.port = v;
        }
        if let Some(v) = self.logging.debug {
            config.logging.debug = v;
        }
        if let Some(v) = self.logging.log_level {
            config.logging.log_level = v;
        }
        if let Some(v) = self.logging.otlp_endpoint {
            config.logging.otlp_endpoint = Some(v);
        }
        if let Some(v) = self.browser.command {
            config.browser.command = v;
        }
        if let Some(v) = self.browser.kiosk_mode {
            config.browser.kiosk_mode = v;
        }
        if let Some(v) = self.browser.orientation {
            config.browser.orientation = v;
        }
        if let Some(v) = self.browser.window_size {
            config.browser.window_size = Some(v);
        }
    }
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/webview/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("webview/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("webview.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load a config layer from a TOML file.
pub fn load_from_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

fn parse_toml(contents: &str, path: &Path) -> Result<ConfigLayer, ConfigError> {
    toml::from_str(contents).map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut WebviewConfig, sources: &mut ConfigSources) {
    apply_overrides_with(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Values that fail to parse are skipped rather than treated as errors.
pub fn apply_overrides_with<F>(config: &mut WebviewConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("WEBVIEW_HOST") {
        config.server.host = v;
        sources.env_overrides.push("WEBVIEW_HOST".to_string());
    }
    if let Some(v) = lookup("WEBVIEW_PORT") {
        if let Ok(port) = v.parse() {
            config.server.port = port;
            sources.env_overrides.push("WEBVIEW_PORT".to_string());
        }
    }
    if let Some(v) = lookup("WEBVIEW_TITLE") {
        config.server.title = v;
        sources.env_overrides.push("WEBVIEW_TITLE".to_string());
    }
    if let Some(v) = lookup("WEBVIEW_DEBUG") {
        if let Some(debug) = parse_bool(&v) {
            config.logging.debug = debug;
            sources.env_overrides.push("WEBVIEW_DEBUG".to_string());
        }
    }
    if let Some(v) = lookup("WEBVIEW_LOG_LEVEL") {
        config.logging.log_level = v;
        sources.env_overrides.push("WEBVIEW_LOG_LEVEL".to_string());
    }
    if let Some(v) = lookup("WEBVIEW_OTLP_ENDPOINT") {
        config.logging.otlp_endpoint = Some(v);
        sources.env_overrides.push("WEBVIEW_OTLP_ENDPOINT".to_string());
    }
    if let Some(v) = lookup("WEBVIEW_BROWSER") {
        config.browser.command = v;
        sources.env_overrides.push("WEBVIEW_BROWSER".to_string());
    }
    if let Some(v) = lookup("WEBVIEW_KIOSK") {
        if let Some(kiosk) = parse_bool(&v) {
            config.browser.kiosk_mode = kiosk;
            sources.env_overrides.push("WEBVIEW_KIOSK".to_string());
        }
    }
    if let Some(v) = lookup("WEBVIEW_ORIENTATION") {
        if let Ok(orientation) = v.parse() {
            config.browser.orientation = orientation;
            sources.env_overrides.push("WEBVIEW_ORIENTATION".to_string());
        }
    }
    // Also support standard OTEL env var
    if let Some(v) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.logging.otlp_endpoint = Some(v);
        sources.env_overrides.push("OTEL_EXPORTER_OTLP_ENDPOINT".to_string());
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
