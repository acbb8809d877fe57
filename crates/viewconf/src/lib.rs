//! Minimal configuration loading for the webview server.
//!
//! The server, its channel managers and the `webview` binary all read the
//! same `WebviewConfig`. It is deliberately small: where to listen, what to
//! call the page, and how loud to be.
//!
//! # Usage
//!
//! ```rust,no_run
//! use viewconf::WebviewConfig;
//!
//! let config = WebviewConfig::load().expect("Failed to load config");
//! println!("Listening on {}", config.bind_addr());
//! println!("Debug logging: {}", config.logging.debug);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/webview/config.toml` (system)
//! 2. `~/.config/webview/config.toml` (user)
//! 3. `./webview.toml` (local override, replaced by `--config` when given)
//! 4. Environment variables (`WEBVIEW_*`)
//!
//! # Example Config
//!
//! ```toml
//! [server]
//! title = "Kiosk"
//! host = "0.0.0.0"
//! port = 3000
//!
//! [logging]
//! debug = true
//! log_level = "info"
//! otlp_endpoint = "127.0.0.1:4317"
//!
//! [browser]
//! kiosk_mode = true
//! orientation = "portrait"
//! window_size = [800, 1280]
//! ```

pub mod browser;
pub mod loader;
pub mod logging;
pub mod server;

pub use browser::{BrowserConfig, Orientation};
pub use loader::{discover_config_files_with_override, ConfigLayer, ConfigSources};
pub use logging::LoggingConfig;
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete webview configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WebviewConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Partial update applied by [`WebviewConfig::set`].
///
/// Only fields that are `Some` change; everything else keeps its value.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub title: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: Option<bool>,
    pub log_level: Option<String>,
    pub kiosk_mode: Option<bool>,
    pub orientation: Option<Orientation>,
    pub window_size: Option<[u32; 2]>,
}

impl WebviewConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/webview/config.toml`
    /// 3. `~/.config/webview/config.toml`
    /// 4. `./webview.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration using `config_path` in place of `./webview.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = WebviewConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let layer = loader::load_from_file(&path)?;
            layer.apply_to(&mut config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Apply a partial update.
    pub fn set(&mut self, update: ConfigUpdate) {
        if let Some(title) = update.title {
            self.server.title = title;
        }
        if let Some(host) = update.host {
            self.server.host = host;
        }
        if let Some(port) = update.port {
            self.server.port = port;
        }
        if let Some(debug) = update.debug {
            self.logging.debug = debug;
        }
        if let Some(log_level) = update.log_level {
            self.logging.log_level = log_level;
        }
        if let Some(kiosk_mode) = update.kiosk_mode {
            self.browser.kiosk_mode = kiosk_mode;
        }
        if let Some(orientation) = update.orientation {
            self.browser.orientation = orientation;
        }
        if let Some(window_size) = update.window_size {
            self.browser.window_size = Some(window_size);
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Webview Configuration\n\n");

        output.push_str("[server]\n");
        output.push_str(&format!("title = {}\n", quote(&self.server.title)));
        output.push_str(&format!("host = {}\n", quote(&self.server.host)));
        output.push_str(&format!("port = {}\n", self.server.port));

        output.push_str("\n[logging]\n");
        output.push_str(&format!("debug = {}\n", self.logging.debug));
        output.push_str(&format!("log_level = {}\n", quote(&self.logging.log_level)));
        if let Some(endpoint) = &self.logging.otlp_endpoint {
            output.push_str(&format!("otlp_endpoint = {}\n", quote(endpoint)));
        }

        output.push_str("\n[browser]\n");
        output.push_str(&format!("command = {}\n", quote(&self.browser.command)));
        output.push_str(&format!("kiosk_mode = {}\n", self.browser.kiosk_mode));
        output.push_str(&format!(
            "orientation = {}\n",
            quote(self.browser.orientation.as_str())
        ));
        if let Some([width, height]) = self.browser.window_size {
            output.push_str(&format!("window_size = [{}, {}]\n", width, height));
        }

        output
    }
}

/// TOML basic-string quoting, including control-character escapes.
fn quote(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
