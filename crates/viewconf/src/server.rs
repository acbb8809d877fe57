//! Server configuration - where the page and channel endpoints are served.

use serde::{Deserialize, Serialize};

/// Listener settings for the page and its websocket channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Title shown on the browser tab.
    /// Default: "Webview Server"
    #[serde(default = "ServerConfig::default_title")]
    pub title: String,

    /// Address the HTTP listener binds to.
    /// Default: 127.0.0.1
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,

    /// Port the HTTP listener binds to.
    /// Default: 8080
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_title() -> String {
        "Webview Server".to_string()
    }

    fn default_host() -> String {
        "127.0.0.1".to_string()
    }

    fn default_port() -> u16 {
        8080
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}
