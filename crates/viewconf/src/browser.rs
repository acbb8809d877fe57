//! Browser launch settings for `webview --open`.

use serde::{Deserialize, Serialize};

/// Screen orientation requested from the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl std::str::FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landscape" => Ok(Orientation::Landscape),
            "portrait" => Ok(Orientation::Portrait),
            other => Err(format!("unknown orientation: {other}")),
        }
    }
}

/// How the page gets opened when the binary launches a browser itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Chromium-family executable to launch.
    /// Default: chromium
    #[serde(default = "BrowserConfig::default_command")]
    pub command: String,

    /// Fullscreen with no browser UI.
    /// Default: false
    #[serde(default)]
    pub kiosk_mode: bool,

    /// Default: landscape
    #[serde(default)]
    pub orientation: Orientation,

    /// Fixed `[width, height]`. Unset leaves the window maximized.
    #[serde(default)]
    pub window_size: Option<[u32; 2]>,
}

impl BrowserConfig {
    fn default_command() -> String {
        "chromium".to_string()
    }

    /// Command-line flags for the browser, not including the page URL.
    ///
    /// Autoplay is always allowed so the playback channel can start clips
    /// without a user gesture.
    pub fn browser_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--no-first-run",
            "--start-maximized",
            "--disable-infobars",
            "--no-default-browser-check",
            "--autoplay-policy=no-user-gesture-required",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if self.kiosk_mode {
            args.push("--kiosk".to_string());
        }
        if self.orientation == Orientation::Portrait {
            args.push("--force-device-scale-factor=1".to_string());
            args.push("--force-device-orientation=portrait".to_string());
        }
        if let Some([width, height]) = self.window_size {
            args.push(format!("--window-size={},{}", width, height));
        }
        args
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            command: Self::default_command(),
            kiosk_mode: false,
            orientation: Orientation::default(),
            window_size: None,
        }
    }
}
