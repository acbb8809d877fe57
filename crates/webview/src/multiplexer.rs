//! The controller-facing façade.
//!
//! `Webview` owns the four channel managers and the shared flags. It adds no
//! state of its own beyond the active configuration and the log filter handle.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use viewconf::WebviewConfig;

use crate::channels::{CaptureChannel, ChannelFlags, EventChannel, PlaybackChannel, ViewChannel};
use crate::clip::AudioClip;
use crate::telemetry::LogControl;

pub struct Webview {
    config: RwLock<WebviewConfig>,
    flags: Arc<ChannelFlags>,
    view: ViewChannel,
    playback: PlaybackChannel,
    capture: CaptureChannel,
    events: EventChannel,
    log_control: RwLock<Option<LogControl>>,
    started_at: Instant,
}

/// Point-in-time view of every channel, served on `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub debug: bool,
    pub view_bound: bool,
    pub playback_bound: bool,
    pub playback_pending: usize,
    pub capture_bound: bool,
    pub recording: bool,
    pub events_bound: bool,
}

impl Webview {
    pub fn new(config: WebviewConfig) -> Arc<Self> {
        let flags = ChannelFlags::new(config.logging.debug);
        Arc::new(Self {
            view: ViewChannel::new(flags.clone()),
            playback: PlaybackChannel::new(flags.clone()),
            capture: CaptureChannel::new(flags.clone()),
            events: EventChannel::new(flags.clone()),
            flags,
            config: RwLock::new(config),
            log_control: RwLock::new(None),
            started_at: Instant::now(),
        })
    }

    /// Let [`Self::bind_config`] retune the installed log filter.
    pub fn attach_log_control(&self, control: LogControl) {
        *self
            .log_control
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(control);
    }

    /// Replace the configuration. The debug flag and log level take effect
    /// immediately; host and port only matter before serving.
    pub fn bind_config(&self, config: WebviewConfig) {
        self.flags.set_debug(config.logging.debug);
        let control = self
            .log_control
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(control) = control {
            if let Err(e) = control.apply(&config.logging) {
                warn!(error = %e, "Log filter not updated");
            }
        }
        if config.logging.debug {
            info!(bind = %config.bind_addr(), "Configuration updated");
        }
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn config(&self) -> WebviewConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Show `html` on the page. False if no page is connected.
    pub fn push_view(&self, html: impl Into<String>) -> bool {
        self.view.push(html)
    }

    /// Play `clip` after `delay` seconds and wait up to `timeout` for it to finish.
    pub async fn enqueue_audio(&self, clip: AudioClip, delay: f64, timeout: Duration) -> Uuid {
        self.playback.enqueue_and_wait(clip, delay, timeout).await
    }

    /// Start recording, sending each block of PCM to `processor`.
    pub fn start_capture<F>(&self, processor: F) -> bool
    where
        F: Fn(Bytes) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.capture.start(processor)
    }

    pub fn stop_capture(&self) -> bool {
        self.capture.stop()
    }

    pub fn register_event_callback<F>(&self, callback: F)
    where
        F: Fn(&str, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.register(callback)
    }

    pub fn view(&self) -> &ViewChannel {
        &self.view
    }

    pub fn playback(&self) -> &PlaybackChannel {
        &self.playback
    }

    pub fn capture(&self) -> &CaptureChannel {
        &self.capture
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn flags(&self) -> &Arc<ChannelFlags> {
        &self.flags
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: self.started_at.elapsed().as_secs(),
            debug: self.flags.debug(),
            view_bound: self.view.is_bound(),
            playback_bound: self.playback.is_bound(),
            playback_pending: self.playback.pending_count(),
            capture_bound: self.capture.is_bound(),
            recording: self.capture.is_recording(),
            events_bound: self.events.is_bound(),
        }
    }
}
