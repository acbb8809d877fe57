//! Drive a browser page from Rust over websockets.
//!
//! The page opens one socket per capability: HTML view updates, audio
//! playback, microphone capture and UI events. Each capability has a channel
//! manager that binds at most one live peer, and the [`Webview`] façade ties
//! them together for the controlling program.
//!
//! ```no_run
//! use std::time::Duration;
//! use webview::{AudioClip, Webview};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let webview = Webview::new(viewconf::WebviewConfig::load()?);
//! webview.push_view("<h1>hello</h1>");
//! let clip = AudioClip::from_file("beep.wav")?;
//! let id = webview.enqueue_audio(clip, 0.0, Duration::from_secs(5)).await;
//! if webview.playback().is_pending(&id) {
//!     println!("timed out");
//! }
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod clip;
pub mod error;
pub mod multiplexer;
pub mod pcm;
pub mod protocol;
pub mod telemetry;
pub mod web;

pub use clip::AudioClip;
pub use error::{ChannelError, Result};
pub use multiplexer::{HealthSnapshot, Webview};
pub use viewconf::{ConfigUpdate, WebviewConfig};
