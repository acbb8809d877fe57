//! Wire format for the four channels.
//!
//! Everything except the view channel speaks JSON text frames. The view
//! channel pushes the raw HTML with no envelope.

use axum::extract::ws::Message;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::clip::AudioClip;
use crate::error::{ChannelError, Result};

/// Websocket path for HTML pushes.
pub const VIEW_ENDPOINT: &str = "ws-html-updater";
/// Websocket path for audio playback.
pub const PLAYBACK_ENDPOINT: &str = "ws-audio-player";
/// Websocket path for microphone capture.
pub const CAPTURE_ENDPOINT: &str = "ws-audio-recorder";
/// Websocket path for UI interaction events.
pub const EVENT_ENDPOINT: &str = "ws-ui-event";

/// Controller -> player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerCommand {
    /// Play `data` after waiting `delay` seconds, then report completion for `id`.
    Audio {
        id: Uuid,
        data: AudioClip,
        delay: f64,
    },
}

/// Player -> controller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerReport {
    /// The clip with this id finished playing. The id stays a string here;
    /// one that is not a uuid simply never matches a pending entry.
    PlaybackComplete { id: String },
    #[serde(other)]
    Other,
}

/// Controller -> recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RecorderCommand {
    StartRecording,
    StopRecording,
}

/// Recorder -> controller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecorderReport {
    /// One block of mono float samples in [-1.0, 1.0].
    AudioData { data: Vec<f32> },
    #[serde(other)]
    Other,
}

/// Browser -> controller: something happened to an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiEvent {
    pub element_id: String,
    pub event_type: String,
}

/// Encode a message as a JSON text frame.
pub fn to_frame<T: Serialize>(value: &T) -> std::result::Result<Message, serde_json::Error> {
    let text = serde_json::to_string(value)?;
    Ok(Message::Text(text.into()))
}

/// Decode a JSON text frame, tagging failures with the channel name.
pub fn decode<T: DeserializeOwned>(channel: &'static str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| ChannelError::malformed(channel, e))
}
