//! Errors that end a peer connection.
//!
//! None of these cross channel boundaries: the connection loop that hits one
//! unbinds its peer and returns it to the caller for logging.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// The peer sent a frame that does not decode as this channel's protocol.
    #[error("{channel}: malformed message from peer: {source}")]
    Malformed {
        channel: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A playback completion named an id with no pending entry.
    #[error("playback completion for unknown id {id}")]
    UnknownCorrelation { id: String },

    /// The underlying socket failed on send or receive.
    #[error("{channel}: transport error: {message}")]
    Transport {
        channel: &'static str,
        message: String,
    },
}

impl ChannelError {
    pub(crate) fn malformed(channel: &'static str, source: serde_json::Error) -> Self {
        Self::Malformed { channel, source }
    }

    pub(crate) fn transport(channel: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            channel,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
