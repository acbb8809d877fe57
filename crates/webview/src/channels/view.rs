//! HTML push channel.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, Stream, StreamExt};
use tracing::debug;

use super::peer::{serve_connection, ChannelFlags, PeerSlot};
use crate::error::Result;

const CHANNEL: &str = "view";

/// Pushes HTML (or any text) to the bound page.
///
/// No queueing and no replay: a push with no peer bound is dropped, and the
/// page only ever sees what is pushed while it is connected.
pub struct ViewChannel {
    slot: PeerSlot,
}

impl ViewChannel {
    pub fn new(flags: Arc<ChannelFlags>) -> Self {
        Self {
            slot: PeerSlot::new(CHANNEL, flags),
        }
    }

    /// Send `content` verbatim. Returns false if no peer is bound.
    pub fn push(&self, content: impl Into<String>) -> bool {
        let sent = self.slot.send(Message::Text(content.into().into()));
        if self.slot.verbose() {
            if sent {
                debug!(channel = CHANNEL, "View updated");
            } else {
                debug!(channel = CHANNEL, "No peer bound, view update dropped");
            }
        }
        sent
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    /// Serve an accepted websocket until it closes.
    pub async fn serve(&self, socket: WebSocket) -> Result<()> {
        let (sink, stream) = socket.split();
        self.serve_io(sink, stream).await
    }

    /// Serve any sink/stream pair. Inbound frames only tell us the peer is
    /// still there; their content is ignored.
    pub async fn serve_io<S, R, E>(&self, sink: S, stream: R) -> Result<()>
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
        R: Stream<Item = std::result::Result<Message, E>> + Unpin,
        E: Display,
    {
        serve_connection(&self.slot, sink, stream, |_| Ok(())).await
    }
}
