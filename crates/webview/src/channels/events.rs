//! UI interaction events.

use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, Stream, StreamExt};
use tracing::debug;

use super::peer::{serve_connection, ChannelFlags, PeerSlot};
use super::run_callback;
use crate::error::Result;
use crate::protocol::{decode, UiEvent};

const CHANNEL: &str = "events";

/// Called with `(element_id, event_type)` for every event, in arrival order.
pub type EventCallback = Arc<dyn Fn(&str, &str) -> anyhow::Result<()> + Send + Sync>;

pub struct EventChannel {
    slot: PeerSlot,
    callback: RwLock<Option<EventCallback>>,
}

impl EventChannel {
    pub fn new(flags: Arc<ChannelFlags>) -> Self {
        Self {
            slot: PeerSlot::new(CHANNEL, flags),
            callback: RwLock::new(None),
        }
    }

    /// Replace the callback. Events that arrive with none registered are dropped.
    pub fn register<F>(&self, callback: F)
    where
        F: Fn(&str, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        *self
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    fn dispatch(&self, event: UiEvent) {
        let callback = self
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => {
                run_callback(CHANNEL, || callback(&event.element_id, &event.event_type))
            }
            None => {
                if self.slot.verbose() {
                    debug!(channel = CHANNEL, element = %event.element_id, "No callback registered");
                }
            }
        }
    }

    pub async fn serve(&self, socket: WebSocket) -> Result<()> {
        let (sink, stream) = socket.split();
        self.serve_io(sink, stream).await
    }

    pub async fn serve_io<S, R, E>(&self, sink: S, stream: R) -> Result<()>
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
        R: Stream<Item = std::result::Result<Message, E>> + Unpin,
        E: Display,
    {
        serve_connection(&self.slot, sink, stream, |text| {
            if self.slot.verbose() {
                debug!(channel = CHANNEL, raw = text, "Event received");
            }
            self.dispatch(decode(CHANNEL, text)?);
            Ok(())
        })
        .await
    }
}
