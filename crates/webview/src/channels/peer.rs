//! Peer binding and the per-connection loop shared by every channel.
//!
//! Each channel manager owns one `PeerSlot`. Accepting a connection binds
//! it (replacing and cancelling whatever was bound before), the loop runs
//! until the socket closes, and the slot is released on the way out no
//! matter how the loop ended.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::error::{ChannelError, Result};

/// Settings shared by all channel managers, mutable at runtime.
#[derive(Debug, Default)]
pub struct ChannelFlags {
    debug: AtomicBool,
}

impl ChannelFlags {
    pub fn new(debug: bool) -> Arc<Self> {
        Arc::new(Self {
            debug: AtomicBool::new(debug),
        })
    }

    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }
}

/// The currently bound connection.
struct Peer {
    id: Uuid,
    // None for connections that write their own frames.
    outbound: Option<mpsc::UnboundedSender<Message>>,
    cancel: CancellationToken,
}

/// What a connection loop gets back from [`PeerSlot::bind`].
pub struct Binding {
    pub id: Uuid,
    /// Frames queued by [`PeerSlot::send`] for this connection.
    pub outbound: mpsc::UnboundedReceiver<Message>,
    /// Fires when a newer connection takes the slot.
    pub cancel: CancellationToken,
}

/// Holds zero or one bound peer for a channel.
pub struct PeerSlot {
    channel: &'static str,
    flags: Arc<ChannelFlags>,
    current: Mutex<Option<Peer>>,
}

impl PeerSlot {
    pub fn new(channel: &'static str, flags: Arc<ChannelFlags>) -> Self {
        Self {
            channel,
            flags,
            current: Mutex::new(None),
        }
    }

    pub fn channel(&self) -> &'static str {
        self.channel
    }

    /// Whether debug-only logging is on.
    pub fn verbose(&self) -> bool {
        self.flags.debug()
    }

    fn current(&self) -> MutexGuard<'_, Option<Peer>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind a new connection. Last bind wins: the previous peer, if any, is
    /// dropped from the slot and its loop is told to stop.
    pub fn bind(&self) -> Binding {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (id, cancel) = self.attach(Some(outbound_tx));
        Binding {
            id,
            outbound: outbound_rx,
            cancel,
        }
    }

    /// Bind a connection that writes to its socket directly.
    ///
    /// Same displacement rules as [`Self::bind`], but there is no outbound
    /// queue: [`Self::send`] returns false while this peer holds the slot.
    pub fn bind_unqueued(&self) -> (Uuid, CancellationToken) {
        self.attach(None)
    }

    fn attach(&self, outbound: Option<mpsc::UnboundedSender<Message>>) -> (Uuid, CancellationToken) {
        let cancel = CancellationToken::new();
        let id = Uuid::new_v4();

        let displaced = self.current().replace(Peer {
            id,
            outbound,
            cancel: cancel.clone(),
        });

        if let Some(old) = displaced {
            old.cancel.cancel();
            if self.verbose() {
                info!(channel = self.channel, peer = %old.id, "Peer displaced by new connection");
            }
        }
        if self.verbose() {
            info!(channel = self.channel, peer = %id, "Peer connected");
        }
        (id, cancel)
    }

    /// Unbind `id` if it is still the bound peer.
    ///
    /// Returns false when a newer connection already replaced it.
    pub fn release(&self, id: Uuid) -> bool {
        let mut current = self.current();
        if current.as_ref().is_some_and(|peer| peer.id == id) {
            *current = None;
            drop(current);
            if self.verbose() {
                info!(channel = self.channel, peer = %id, "Peer disconnected");
            }
            true
        } else {
            false
        }
    }

    /// Queue a frame for the bound peer. False if nobody is bound or the
    /// peer was bound with [`Self::bind_unqueued`].
    pub fn send(&self, message: Message) -> bool {
        match self.current().as_ref().and_then(|peer| peer.outbound.as_ref()) {
            Some(outbound) => outbound.send(message).is_ok(),
            None => false,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.current().is_some()
    }
}

/// Bind a connection and run it until it ends.
///
/// Outbound frames queued through the slot are written to `sink`; every
/// inbound text frame goes to `on_text` in arrival order. An error from
/// `on_text` ends the connection. Binary, ping and pong frames are ignored.
pub async fn serve_connection<S, R, E, H>(
    slot: &PeerSlot,
    mut sink: S,
    mut stream: R,
    mut on_text: H,
) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = std::result::Result<Message, E>> + Unpin,
    E: Display,
    H: FnMut(&str) -> Result<()>,
{
    let Binding {
        id,
        mut outbound,
        cancel,
    } = slot.bind();
    let channel = slot.channel();

    let result = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break Ok(()),

            Some(message) = outbound.recv() => {
                if let Err(e) = sink.send(message).await {
                    break Err(ChannelError::transport(channel, e));
                }
            }

            inbound = stream.next() => match inbound {
                None | Some(Ok(Message::Close(_))) => break Ok(()),
                Some(Err(e)) => break Err(ChannelError::transport(channel, e)),
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = on_text(text.as_str()) {
                        break Err(e);
                    }
                }
                Some(Ok(_)) => {}
            },
        }
    };

    slot.release(id);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> PeerSlot {
        PeerSlot::new("test", ChannelFlags::new(false))
    }

    #[test]
    fn test_send_without_peer() {
        let slot = slot();
        assert!(!slot.is_bound());
        assert!(!slot.send(Message::Text("hello".into())));
    }

    #[test]
    fn test_bind_then_send() {
        let slot = slot();
        let mut binding = slot.bind();
        assert!(slot.is_bound());
        assert!(slot.send(Message::Text("hello".into())));

        match binding.outbound.try_recv() {
            Ok(Message::Text(text)) => assert_eq!(text.as_str(), "hello"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_last_bind_wins() {
        let slot = slot();
        let first = slot.bind();
        let mut second = slot.bind();

        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());

        assert!(slot.send(Message::Text("to second".into())));
        assert!(second.outbound.try_recv().is_ok());
    }

    #[test]
    fn test_stale_release_keeps_newer_peer() {
        let slot = slot();
        let first = slot.bind();
        let second = slot.bind();

        assert!(!slot.release(first.id));
        assert!(slot.is_bound());

        assert!(slot.release(second.id));
        assert!(!slot.is_bound());
    }

    #[test]
    fn test_unqueued_peer_refuses_send() {
        let slot = slot();
        let (id, cancel) = slot.bind_unqueued();
        assert!(slot.is_bound());
        assert!(!slot.send(Message::Text("nowhere".into())));

        let mut queued = slot.bind();
        assert!(cancel.is_cancelled());
        assert!(slot.send(Message::Text("queued".into())));
        assert!(queued.outbound.try_recv().is_ok());
        assert!(!slot.release(id));
    }

    #[test]
    fn test_flags_toggle() {
        let flags = ChannelFlags::new(false);
        let slot = PeerSlot::new("test", flags.clone());
        assert!(!slot.verbose());
        flags.set_debug(true);
        assert!(slot.verbose());
    }
}
