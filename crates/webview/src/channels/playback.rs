//! Audio playback with completion tracking.
//!
//! Clips go into one FIFO queue that outlives any single connection. The
//! bound connection drains it one clip at a time: send, then wait for that
//! clip's `playback_complete` before sending the next.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::correlation::CorrelationRegistry;
use super::peer::{ChannelFlags, PeerSlot};
use crate::clip::AudioClip;
use crate::error::{ChannelError, Result};
use crate::protocol::{decode, to_frame, PlayerCommand, PlayerReport};

const CHANNEL: &str = "playback";

struct QueuedClip {
    id: Uuid,
    clip: AudioClip,
    delay: f64,
}

pub struct PlaybackChannel {
    slot: PeerSlot,
    registry: CorrelationRegistry,
    queue_tx: mpsc::UnboundedSender<QueuedClip>,
    // Held by whichever connection is delivering.
    queue_rx: Mutex<mpsc::UnboundedReceiver<QueuedClip>>,
}

impl PlaybackChannel {
    pub fn new(flags: Arc<ChannelFlags>) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            slot: PeerSlot::new(CHANNEL, flags),
            registry: CorrelationRegistry::new(),
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
        }
    }

    /// Queue `clip` and wait until the player acknowledges it or `timeout`
    /// elapses, whichever comes first.
    ///
    /// The returned id is the same either way; use [`Self::is_pending`] to
    /// tell an acknowledged clip from one that timed out. With no peer bound
    /// nothing is queued and the call just sleeps for `timeout`.
    pub async fn enqueue_and_wait(&self, clip: AudioClip, delay: f64, timeout: Duration) -> Uuid {
        let id = Uuid::new_v4();

        if !self.slot.is_bound() {
            if self.slot.verbose() {
                debug!(channel = CHANNEL, %id, "No peer bound, clip not delivered");
            }
            tokio::time::sleep(timeout).await;
            return id;
        }

        // Register before queueing so a fast acknowledgement always finds it.
        let acknowledged = self.registry.register(id, delay);
        let _ = self.queue_tx.send(QueuedClip { id, clip, delay });

        match tokio::time::timeout(timeout, acknowledged).await {
            Ok(Ok(())) => {
                if self.slot.verbose() {
                    debug!(channel = CHANNEL, %id, "Playback acknowledged");
                }
            }
            Ok(Err(_)) => {
                debug!(channel = CHANNEL, %id, "Pending entry dropped without acknowledgement");
            }
            Err(_) => {
                if self.slot.verbose() {
                    info!(channel = CHANNEL, %id, ?timeout, "Playback wait timed out");
                }
            }
        }
        id
    }

    /// Whether `id` is still waiting for its acknowledgement.
    pub fn is_pending(&self, id: &Uuid) -> bool {
        self.registry.is_pending(id)
    }

    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    pub async fn serve(&self, socket: WebSocket) -> Result<()> {
        let (sink, stream) = socket.split();
        self.serve_io(sink, stream).await
    }

    /// Bind a player connection and deliver queued clips to it until it
    /// closes, is displaced, or breaks protocol.
    ///
    /// Frames go straight to `sink` from the clip queue, so the slot is
    /// bound without an outbound queue.
    pub async fn serve_io<S, R, E>(&self, sink: S, stream: R) -> Result<()>
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
        R: Stream<Item = std::result::Result<Message, E>> + Unpin,
        E: Display,
    {
        let (id, cancel) = self.slot.bind_unqueued();
        let result = self.deliver(sink, stream, &cancel).await;
        self.slot.release(id);
        result
    }

    async fn deliver<S, R, E>(
        &self,
        mut sink: S,
        mut stream: R,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
        R: Stream<Item = std::result::Result<Message, E>> + Unpin,
        E: Display,
    {
        // A displaced connection lets go of the queue once it sees its cancel.
        let mut queue = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            queue = self.queue_rx.lock() => queue,
        };
        let mut in_flight: Option<Uuid> = None;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Ok(()),

                inbound = stream.next() => match inbound {
                    None | Some(Ok(Message::Close(_))) => return Ok(()),
                    Some(Err(e)) => return Err(ChannelError::transport(CHANNEL, e)),
                    Some(Ok(Message::Text(text))) => {
                        let report: PlayerReport = decode(CHANNEL, text.as_str())?;
                        if let PlayerReport::PlaybackComplete { id } = report {
                            let (id, waited) = self.registry.complete(&id)?;
                            if in_flight == Some(id) {
                                in_flight = None;
                            }
                            if self.slot.verbose() {
                                debug!(channel = CHANNEL, %id, ?waited, "Playback complete");
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                },

                Some(next) = queue.recv(), if in_flight.is_none() => {
                    let command = PlayerCommand::Audio {
                        id: next.id,
                        data: next.clip,
                        delay: next.delay,
                    };
                    let frame = to_frame(&command).map_err(|e| ChannelError::transport(CHANNEL, e))?;
                    sink.send(frame)
                        .await
                        .map_err(|e| ChannelError::transport(CHANNEL, e))?;
                    if self.slot.verbose() {
                        debug!(channel = CHANNEL, id = %next.id, delay = next.delay, "Clip sent");
                    }
                    in_flight = Some(next.id);
                }
            }
        }
    }
}
