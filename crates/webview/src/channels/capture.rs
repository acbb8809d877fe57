//! Microphone capture.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{Sink, Stream, StreamExt};
use tracing::{debug, warn};

use super::peer::{serve_connection, ChannelFlags, PeerSlot};
use super::run_callback;
use crate::error::Result;
use crate::pcm::to_pcm16_le;
use crate::protocol::{decode, to_frame, RecorderCommand, RecorderReport};

const CHANNEL: &str = "capture";

/// Receives each captured block as 16-bit little-endian mono PCM.
pub type AudioProcessor = Arc<dyn Fn(Bytes) -> anyhow::Result<()> + Send + Sync>;

pub struct CaptureChannel {
    slot: PeerSlot,
    recording: AtomicBool,
    // Kept after stop; replaced on the next start.
    processor: RwLock<Option<AudioProcessor>>,
}

impl CaptureChannel {
    pub fn new(flags: Arc<ChannelFlags>) -> Self {
        Self {
            slot: PeerSlot::new(CHANNEL, flags),
            recording: AtomicBool::new(false),
            processor: RwLock::new(None),
        }
    }

    /// Install `processor` and ask the recorder to start.
    ///
    /// The processor is installed even when no peer is bound, but recording
    /// only turns on if the start command went out.
    pub fn start<F>(&self, processor: F) -> bool
    where
        F: Fn(Bytes) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        *self
            .processor
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(processor));

        let sent = self.command(RecorderCommand::StartRecording);
        if sent {
            self.recording.store(true, Ordering::SeqCst);
        }
        sent
    }

    /// Ask the recorder to stop. Recording only turns off if the command went out.
    pub fn stop(&self) -> bool {
        let sent = self.command(RecorderCommand::StopRecording);
        if sent {
            self.recording.store(false, Ordering::SeqCst);
        }
        sent
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    fn command(&self, command: RecorderCommand) -> bool {
        let frame = match to_frame(&command) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(channel = CHANNEL, error = %e, "Failed to encode recorder command");
                return false;
            }
        };
        let sent = self.slot.send(frame);
        if self.slot.verbose() {
            debug!(channel = CHANNEL, ?command, sent, "Recorder command");
        }
        sent
    }

    fn on_samples(&self, samples: &[f32]) {
        if !self.is_recording() {
            if self.slot.verbose() {
                debug!(channel = CHANNEL, samples = samples.len(), "Not recording, block dropped");
            }
            return;
        }
        let processor = self
            .processor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(processor) = processor {
            let pcm = to_pcm16_le(samples);
            run_callback(CHANNEL, || processor(pcm));
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
            let report: RecorderReport = decode(CHANNEL, text)?;
            if let RecorderReport::AudioData { data } = report {
                self.on_samples(&data);
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_without_peer() {
        let capture = CaptureChannel::new(ChannelFlags::new(false));
        assert!(!capture.start(|_| Ok(())));
        assert!(!capture.is_recording());
        assert!(!capture.stop());
    }
}
