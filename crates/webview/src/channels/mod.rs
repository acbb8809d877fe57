//! Channel managers, one per capability.
//!
//! - `view` pushes HTML snapshots
//! - `playback` queues audio clips and correlates completion reports
//! - `capture` starts/stops the microphone and converts what comes back
//! - `events` forwards UI interaction events to a callback
//!
//! Every manager binds at most one peer at a time (see [`PeerSlot`]).
//! A manager's connection loop is the error boundary for its peer: failures
//! end that connection and nothing else.

mod capture;
mod correlation;
mod events;
mod peer;
mod playback;
mod view;

pub use capture::{AudioProcessor, CaptureChannel};
pub use correlation::{CorrelationRegistry, PendingPlayback};
pub use events::{EventCallback, EventChannel};
pub use peer::{serve_connection, Binding, ChannelFlags, PeerSlot};
pub use playback::PlaybackChannel;
pub use view::ViewChannel;

use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Run a user callback, logging instead of propagating its failure.
///
/// Covers both returned errors and panics so a misbehaving callback can't
/// take its connection loop down.
pub(crate) fn run_callback<F>(channel: &'static str, callback: F)
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(channel, error = %e, "Callback failed"),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(channel, panic = %message, "Callback panicked");
        }
    }
}
