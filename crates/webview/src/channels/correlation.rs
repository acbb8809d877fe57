//! Pending-playback bookkeeping.
//!
//! Entries are keyed by the uuid handed out at enqueue time and only leave
//! the registry when the player acknowledges them. A waiter that gives up on
//! timeout leaves its entry behind, so a late acknowledgement still clears it.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{ChannelError, Result};

/// One clip the player has not acknowledged yet.
#[derive(Debug)]
pub struct PendingPlayback {
    pub delay: f64,
    pub enqueued_at: Instant,
    waiter: Option<oneshot::Sender<()>>,
}

#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    pending: DashMap<Uuid, PendingPlayback>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` pending. The receiver resolves when the player acknowledges it.
    pub fn register(&self, id: Uuid, delay: f64) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            id,
            PendingPlayback {
                delay,
                enqueued_at: Instant::now(),
                waiter: Some(tx),
            },
        );
        rx
    }

    /// Resolve an acknowledgement from the player.
    ///
    /// Returns the id and how long the entry was pending. An id that does not
    /// parse or is not pending is a protocol error.
    pub fn complete(&self, raw_id: &str) -> Result<(Uuid, Duration)> {
        let unknown = || ChannelError::UnknownCorrelation {
            id: raw_id.to_string(),
        };
        let id = Uuid::parse_str(raw_id).map_err(|_| unknown())?;
        let (_, mut entry) = self.pending.remove(&id).ok_or_else(unknown)?;

        // The waiter may already have timed out and dropped its receiver.
        if let Some(waiter) = entry.waiter.take() {
            let _ = waiter.send(());
        }
        Ok((id, entry.enqueued_at.elapsed()))
    }

    pub fn is_pending(&self, id: &Uuid) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_wakes_waiter() {
        let registry = CorrelationRegistry::new();
        let id = Uuid::new_v4();
        let mut rx = registry.register(id, 0.5);
        assert!(registry.is_pending(&id));

        let (done, _) = registry.complete(&id.to_string()).unwrap();
        assert_eq!(done, id);
        assert!(!registry.is_pending(&id));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_complete_after_waiter_gave_up() {
        let registry = CorrelationRegistry::new();
        let id = Uuid::new_v4();
        drop(registry.register(id, 0.0));

        assert!(registry.complete(&id.to_string()).is_ok());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_id_leaves_others_alone() {
        let registry = CorrelationRegistry::new();
        let id = Uuid::new_v4();
        let _rx = registry.register(id, 0.0);

        let err = registry.complete(&Uuid::new_v4().to_string()).unwrap_err();
        assert!(matches!(err, ChannelError::UnknownCorrelation { .. }));
        let err = registry.complete("not-a-uuid").unwrap_err();
        assert!(matches!(err, ChannelError::UnknownCorrelation { .. }));

        assert!(registry.is_pending(&id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_double_completion_is_unknown() {
        let registry = CorrelationRegistry::new();
        let id = Uuid::new_v4();
        let _rx = registry.register(id, 0.0);

        registry.complete(&id.to_string()).unwrap();
        assert!(registry.complete(&id.to_string()).is_err());
    }
}
