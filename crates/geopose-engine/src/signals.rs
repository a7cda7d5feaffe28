//! Per-frame replay-last signals.
//!
//! Every frame name with at least one active stream subscriber owns a tick
//! latch.  A latch stores only the latest tick, so a burst of updates may
//! coalesce into a single wake-up; subscribers re-read the live forest on
//! every tick, which makes the latest state win regardless of coalescing.
//!
//! Latches are created on first subscription, complete (by dropping the
//! sender) when their frame is removed, and are garbage-collected on the next
//! notification after their last subscriber is gone.  A latch subscribed for
//! a frame that never comes into existence stays idle until that frame is
//! created or the subscriber gives up.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;

#[derive(Debug, Default)]
pub(crate) struct SignalRegistry {
    latches: Mutex<HashMap<String, watch::Sender<u64>>>,
}

impl SignalRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the latch for a frame name, creating it if needed.
    pub(crate) fn subscribe(&self, name: &str) -> watch::Receiver<u64> {
        let mut latches = self.latches.lock().expect("signal registry poisoned");
        latches
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    /// Ticks the latch for a frame name, if anyone is listening.
    pub(crate) fn notify(&self, name: &str) {
        let mut latches = self.latches.lock().expect("signal registry poisoned");
        if let Some(latch) = latches.get(name) {
            if latch.is_closed() {
                latches.remove(name);
            } else {
                latch.send_modify(|tick| *tick += 1);
            }
        }
    }

    /// Completes the latch for a removed frame, ending every subscriber's
    /// stream.
    pub(crate) fn complete(&self, name: &str) {
        let mut latches = self.latches.lock().expect("signal registry poisoned");
        latches.remove(name);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.latches.lock().unwrap().len()
    }
}
