//! Change tracking for the frame forest.
//!
//! Wraps a [`CowFrameTree`] so that every mutation publishes [`Change`]
//! events on a broadcast channel.  A create or a transform replacement emits
//! one [`Change::Created`] for each affected frame in pre-order, which is how
//! downstream derivations learn that previously unmoved descendants now have
//! new absolute placements.  A removal emits a single [`Change::Removed`].
//!
//! Subscription is replay-seeded: under the same lock that mutations hold,
//! the forest is snapshotted and a `Created` event is synthesized for every
//! frame in pre-order before live events are appended, so a subscriber sees
//! "enumerate the world, then follow it" with nothing lost or duplicated.

use std::sync::Mutex;

use futures_util::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use geopose_types::PoseError;

use crate::tree::{CowFrameTree, Frame, FrameTransform};

/// Number of buffered change events per subscriber before the oldest are
/// dropped.
const DEFAULT_CAPACITY: usize = 1024;

/// A mutation of the frame forest.
///
/// `Created` is emitted for creations and for transform replacements alike;
/// consumers that cache frame handles can compare generations to tell the
/// difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Change {
    /// A frame came into existence or received a new record identity.
    Created(Frame),
    /// A frame was removed.
    Removed(String),
}

/// A frame forest that reports every mutation on a change bus.
#[derive(Debug)]
pub struct ChangeTrackingTree {
    delegate: CowFrameTree,
    monitor: Mutex<()>,
    sender: broadcast::Sender<Change>,
}

impl ChangeTrackingTree {
    /// Wraps a forest with the default subscriber buffer.
    pub fn new(delegate: CowFrameTree) -> Self {
        Self::with_capacity(delegate, DEFAULT_CAPACITY)
    }

    /// Wraps a forest with a given per-subscriber buffer capacity.
    pub fn with_capacity(delegate: CowFrameTree, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        ChangeTrackingTree {
            delegate,
            monitor: Mutex::new(()),
            sender,
        }
    }

    /// The wrapped forest, for retrieval operations.
    pub fn delegate(&self) -> &CowFrameTree {
        &self.delegate
    }

    /// See [`CowFrameTree::create_root`].  Returns the emitted changes.
    pub fn create_root(&self, name: &str) -> Result<Vec<Change>, PoseError> {
        let _guard = self.monitor.lock().expect("change monitor poisoned");
        let affected = self.delegate.create_root(name)?;
        Ok(self.emit_created(affected))
    }

    /// See [`CowFrameTree::create`].  Returns the emitted changes.
    pub fn create(
        &self,
        parent: &str,
        name: &str,
        transform: FrameTransform,
    ) -> Result<Vec<Change>, PoseError> {
        let _guard = self.monitor.lock().expect("change monitor poisoned");
        let affected = self.delegate.create(parent, name, transform)?;
        Ok(self.emit_created(affected))
    }

    /// See [`CowFrameTree::remove`].  Returns the emitted changes.
    pub fn remove(&self, name: &str) -> Result<Vec<Change>, PoseError> {
        let _guard = self.monitor.lock().expect("change monitor poisoned");
        let changes = match self.delegate.remove(name)? {
            Some(removed) => vec![Change::Removed(removed)],
            None => Vec::new(),
        };
        for change in &changes {
            let _ = self.sender.send(change.clone());
        }
        Ok(changes)
    }

    fn emit_created(&self, affected: Vec<std::sync::Arc<Frame>>) -> Vec<Change> {
        let changes: Vec<Change> = affected
            .iter()
            .map(|frame| Change::Created(frame.as_ref().clone()))
            .collect();
        for change in &changes {
            // No receivers is fine: late subscribers are seeded from the
            // snapshot instead.
            let _ = self.sender.send(change.clone());
        }
        changes
    }

    /// A stream of every mutation, seeded with a synthesized `Created` for
    /// each frame currently in the forest, pre-order.
    ///
    /// Backpressure policy: each subscriber owns a bounded buffer and the
    /// oldest events are dropped if it falls behind.  A lagged subscriber is
    /// reported through `tracing` and keeps receiving from wherever the
    /// buffer resumes; consumers that cannot tolerate gaps should re-seed by
    /// subscribing again.
    pub fn change_stream(&self) -> impl Stream<Item = Change> + Send + 'static {
        let (seed, receiver) = {
            let _guard = self.monitor.lock().expect("change monitor poisoned");
            let seed: Vec<Change> = self
                .delegate
                .traverse()
                .map(|frame| Change::Created(frame.as_ref().clone()))
                .collect();
            (seed, self.sender.subscribe())
        };
        stream::iter(seed).chain(stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => return Some((change, receiver)),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "change stream subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }
}
