//! The pose engine facade.

use std::sync::Arc;

use futures_util::{future, stream, Stream, StreamExt};
use tracing::debug;

use geopose_geodesy::OneAxisEllipsoid;
use geopose_types::{GeodeticPose, Pose, PoseError, Transform};

use crate::bus::{Change, ChangeTrackingTree};
use crate::geodetic;
use crate::signals::SignalRegistry;
use crate::tree::{CowFrameTree, Frame, FrameTransform, Traversal};

/// A live forest of rigid frames anchored to a reference ellipsoid.
///
/// The engine is a cheaply cloneable handle; clones share the same forest,
/// change bus, and per-frame signals.  Any number of readers may query
/// concurrently with writers: queries run on an immutable snapshot and never
/// block, while mutations serialize on a forest-wide lock and are each their
/// own linearization point.
///
/// Queries return `None` when they are not answerable now, either because a
/// frame does not exist or because the connecting chain crosses an
/// ungeolocated subgraph root.  Mutations fail with
/// [`PoseError::InvalidArgument`] when a precondition on the arguments does
/// not hold.  The engine does not panic on bad input or geometric edge cases.
#[derive(Debug, Clone)]
pub struct PoseEngine {
    inner: Arc<EngineInner>,
}

#[derive(Debug)]
struct EngineInner {
    ellipsoid: OneAxisEllipsoid,
    tree: ChangeTrackingTree,
    signals: SignalRegistry,
}

impl PoseEngine {
    /// Creates an engine anchored to the given ellipsoid.  The forest starts
    /// with only the ellipsoid's body frame.
    pub fn new(ellipsoid: OneAxisEllipsoid) -> Self {
        let tree = ChangeTrackingTree::new(CowFrameTree::new(ellipsoid.body_frame()));
        PoseEngine {
            inner: Arc::new(EngineInner {
                ellipsoid,
                tree,
                signals: SignalRegistry::new(),
            }),
        }
    }

    /// The reference ellipsoid this engine is anchored to.
    pub fn ellipsoid(&self) -> &OneAxisEllipsoid {
        &self.inner.ellipsoid
    }

    /// The name of the reserved Earth-centered, Earth-fixed frame at the
    /// base of the forest.
    pub fn body_frame(&self) -> &str {
        self.inner.ellipsoid.body_frame()
    }

    // ── Mutations ───────────────────────────────────────────────────────────

    /// Creates a frame attached to the body frame, ungeolocated until the
    /// first [`PoseEngine::update`].
    ///
    /// A no-op when the name already exists as a direct child of the body
    /// frame; fails when the name is reserved or taken elsewhere.
    pub fn create_root(&self, name: &str) -> Result<(), PoseError> {
        let changes = self.inner.tree.create_root(name)?;
        self.settle(&changes);
        Ok(())
    }

    /// Creates a frame under a parent with a rigid offset, or replaces the
    /// offset of an existing frame with the same parent.
    ///
    /// Replacing an offset re-creates the frame and all of its descendants
    /// with fresh identities and notifies their subscribers.
    pub fn create(&self, parent: &str, name: &str, offset: &Pose) -> Result<(), PoseError> {
        self.create_with_transform(parent, name, Transform::from_pose(offset))
    }

    /// Like [`PoseEngine::create`], with the parent-to-child transform given
    /// directly.
    pub fn create_with_transform(
        &self,
        parent: &str,
        name: &str,
        xfrm: Transform,
    ) -> Result<(), PoseError> {
        let changes = self
            .inner
            .tree
            .create(parent, name, FrameTransform::Known(xfrm))?;
        self.settle(&changes);
        Ok(())
    }

    /// Removes a childless frame; a no-op for an absent name.
    pub fn remove(&self, name: &str) -> Result<(), PoseError> {
        let changes = self.inner.tree.remove(name)?;
        self.settle(&changes);
        Ok(())
    }

    /// Geolocates a frame: rewrites the placement of its subgraph root so
    /// that the named frame lands at the given geodetic pose.
    ///
    /// The subgraph stays rigid.  When the frame is itself attached to the
    /// body frame its placement is replaced outright; otherwise the new
    /// root placement is the geodetic placement composed with the existing
    /// frame-to-root transform, so the pose of every frame within the
    /// subgraph is untouched.
    pub fn update(&self, name: &str, geopose: &GeodeticPose) -> Result<(), PoseError> {
        let root = self.body_frame();
        let state = self.inner.tree.delegate().snapshot();
        let frame = state
            .get(name)
            .ok_or_else(|| PoseError::InvalidArgument(format!("frame {name} is not defined")))?;
        if frame.is_root() {
            return Err(PoseError::InvalidArgument(
                "cannot geolocate the body frame".to_string(),
            ));
        }

        let placement = geodetic::make_transform(&self.inner.ellipsoid, geopose);
        if frame.parent() == Some(root) {
            debug!(frame = name, "geolocating subgraph root");
            self.create_with_transform(root, name, placement)
        } else {
            let subgraph_root = state.find_root(name).ok_or_else(|| {
                PoseError::InvalidArgument(format!("frame {name} has no subgraph root"))
            })?;
            let frame_to_root = state.transform_between(name, subgraph_root.name())?;
            debug!(
                frame = name,
                root = subgraph_root.name(),
                "geolocating subgraph through interior frame"
            );
            self.create_with_transform(
                root,
                subgraph_root.name(),
                placement.and_then(&frame_to_root),
            )
        }
    }

    // Wakes the per-frame signals after a mutation's changes are on the bus.
    fn settle(&self, changes: &[Change]) {
        for change in changes {
            match change {
                Change::Created(frame) => self.inner.signals.notify(frame.name()),
                Change::Removed(name) => self.inner.signals.complete(name),
            }
        }
    }

    // ── Retrievals ──────────────────────────────────────────────────────────

    /// The current record for a frame name.
    pub fn get(&self, name: &str) -> Option<Arc<Frame>> {
        self.inner.tree.delegate().get(name)
    }

    /// Depth-first pre-order walk over the whole forest, on a snapshot.
    pub fn traverse(&self) -> Traversal {
        self.inner.tree.delegate().traverse()
    }

    /// Depth-first pre-order walk from a frame; empty for an unknown name.
    pub fn traverse_from(&self, root: &str) -> Traversal {
        self.inner.tree.delegate().traverse_from(root)
    }

    /// The root of the subgraph containing a frame.
    pub fn find_root(&self, name: &str) -> Option<Arc<Frame>> {
        self.inner.tree.delegate().find_root(name)
    }

    /// Walks the subgraph containing a frame, starting at its root.
    pub fn subgraph(&self, name: &str) -> Traversal {
        self.inner.tree.delegate().subgraph(name)
    }

    /// The geodetic pose of a local pose in a named frame.
    pub fn convert(&self, name: &str, pose: &Pose) -> Option<GeodeticPose> {
        let state = self.inner.tree.delegate().snapshot();
        geodetic::pose_to_geodetic(&self.inner.ellipsoid, &state, name, pose)
    }

    /// The local pose, in a named frame, of a geodetic pose.
    pub fn convert_geodetic(&self, name: &str, geopose: &GeodeticPose) -> Option<Pose> {
        let state = self.inner.tree.delegate().snapshot();
        geodetic::geodetic_to_pose(&self.inner.ellipsoid, &state, name, geopose)
    }

    /// The apparent pose in a destination frame of a pose given in a source
    /// frame.
    pub fn transform(&self, src: &str, dst: &str, pose: &Pose) -> Option<Pose> {
        let state = self.inner.tree.delegate().snapshot();
        geodetic::transform_pose(&state, src, dst, pose)
    }

    // ── Streams ─────────────────────────────────────────────────────────────

    /// A stream of [`PoseEngine::convert`] results for a frame: the current
    /// value immediately, then a re-evaluation whenever the frame or any of
    /// its ancestors moves.  Completes when the frame is removed.
    pub fn convert_stream(
        &self,
        name: &str,
        pose: Pose,
    ) -> impl Stream<Item = Option<GeodeticPose>> + Send + 'static {
        let engine = self.clone();
        let name = name.to_string();
        let ticks = self.inner.signals.subscribe(&name);
        let initial = engine.convert(&name, &pose);
        stream::once(future::ready(initial)).chain(stream::unfold(
            (ticks, engine, name, pose),
            |(mut ticks, engine, name, pose)| async move {
                if ticks.changed().await.is_err() {
                    return None;
                }
                let item = engine.convert(&name, &pose);
                Some((item, (ticks, engine, name, pose)))
            },
        ))
    }

    /// A stream of [`PoseEngine::convert_geodetic`] results for a frame,
    /// with the same emission and completion rules as
    /// [`PoseEngine::convert_stream`].
    pub fn convert_geodetic_stream(
        &self,
        name: &str,
        geopose: GeodeticPose,
    ) -> impl Stream<Item = Option<Pose>> + Send + 'static {
        let engine = self.clone();
        let name = name.to_string();
        let ticks = self.inner.signals.subscribe(&name);
        let initial = engine.convert_geodetic(&name, &geopose);
        stream::once(future::ready(initial)).chain(stream::unfold(
            (ticks, engine, name, geopose),
            |(mut ticks, engine, name, geopose)| async move {
                if ticks.changed().await.is_err() {
                    return None;
                }
                let item = engine.convert_geodetic(&name, &geopose);
                Some((item, (ticks, engine, name, geopose)))
            },
        ))
    }

    /// A stream of [`PoseEngine::transform`] results: the current value
    /// immediately, then a re-evaluation whenever either endpoint moves.
    ///
    /// The merge exits early: the stream completes as soon as either
    /// endpoint's frame is removed.
    pub fn transform_stream(
        &self,
        src: &str,
        dst: &str,
        pose: Pose,
    ) -> impl Stream<Item = Option<Pose>> + Send + 'static {
        let engine = self.clone();
        let src = src.to_string();
        let dst = dst.to_string();
        let src_ticks = self.inner.signals.subscribe(&src);
        let dst_ticks = self.inner.signals.subscribe(&dst);
        let initial = engine.transform(&src, &dst, &pose);
        stream::once(future::ready(initial)).chain(stream::unfold(
            (src_ticks, dst_ticks, engine, src, dst, pose),
            |(mut src_ticks, mut dst_ticks, engine, src, dst, pose)| async move {
                tokio::select! {
                    changed = src_ticks.changed() => {
                        if changed.is_err() {
                            return None;
                        }
                    }
                    changed = dst_ticks.changed() => {
                        if changed.is_err() {
                            return None;
                        }
                    }
                }
                let item = engine.transform(&src, &dst, &pose);
                Some((item, (src_ticks, dst_ticks, engine, src, dst, pose)))
            },
        ))
    }

    /// A stream of every forest mutation, seeded with a synthesized
    /// [`Change::Created`] for each existing frame in pre-order.  See
    /// [`ChangeTrackingTree::change_stream`] for the backpressure policy.
    pub fn change_stream(&self) -> impl Stream<Item = Change> + Send + 'static {
        self.inner.tree.change_stream()
    }
}
