//! Copy-on-write frame forest.
//!
//! The live forest is an atomic pointer to an immutable [`TreeState`] plus a
//! lock that serializes writers.  Retrieval operations never block: they load
//! the current snapshot once and run entirely on that captured state, so a
//! traversal started before a concurrent write observes the pre-write forest
//! in full.  An update operation bears a happens-before relation with any
//! retrieval that reports its effect; publishing the snapshot pointer is the
//! release/acquire edge.
//!
//! Writers rebuild only the affected subtree.  Every rebuilt record gets a
//! fresh generation so that downstream code holding a [`Frame`] handle can
//! detect staleness; untouched subtrees keep their records by identity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use geopose_types::{PoseError, Transform};

// ────────────────────────────────────────────────────────────────────────────
// Frame records
// ────────────────────────────────────────────────────────────────────────────

/// The rigid relation of a frame to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FrameTransform {
    /// The transform from the parent frame into this frame.
    Known(Transform),
    /// Placeholder installed on a root of subgraph before it is geolocated.
    /// Distinct from the identity: any query that needs this edge is
    /// unanswerable.
    Unknown,
}

impl FrameTransform {
    /// The concrete transform, if there is one.
    pub fn known(&self) -> Option<&Transform> {
        match self {
            FrameTransform::Known(xfrm) => Some(xfrm),
            FrameTransform::Unknown => None,
        }
    }

    /// Whether this is the ungeolocated placeholder.
    pub fn is_unknown(&self) -> bool {
        matches!(self, FrameTransform::Unknown)
    }
}

/// A named frame in the forest.
///
/// Records are immutable; a write that touches a frame replaces the record
/// with one carrying a higher generation.  Two records with the same name and
/// generation describe the same forest state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    name: String,
    parent: Option<String>,
    transform: FrameTransform,
    generation: u64,
}

impl Frame {
    /// The globally unique frame name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parent frame name, or `None` for the body frame.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// The relation of this frame to its parent.
    pub fn transform(&self) -> &FrameTransform {
        &self.transform
    }

    /// Identity tag: bumped whenever a write re-creates this record.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this is the reserved body frame at the base of the forest.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Immutable snapshots
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) struct TreeState {
    root: String,
    frames: HashMap<String, Arc<Frame>>,
    children: HashMap<String, Vec<String>>,
}

impl TreeState {
    fn new(root: &str) -> Self {
        let record = Arc::new(Frame {
            name: root.to_string(),
            parent: None,
            transform: FrameTransform::Known(Transform::IDENTITY),
            generation: 0,
        });
        let mut frames = HashMap::new();
        frames.insert(root.to_string(), record);
        let mut children = HashMap::new();
        children.insert(root.to_string(), Vec::new());
        TreeState {
            root: root.to_string(),
            frames,
            children,
        }
    }

    pub(crate) fn root_name(&self) -> &str {
        &self.root
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Arc<Frame>> {
        self.frames.get(name)
    }

    fn children_of(&self, name: &str) -> &[String] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of the subtree rooted at `from`, depth-first pre-order.
    fn preorder(&self, from: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut stack = vec![from.to_string()];
        while let Some(name) = stack.pop() {
            for child in self.children_of(&name).iter().rev() {
                stack.push(child.clone());
            }
            names.push(name);
        }
        names
    }

    /// The first ancestor of `name` that is attached to the body frame, or
    /// `None` for an unknown name and for the body frame itself.
    pub(crate) fn find_root(&self, name: &str) -> Option<&Arc<Frame>> {
        let mut frame = self.frames.get(name)?;
        loop {
            let parent = frame.parent()?;
            if parent == self.root {
                return Some(frame);
            }
            frame = self.frames.get(parent)?;
        }
    }

    /// The chain of frames from `name` up to and including the body frame.
    fn ancestry(&self, name: &str) -> Option<Vec<&Arc<Frame>>> {
        let mut chain = vec![self.frames.get(name)?];
        while let Some(parent) = chain.last().expect("chain is never empty").parent() {
            chain.push(self.frames.get(parent)?);
        }
        Some(chain)
    }

    /// Composes the stored parent-to-child transforms along a top-down leg.
    fn compose_down(frames: &[&Arc<Frame>]) -> Result<Transform, PoseError> {
        let mut acc = Transform::IDENTITY;
        for frame in frames {
            match frame.transform() {
                FrameTransform::Known(xfrm) => acc = acc.and_then(xfrm),
                FrameTransform::Unknown => return Err(PoseError::UnknownTransform),
            }
        }
        Ok(acc)
    }

    /// The transform that maps coordinates in `src` into `dst`.
    ///
    /// Walks both frames toward their least common ancestor and composes the
    /// two legs, so queries inside one subgraph never touch the (possibly
    /// unknown) placement of the subgraph root.  Fails with
    /// [`PoseError::UnknownTransform`] when the path crosses an ungeolocated
    /// edge and with [`PoseError::InvalidArgument`] when either frame is
    /// missing.
    pub(crate) fn transform_between(&self, src: &str, dst: &str) -> Result<Transform, PoseError> {
        let src_down: Vec<_> = self
            .ancestry(src)
            .ok_or_else(|| PoseError::InvalidArgument(format!("frame {src} is not defined")))?
            .into_iter()
            .rev()
            .collect();
        let dst_down: Vec<_> = self
            .ancestry(dst)
            .ok_or_else(|| PoseError::InvalidArgument(format!("frame {dst} is not defined")))?
            .into_iter()
            .rev()
            .collect();

        let mut common = 0;
        while common < src_down.len()
            && common < dst_down.len()
            && Arc::ptr_eq(src_down[common], dst_down[common])
        {
            common += 1;
        }

        let lca_to_src = Self::compose_down(&src_down[common..])?;
        let lca_to_dst = Self::compose_down(&dst_down[common..])?;
        Ok(lca_to_src.inverse().and_then(&lca_to_dst))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Traversal
// ────────────────────────────────────────────────────────────────────────────

/// A lazy depth-first pre-order walk over one forest snapshot.
///
/// The walk is immune to concurrent writes; clone it to restart from the
/// beginning of the remaining sequence.
#[derive(Debug, Clone)]
pub struct Traversal {
    state: Arc<TreeState>,
    stack: Vec<String>,
}

impl Traversal {
    fn new(state: Arc<TreeState>, start: &str) -> Self {
        let stack = if state.frames.contains_key(start) {
            vec![start.to_string()]
        } else {
            Vec::new()
        };
        Traversal { state, stack }
    }

    fn empty(state: Arc<TreeState>) -> Self {
        Traversal {
            state,
            stack: Vec::new(),
        }
    }
}

impl Iterator for Traversal {
    type Item = Arc<Frame>;

    fn next(&mut self) -> Option<Arc<Frame>> {
        let name = self.stack.pop()?;
        let frame = self.state.frames.get(&name)?.clone();
        for child in self.state.children_of(&name).iter().rev() {
            self.stack.push(child.clone());
        }
        Some(frame)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// The live forest
// ────────────────────────────────────────────────────────────────────────────

/// A concurrently readable, copy-on-write tree of frames.
///
/// Retrievals do not block and reflect the most recently completed update
/// holding at their onset.  Updates are serialized by a forest-wide lock.
#[derive(Debug)]
pub struct CowFrameTree {
    state: RwLock<Arc<TreeState>>,
    write_lock: Mutex<()>,
    generation: AtomicU64,
}

impl CowFrameTree {
    /// Creates a forest containing only the given body frame.
    pub fn new(root: &str) -> Self {
        CowFrameTree {
            state: RwLock::new(Arc::new(TreeState::new(root))),
            write_lock: Mutex::new(()),
            generation: AtomicU64::new(1),
        }
    }

    /// The name of the body frame at the base of the forest.
    pub fn root_name(&self) -> String {
        self.snapshot().root.clone()
    }

    pub(crate) fn snapshot(&self) -> Arc<TreeState> {
        self.state.read().expect("forest state poisoned").clone()
    }

    fn install(&self, state: TreeState) {
        *self.state.write().expect("forest state poisoned") = Arc::new(state);
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Gets the current record for a frame name.
    pub fn get(&self, name: &str) -> Option<Arc<Frame>> {
        self.snapshot().frames.get(name).cloned()
    }

    /// Depth-first pre-order walk over the whole forest.
    pub fn traverse(&self) -> Traversal {
        let state = self.snapshot();
        let root = state.root.clone();
        Traversal::new(state, &root)
    }

    /// Depth-first pre-order walk from a given frame; empty for an unknown
    /// name.
    pub fn traverse_from(&self, root: &str) -> Traversal {
        Traversal::new(self.snapshot(), root)
    }

    /// The root of the subgraph containing `name`: its first ancestor
    /// attached to the body frame.
    pub fn find_root(&self, name: &str) -> Option<Arc<Frame>> {
        self.snapshot().find_root(name).cloned()
    }

    /// Walks the subgraph containing `name`, starting from its root.
    pub fn subgraph(&self, name: &str) -> Traversal {
        let state = self.snapshot();
        match state.find_root(name) {
            Some(root) => {
                let start = root.name().to_string();
                Traversal::new(state, &start)
            }
            None => Traversal::empty(state),
        }
    }

    /// Creates a frame attached to the body frame with an unknown transform.
    ///
    /// Re-issuing `create_root` for an existing direct child of the body
    /// frame is a no-op; the name is rejected when it is taken by any other
    /// frame.  Returns the affected records, pre-order.
    pub fn create_root(&self, name: &str) -> Result<Vec<Arc<Frame>>, PoseError> {
        let _gate = self.write_lock.lock().expect("forest write lock poisoned");
        let state = self.snapshot();
        if name == state.root {
            return Err(PoseError::InvalidArgument(format!(
                "frame name {name} is reserved"
            )));
        }
        if let Some(existing) = state.frames.get(name) {
            if existing.parent() == Some(state.root.as_str()) {
                return Ok(Vec::new());
            }
            return Err(PoseError::InvalidArgument(format!(
                "frame {name} exists with a different parent"
            )));
        }
        let root = state.root.clone();
        Ok(vec![self.insert_new(
            &state,
            &root,
            name,
            FrameTransform::Unknown,
        )])
    }

    /// Creates a frame, or replaces the transform of an existing frame with
    /// the same parent.
    ///
    /// Replacing a transform gives the frame and every descendant a fresh
    /// record identity; descendants keep their own transforms.  Returns the
    /// affected records, pre-order.
    pub fn create(
        &self,
        parent: &str,
        name: &str,
        transform: FrameTransform,
    ) -> Result<Vec<Arc<Frame>>, PoseError> {
        let _gate = self.write_lock.lock().expect("forest write lock poisoned");
        let state = self.snapshot();
        if name == state.root {
            return Err(PoseError::InvalidArgument(format!(
                "frame name {name} is reserved"
            )));
        }
        if !state.frames.contains_key(parent) {
            return Err(PoseError::InvalidArgument(format!(
                "parent frame {parent} is not defined"
            )));
        }
        if transform.is_unknown() && parent != state.root {
            return Err(PoseError::InvalidArgument(
                "only direct children of the body frame may be ungeolocated".to_string(),
            ));
        }

        match state.frames.get(name) {
            Some(existing) => {
                if existing.parent() != Some(parent) {
                    return Err(PoseError::InvalidArgument(format!(
                        "frame {name} exists with a different parent"
                    )));
                }
                let mut frames = state.frames.clone();
                let mut affected = Vec::new();
                for node in state.preorder(name) {
                    let old = &state.frames[&node];
                    let record = Arc::new(Frame {
                        name: node.clone(),
                        parent: old.parent.clone(),
                        transform: if node == name { transform } else { old.transform },
                        generation: self.next_generation(),
                    });
                    frames.insert(node, record.clone());
                    affected.push(record);
                }
                self.install(TreeState {
                    root: state.root.clone(),
                    frames,
                    children: state.children.clone(),
                });
                Ok(affected)
            }
            None => Ok(vec![self.insert_new(&state, parent, name, transform)]),
        }
    }

    /// Removes a childless frame.  Removing an absent name is a no-op;
    /// removing a parent or the body frame is an error.  Returns the removed
    /// name, if any.
    pub fn remove(&self, name: &str) -> Result<Option<String>, PoseError> {
        let _gate = self.write_lock.lock().expect("forest write lock poisoned");
        let state = self.snapshot();
        let Some(frame) = state.frames.get(name) else {
            return Ok(None);
        };
        if frame.is_root() {
            return Err(PoseError::InvalidArgument(
                "unable to remove the body frame".to_string(),
            ));
        }
        if !state.children_of(name).is_empty() {
            return Err(PoseError::InvalidArgument(format!(
                "unable to remove {name}: it is a parent of other frames"
            )));
        }

        let mut frames = state.frames.clone();
        frames.remove(name);
        let mut children = state.children.clone();
        children.remove(name);
        if let Some(parent) = frame.parent() {
            if let Some(siblings) = children.get_mut(parent) {
                siblings.retain(|sibling| sibling != name);
            }
        }
        self.install(TreeState {
            root: state.root.clone(),
            frames,
            children,
        });
        Ok(Some(name.to_string()))
    }

    // Appends a brand-new leaf under `parent` and publishes the new state.
    // Caller holds the write lock and has validated the arguments.
    fn insert_new(
        &self,
        state: &TreeState,
        parent: &str,
        name: &str,
        transform: FrameTransform,
    ) -> Arc<Frame> {
        let record = Arc::new(Frame {
            name: name.to_string(),
            parent: Some(parent.to_string()),
            transform,
            generation: self.next_generation(),
        });
        let mut frames = state.frames.clone();
        frames.insert(name.to_string(), record.clone());
        let mut children = state.children.clone();
        children
            .entry(parent.to_string())
            .or_default()
            .push(name.to_string());
        children.insert(name.to_string(), Vec::new());
        self.install(TreeState {
            root: state.root.clone(),
            frames,
            children,
        });
        record
    }
}
