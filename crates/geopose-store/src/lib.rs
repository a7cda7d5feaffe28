//! `geopose-store` – File-backed persistence for a frame forest.
//!
//! Saves the forest as a JSON listing of every non-root frame in depth-first
//! pre-order, so parents always precede their children and a load can replay
//! the file top to bottom through the [`PoseEngine`] facade.  Saving writes
//! to a `~` work file next to the target and renames it into place, so a
//! crash mid-save never clobbers the previous snapshot.
//!
//! Loading is forgiving: entries that fail to parse or violate a forest
//! precondition are reported through `tracing` and skipped, and the rest of
//! the file is still applied.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use geopose_engine::PoseEngine;
use geopose_types::Transform;

/// Failures of a save or load operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The save file could not be read or written.
    #[error("store i/o error: {0}")]
    Io(#[from] io::Error),

    /// The save file is not a JSON frame listing at all.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One persisted frame: its name, its parent, and its transform from the
/// parent.  An absent transform marks an ungeolocated subgraph root.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrameRecord {
    name: String,
    parent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform: Option<Transform>,
}

/// Saves and restores the frame forest of a [`PoseEngine`].
#[derive(Debug, Clone)]
pub struct ForestStore {
    path: PathBuf,
    work_path: PathBuf,
}

impl ForestStore {
    /// Creates a store backed by the given file.  The work file lives next
    /// to it with a `~` suffix.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut work = path.as_os_str().to_os_string();
        work.push("~");
        ForestStore {
            path,
            work_path: PathBuf::from(work),
        }
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the engine's current forest to the save file.
    pub fn save(&self, engine: &PoseEngine) -> Result<(), StoreError> {
        let records: Vec<FrameRecord> = engine
            .traverse()
            .filter(|frame| !frame.is_root())
            .map(|frame| FrameRecord {
                name: frame.name().to_string(),
                parent: frame
                    .parent()
                    .unwrap_or(engine.body_frame())
                    .to_string(),
                transform: frame.transform().known().copied(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&self.work_path, json)?;
        fs::rename(&self.work_path, &self.path)?;
        debug!(path = %self.path.display(), frames = records.len(), "forest saved");
        Ok(())
    }

    /// Replays the save file into the engine, returning how many frames were
    /// applied.  A missing save file is an empty forest, not an error.
    pub fn load(&self, engine: &PoseEngine) -> Result<usize, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no save file, starting empty");
                return Ok(0);
            }
            Err(err) => return Err(err.into()),
        };

        let entries: Vec<serde_json::Value> = serde_json::from_str(&data)?;
        let mut loaded = 0;
        for entry in entries {
            let record: FrameRecord = match serde_json::from_value(entry) {
                Ok(record) => record,
                Err(err) => {
                    warn!(%err, "unexpected entry in save file, skipping");
                    continue;
                }
            };
            let applied = match record.transform {
                Some(xfrm) => {
                    engine.create_with_transform(&record.parent, &record.name, xfrm)
                }
                None if record.parent == engine.body_frame() => {
                    engine.create_root(&record.name)
                }
                None => {
                    warn!(
                        frame = %record.name,
                        parent = %record.parent,
                        "frame without a transform is not a subgraph root, skipping"
                    );
                    continue;
                }
            };
            match applied {
                Ok(()) => loaded += 1,
                Err(err) => {
                    warn!(%err, frame = %record.name, "skipping frame from save file");
                }
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geopose_geodesy::OneAxisEllipsoid;
    use geopose_types::{GeodeticPoint, GeodeticPose, NauticalAngles, Pose, Vector3};

    fn engine() -> PoseEngine {
        PoseEngine::new(OneAxisEllipsoid::wgs84())
    }

    fn populated() -> PoseEngine {
        let engine = engine();
        engine.create_root("vehicle").unwrap();
        engine
            .create(
                "vehicle",
                "antenna",
                &Pose::new(Vector3::new(0.0, 0.0, -2.0), NauticalAngles::IDENTITY),
            )
            .unwrap();
        engine
            .create(
                "antenna",
                "feed",
                &Pose::new(Vector3::new(0.1, 0.0, 0.0), NauticalAngles::new(0.0, 0.3, 0.0)),
            )
            .unwrap();
        engine.create_root("island").unwrap();
        engine
            .update(
                "vehicle",
                &GeodeticPose::new(
                    GeodeticPoint::new(0.65, -2.02, 1360.0),
                    NauticalAngles::IDENTITY,
                ),
            )
            .unwrap();
        engine
    }

    #[test]
    fn save_and_load_roundtrip_preserves_the_forest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ForestStore::new(dir.path().join("forest.json"));

        let original = populated();
        store.save(&original).unwrap();

        let restored = engine();
        let loaded = store.load(&restored).unwrap();
        assert_eq!(loaded, 4);

        let original_frames: Vec<_> = original
            .traverse()
            .map(|f| (f.name().to_string(), f.transform().clone()))
            .collect();
        let restored_frames: Vec<_> = restored
            .traverse()
            .map(|f| (f.name().to_string(), f.transform().clone()))
            .collect();
        assert_eq!(original_frames, restored_frames);

        // The geolocated subgraph still answers conversions.
        let fix = restored.convert("antenna", &Pose::IDENTITY).unwrap();
        assert!(fix.position.altitude() > 1360.0);
        // The ungeolocated root is still ungeolocated.
        assert!(restored.convert("island", &Pose::IDENTITY).is_none());
    }

    #[test]
    fn loading_a_missing_file_is_an_empty_forest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ForestStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load(&engine()).unwrap(), 0);
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.json");
        fs::write(
            &path,
            r#"[
                {"name": "vehicle", "parent": "ECEF"},
                {"bogus": true},
                {"name": "orphan", "parent": "no-such-frame",
                 "transform": {"translation": {"x": 0.0, "y": 0.0, "z": 0.0},
                               "rotation": {"w": 1.0, "x": 0.0, "y": 0.0, "z": 0.0}}}
            ]"#,
        )
        .unwrap();

        let store = ForestStore::new(&path);
        let target = engine();
        assert_eq!(store.load(&target).unwrap(), 1);
        assert!(target.get("vehicle").is_some());
        assert!(target.get("orphan").is_none());
    }

    #[test]
    fn a_file_that_is_not_a_listing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.json");
        fs::write(&path, "not json at all").unwrap();
        let store = ForestStore::new(&path);
        assert!(matches!(
            store.load(&engine()).unwrap_err(),
            StoreError::Serialization(_)
        ));
    }

    #[test]
    fn save_replaces_the_previous_snapshot_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = ForestStore::new(dir.path().join("forest.json"));

        let first = populated();
        store.save(&first).unwrap();

        let second = engine();
        second.create_root("other").unwrap();
        store.save(&second).unwrap();

        let restored = engine();
        assert_eq!(store.load(&restored).unwrap(), 1);
        assert!(restored.get("other").is_some());
        assert!(restored.get("vehicle").is_none());
        // The work file does not linger.
        assert!(!store.path().with_extension("json~").exists());
    }
}
