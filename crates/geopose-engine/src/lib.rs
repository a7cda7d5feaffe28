//! `geopose-engine` – A live forest of rigid frames anchored to an Earth
//! reference ellipsoid.
//!
//! Clients create and destroy named frames, attach them to parents with a
//! rigid offset, geolocate a subgraph by updating any frame in it, and query
//! conversions between frames or between a frame and the geodetic reference.
//! Streams re-deliver a conversion whenever any frame on the relevant path
//! moves.
//!
//! # Modules
//!
//! - [`tree`] – [`CowFrameTree`]: the copy-on-write forest with snapshot
//!   reads, serialized writes, and generation-tagged [`Frame`] records.
//! - [`bus`] – [`ChangeTrackingTree`]: broadcast [`Change`] events with
//!   replay-seeded subscription.
//! - [`engine`] – [`PoseEngine`]: the facade combining the forest, the
//!   geodetic kinematics, and the per-frame signals behind the reactive
//!   streams.
//!
//! # Example
//!
//! ```rust
//! use geopose_engine::PoseEngine;
//! use geopose_geodesy::OneAxisEllipsoid;
//! use geopose_types::{GeodeticPoint, GeodeticPose, NauticalAngles, Pose, Vector3};
//!
//! let engine = PoseEngine::new(OneAxisEllipsoid::wgs84());
//! engine.create_root("vehicle").unwrap();
//! engine
//!     .create(
//!         "vehicle",
//!         "antenna",
//!         &Pose::new(Vector3::new(0.0, 0.0, -2.0), NauticalAngles::IDENTITY),
//!     )
//!     .unwrap();
//!
//! // Nothing is geolocated yet.
//! assert!(engine.convert("antenna", &Pose::IDENTITY).is_none());
//!
//! engine
//!     .update(
//!         "vehicle",
//!         &GeodeticPose::new(
//!             GeodeticPoint::new(0.65_f64, -2.02_f64, 1360.0),
//!             NauticalAngles::IDENTITY,
//!         ),
//!     )
//!     .unwrap();
//! let fix = engine.convert("antenna", &Pose::IDENTITY).unwrap();
//! assert!(fix.position.altitude() > 1360.0);
//! ```

pub mod bus;
pub mod engine;
mod geodetic;
mod signals;
pub mod tree;

pub use bus::{Change, ChangeTrackingTree};
pub use engine::PoseEngine;
pub use tree::{CowFrameTree, Frame, FrameTransform, Traversal};
