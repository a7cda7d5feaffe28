//! `geopose-types` – Value types and rigid-transform math.
//!
//! The vocabulary shared by every geopose crate:
//!
//! - [`Vector3`] and [`Rotation`] – Cartesian vectors and unit-quaternion
//!   rotation operators.
//! - [`NauticalAngles`] – intrinsic z-y'-x'' roll/pitch/yaw with canonical
//!   ranges and robust gimbal-lock extraction.
//! - [`Pose`] – a position and orientation in the axes of a named frame.
//! - [`GeodeticPoint`] / [`GeodeticPose`] – latitude, longitude, and height
//!   above the ellipsoid, with an orientation in the local (North, East,
//!   Down) frame.
//! - [`Transform`] – the composable, invertible rigid map `p' = R (p + t)`
//!   used for every frame-to-frame relation.
//! - [`PoseError`] – validation and unknown-transform failures.
//!
//! Lengths are meters and angles are radians throughout; degrees only appear
//! at external boundaries.

pub mod angles;
pub mod error;
pub mod pose;
pub mod rotation;
pub mod transform;
pub mod vector;

pub use angles::{normalize_angle, NauticalAngles};
pub use error::PoseError;
pub use pose::{GeodeticPoint, GeodeticPose, Pose};
pub use rotation::Rotation;
pub use transform::Transform;
pub use vector::Vector3;
