//! `geopose-geodesy` – Reference-ellipsoid and geoid math.
//!
//! Supplies the two external collaborators the pose engine depends on:
//!
//! - [`OneAxisEllipsoid`] – geodetic ↔ Earth-centered Earth-fixed
//!   conversion and the topocentric (North, East, Down) rotation at a point.
//!   [`OneAxisEllipsoid::wgs84`] is the standard Earth;
//!   [`OneAxisEllipsoid::sphere`] builds degenerate bodies for tests.
//! - [`Geoid`] – the ellipsoid-to-mean-sea-level offset, applied only at the
//!   outer encoding boundary to translate between AMSL and
//!   height-above-ellipsoid.

pub mod ellipsoid;
pub mod geoid;

pub use ellipsoid::{GeodesyError, OneAxisEllipsoid};
pub use geoid::{ConstantGeoid, Geoid};
