//! Local and geodetic pose types.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::angles::{normalize_angle, NauticalAngles};
use crate::vector::Vector3;

/// A position and orientation in the Cartesian axes of a named frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Cartesian coordinates of the pose, in meters.
    pub position: Vector3,
    /// Orientation with respect to the Cartesian axes.
    pub orientation: NauticalAngles,
}

impl Pose {
    /// A pose at the origin with no roll, pitch, or yaw.
    pub const IDENTITY: Pose = Pose {
        position: Vector3::ZERO,
        orientation: NauticalAngles::IDENTITY,
    };

    /// Creates a pose at the given position and orientation.
    pub const fn new(position: Vector3, orientation: NauticalAngles) -> Self {
        Pose {
            position,
            orientation,
        }
    }
}

/// A point on (or above) a reference ellipsoid.
///
/// Latitude and longitude are normalized on construction: the latitude into
/// `[-π/2, π/2]` and the longitude into `[-π, π)`, shifting the longitude by π
/// whenever the latitude had to be reflected across a pole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPoint {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

impl GeodeticPoint {
    /// Creates a geodetic point from a latitude and longitude in radians and
    /// an altitude in meters above the ellipsoid.
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        let mut lat = normalize_angle(latitude, 0.0);
        let mut lon_shift = 0.0;
        if lat > FRAC_PI_2 {
            lat = PI - lat;
            lon_shift = PI;
        } else if lat < -FRAC_PI_2 {
            lat = -PI - lat;
            lon_shift = PI;
        }
        GeodeticPoint {
            latitude: lat,
            longitude: normalize_angle(longitude + lon_shift, 0.0),
            altitude,
        }
    }

    /// Geodetic latitude in radians, in `[-π/2, π/2]`.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in radians, in `[-π, π)`.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Height above the ellipsoid in meters.
    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    /// Unit vector pointing North in body-frame (ECEF) axes.
    pub fn north(&self) -> Vector3 {
        let (sin_lat, cos_lat) = self.latitude.sin_cos();
        let (sin_lon, cos_lon) = self.longitude.sin_cos();
        Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat)
    }

    /// Unit vector pointing East in body-frame (ECEF) axes.
    pub fn east(&self) -> Vector3 {
        let (sin_lon, cos_lon) = self.longitude.sin_cos();
        Vector3::new(-sin_lon, cos_lon, 0.0)
    }

    /// Unit vector pointing toward the ellipsoid center in body-frame (ECEF)
    /// axes.
    pub fn down(&self) -> Vector3 {
        let (sin_lat, cos_lat) = self.latitude.sin_cos();
        let (sin_lon, cos_lon) = self.longitude.sin_cos();
        Vector3::new(-cos_lat * cos_lon, -cos_lat * sin_lon, -sin_lat)
    }
}

impl fmt::Display for GeodeticPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.7}°, {:.7}°, {:.3}m",
            self.latitude.to_degrees(),
            self.longitude.to_degrees(),
            self.altitude
        )
    }
}

/// A geodetic position plus an orientation expressed in the topocentric
/// (North, East, Down) frame at that position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPose {
    /// Geodetic position.
    pub position: GeodeticPoint,
    /// Orientation with respect to the topocentric frame at `position`.
    pub orientation: NauticalAngles,
}

impl GeodeticPose {
    /// Creates a geodetic pose.
    pub const fn new(position: GeodeticPoint, orientation: NauticalAngles) -> Self {
        GeodeticPose {
            position,
            orientation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn latitude_beyond_the_pole_reflects_and_shifts_longitude() {
        let p = GeodeticPoint::new(100.0f64.to_radians(), 10.0f64.to_radians(), 5.0);
        assert_relative_eq!(p.latitude(), 80.0f64.to_radians(), epsilon = 1e-12);
        assert_relative_eq!(p.longitude(), -170.0f64.to_radians(), epsilon = 1e-12);
        assert_relative_eq!(p.altitude(), 5.0);
    }

    #[test]
    fn longitude_wraps_to_signed_range() {
        let p = GeodeticPoint::new(0.0, 270.0f64.to_radians(), 0.0);
        assert_relative_eq!(p.longitude(), -90.0f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn topocentric_axes_at_origin() {
        let p = GeodeticPoint::new(0.0, 0.0, 0.0);
        let north = p.north();
        let east = p.east();
        let down = p.down();
        assert_relative_eq!(north.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(east.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(down.x, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn topocentric_axes_are_right_handed_everywhere() {
        let mut lat = -1.5;
        while lat < 1.5 {
            let mut lon = -3.1;
            while lon < 3.1 {
                let p = GeodeticPoint::new(lat, lon, 0.0);
                let cross = p.north().cross(p.east());
                let down = p.down();
                assert_relative_eq!(cross.x, down.x, epsilon = 1e-12);
                assert_relative_eq!(cross.y, down.y, epsilon = 1e-12);
                assert_relative_eq!(cross.z, down.z, epsilon = 1e-12);
                lon += 0.4;
            }
            lat += 0.25;
        }
    }

    #[test]
    fn geodetic_pose_serde_roundtrip() {
        let pose = GeodeticPose::new(
            GeodeticPoint::new(0.65, -2.02, 1360.0),
            NauticalAngles::new(0.1, -0.2, 0.3),
        );
        let json = serde_json::to_string(&pose).unwrap();
        let back: GeodeticPose = serde_json::from_str(&json).unwrap();
        assert_eq!(pose, back);
    }
}
