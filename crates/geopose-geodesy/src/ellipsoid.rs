//! One-axis reference ellipsoids.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use geopose_types::{GeodeticPoint, Rotation, Vector3};

// WGS-84 defining parameters, NGA STND 0036 table 3.1.
const WGS84_EQUATORIAL_RADIUS: f64 = 6_378_137.0;
const WGS84_INVERSE_FLATTENING: f64 = 298.257_223_563;

/// Convergence tolerance of the geodetic-latitude iteration, in radians.
/// Corresponds to well under a micrometer on the surface.
const LATITUDE_TOLERANCE: f64 = 1e-12;
const MAX_ITERATIONS: usize = 60;

/// Numeric failures of the ellipsoid solver.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeodesyError {
    /// The geodetic-latitude iteration failed to converge, typically for a
    /// point deep inside the ellipsoid.
    #[error("geodetic conversion did not converge")]
    NonConvergence,
}

/// An ellipsoid of revolution around its polar axis, the reference surface
/// that anchors every frame forest.
///
/// The body frame is Earth-centered, Earth-fixed: the x-axis pierces the
/// equator at the prime meridian, the z-axis is the polar axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OneAxisEllipsoid {
    equatorial_radius: f64,
    flattening: f64,
    eccentricity_squared: f64,
}

impl OneAxisEllipsoid {
    /// Creates an ellipsoid from its equatorial radius in meters and its
    /// flattening.
    pub fn new(equatorial_radius: f64, flattening: f64) -> Self {
        OneAxisEllipsoid {
            equatorial_radius,
            flattening,
            eccentricity_squared: flattening * (2.0 - flattening),
        }
    }

    /// The WGS-84 Earth model.
    pub fn wgs84() -> Self {
        OneAxisEllipsoid::new(WGS84_EQUATORIAL_RADIUS, 1.0 / WGS84_INVERSE_FLATTENING)
    }

    /// A perfect sphere, useful for tests where curvature effects would get
    /// in the way.
    pub fn sphere(radius: f64) -> Self {
        OneAxisEllipsoid::new(radius, 0.0)
    }

    /// Equatorial radius in meters.
    pub fn equatorial_radius(&self) -> f64 {
        self.equatorial_radius
    }

    /// Flattening of the ellipsoid.
    pub fn flattening(&self) -> f64 {
        self.flattening
    }

    /// Distance from the center to a pole, in meters.
    pub fn polar_radius(&self) -> f64 {
        self.equatorial_radius * (1.0 - self.flattening)
    }

    /// The name of the Earth-centered, Earth-fixed body frame all transforms
    /// hang off.
    pub fn body_frame(&self) -> &'static str {
        "ECEF"
    }

    /// Converts a geodetic point to Cartesian body-frame coordinates.
    pub fn to_ecef(&self, point: &GeodeticPoint) -> Vector3 {
        let (sin_lat, cos_lat) = point.latitude().sin_cos();
        let (sin_lon, cos_lon) = point.longitude().sin_cos();
        let n = self.prime_vertical_radius(sin_lat);
        let r = (n + point.altitude()) * cos_lat;
        Vector3::new(
            r * cos_lon,
            r * sin_lon,
            (n * (1.0 - self.eccentricity_squared) + point.altitude()) * sin_lat,
        )
    }

    /// Converts Cartesian body-frame coordinates to a geodetic point by
    /// fixed-point iteration on the geodetic latitude.
    ///
    /// Converges to [`LATITUDE_TOLERANCE`] for any point at or above the
    /// surface; points far inside the ellipsoid may fail with
    /// [`GeodesyError::NonConvergence`].
    pub fn from_ecef(&self, v: &Vector3) -> Result<GeodeticPoint, GeodesyError> {
        let a = self.equatorial_radius;
        let e2 = self.eccentricity_squared;
        let p = (v.x * v.x + v.y * v.y).sqrt();
        let lon = v.y.atan2(v.x);

        // On the polar axis the longitude is arbitrary and the latitude is
        // exactly a pole.
        if p <= a * f64::EPSILON {
            return Ok(GeodeticPoint::new(
                FRAC_PI_2.copysign(v.z),
                lon,
                v.z.abs() - self.polar_radius(),
            ));
        }

        let mut lat = v.z.atan2(p * (1.0 - e2));
        for _ in 0..MAX_ITERATIONS {
            let (sin_lat, cos_lat) = lat.sin_cos();
            let n = self.prime_vertical_radius(sin_lat);
            let h = self.height_at(p, v.z, sin_lat, cos_lat);
            let next = v.z.atan2(p * (1.0 - e2 * n / (n + h)));
            if (next - lat).abs() <= LATITUDE_TOLERANCE {
                let (sin_lat, cos_lat) = next.sin_cos();
                let h = self.height_at(p, v.z, sin_lat, cos_lat);
                return Ok(GeodeticPoint::new(next, lon, h));
            }
            lat = next;
        }
        Err(GeodesyError::NonConvergence)
    }

    /// Rotation taking body-frame axes to the topocentric (North, East,
    /// Down) axes at a point.
    pub fn topocentric_rotation(&self, point: &GeodeticPoint) -> Rotation {
        let north = point.north();
        let east = point.east();
        let down = point.down();
        Rotation::from_matrix([
            [north.x, north.y, north.z],
            [east.x, east.y, east.z],
            [down.x, down.y, down.z],
        ])
    }

    fn prime_vertical_radius(&self, sin_lat: f64) -> f64 {
        self.equatorial_radius / (1.0 - self.eccentricity_squared * sin_lat * sin_lat).sqrt()
    }

    // Well-conditioned height above the ellipsoid, valid away from the polar
    // axis.
    fn height_at(&self, p: f64, z: f64, sin_lat: f64, cos_lat: f64) -> f64 {
        let w = (1.0 - self.eccentricity_squared * sin_lat * sin_lat).sqrt();
        p * cos_lat + z * sin_lat - self.equatorial_radius * w
    }
}
