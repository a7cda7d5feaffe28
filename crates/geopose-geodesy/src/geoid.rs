//! Geoid undulation.
//!
//! A geoid model supplies the offset between the reference ellipsoid and mean
//! sea level.  The engine itself never consults it; the conversion between
//! "above mean sea level" and "height above ellipsoid" belongs to the outer
//! encoding boundary, where client payloads are translated into
//! [`GeodeticPoint`](geopose_types::GeodeticPoint)s.

/// Supplier of the ellipsoid-to-mean-sea-level offset.
pub trait Geoid {
    /// Height of mean sea level above the ellipsoid at a point, in meters.
    ///
    /// Latitude and longitude are in radians.
    fn undulation(&self, latitude: f64, longitude: f64) -> f64;

    /// Converts an altitude above mean sea level to a height above the
    /// ellipsoid.
    fn amsl_to_hae(&self, latitude: f64, longitude: f64, amsl: f64) -> f64 {
        amsl + self.undulation(latitude, longitude)
    }

    /// Converts a height above the ellipsoid to an altitude above mean sea
    /// level.
    fn hae_to_amsl(&self, latitude: f64, longitude: f64, hae: f64) -> f64 {
        hae - self.undulation(latitude, longitude)
    }
}

/// A geoid with the same undulation everywhere.
///
/// `ConstantGeoid::default()` makes mean sea level coincide with the
/// ellipsoid, which is the right model for tests and for spherical bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConstantGeoid {
    undulation: f64,
}

impl ConstantGeoid {
    /// Creates a geoid offset from the ellipsoid by a fixed amount.
    pub fn new(undulation: f64) -> Self {
        ConstantGeoid { undulation }
    }
}

impl Geoid for ConstantGeoid {
    fn undulation(&self, _latitude: f64, _longitude: f64) -> f64 {
        self.undulation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn amsl_and_hae_are_offset_by_the_undulation() {
        let geoid = ConstantGeoid::new(-32.5);
        let lat = 0.65;
        let lon = -2.02;
        assert_relative_eq!(geoid.amsl_to_hae(lat, lon, 100.0), 67.5);
        assert_relative_eq!(geoid.hae_to_amsl(lat, lon, 67.5), 100.0);
    }

    #[test]
    fn default_geoid_is_the_ellipsoid() {
        let geoid = ConstantGeoid::default();
        assert_relative_eq!(geoid.undulation(1.0, 2.0), 0.0);
        assert_relative_eq!(geoid.amsl_to_hae(1.0, 2.0, 42.0), 42.0);
    }
}
