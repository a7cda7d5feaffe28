//! Nautical (Cardan) angles.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::rotation::Rotation;
use crate::vector::Vector3;

/// Squared cosine of pitch below which a rotation is treated as pointing
/// straight along the pole (gimbal lock).  Sits well above the rounding
/// noise of quaternion arithmetic (~1e-31 after squaring) and well below the
/// smallest off-pole pitches the extraction can still separate (~1e-16).
const POLE_THRESHOLD: f64 = 1e-28;

/// Normalizes an angle into `[center - π, center + π)`.
pub fn normalize_angle(angle: f64, center: f64) -> f64 {
    angle - TAU * ((angle - center + PI) / TAU).floor()
}

/// A set of angles representing rotation about three axes, applied in the
/// intrinsic nautical order z-y'-x'' (yaw, then pitch, then roll).
///
/// Positive angles correspond to clockwise movement about the axis, from the
/// perspective of the origin.  Canonical ranges are `roll ∈ [-π, π]`,
/// `pitch ∈ [-π/2, π/2]`, and `yaw ∈ [-π, π]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NauticalAngles {
    roll: f64,
    pitch: f64,
    yaw: f64,
}

impl NauticalAngles {
    /// No roll, pitch, or yaw.
    pub const IDENTITY: NauticalAngles = NauticalAngles {
        roll: 0.0,
        pitch: 0.0,
        yaw: 0.0,
    };

    /// Creates a set of angles from the given roll, pitch, and yaw,
    /// normalized into canonical ranges.
    ///
    /// A pitch beyond the pole is reflected back through it, which adds π to
    /// both the roll and the yaw.
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        let mut r = normalize_angle(roll, 0.0);
        let mut p = normalize_angle(pitch, FRAC_PI_2);
        let mut y = normalize_angle(yaw, 0.0);
        if p > FRAC_PI_2 {
            r = normalize_angle(r + PI, 0.0);
            p = PI - p;
            y = normalize_angle(y + PI, 0.0);
        }
        NauticalAngles {
            roll: r,
            pitch: p,
            yaw: y,
        }
    }

    /// Creates a set of angles without normalizing them.
    pub const fn new_unnormalized(roll: f64, pitch: f64, yaw: f64) -> Self {
        NauticalAngles { roll, pitch, yaw }
    }

    /// Extracts nautical angles from a rotation.
    ///
    /// When the rotated x-axis points along a pole, the roll and yaw describe
    /// the same physical rotation and cannot be separated.  This
    /// implementation reports the whole remaining z-rotation as yaw and sets
    /// the roll to zero, recovering the yaw from the quaternion components so
    /// that no information is lost.
    pub fn from_rotation(r: &Rotation) -> Self {
        let v1 = r.apply_to(Vector3::PLUS_K);
        let v2 = r.apply_inverse_to(Vector3::PLUS_I);
        let pitch = -v2.z.clamp(-1.0, 1.0).asin();

        if v2.x * v2.x + v2.y * v2.y <= POLE_THRESHOLD {
            let yaw = -(2.0f64).copysign(r.w() * r.y()) * r.x().atan2(r.w());
            NauticalAngles {
                roll: 0.0,
                pitch,
                yaw: normalize_angle(yaw, 0.0),
            }
        } else {
            NauticalAngles {
                roll: v1.y.atan2(v1.z),
                pitch,
                yaw: v2.y.atan2(v2.x),
            }
        }
    }

    /// Builds the z-y'-x'' frame-transform rotation for these angles: the
    /// operator that maps coordinates in the reference frame to coordinates
    /// in the rotated frame.
    pub fn to_rotation(&self) -> Rotation {
        let (sr, cr) = (0.5 * self.roll).sin_cos();
        let (sp, cp) = (0.5 * self.pitch).sin_cos();
        let (sy, cy) = (0.5 * self.yaw).sin_cos();
        Rotation::new(
            cr * cp * cy + sr * sp * sy,
            -sr * cp * cy + cr * sp * sy,
            -cr * sp * cy - sr * cp * sy,
            sr * sp * cy - cr * cp * sy,
        )
    }

    /// Builds the same operator as [`NauticalAngles::to_rotation`] by
    /// composing vector-operator rotations about the negated basis vectors in
    /// x-y-z order, the form used when assembling a [`Transform`].
    ///
    /// The sign flip reflects the duality between frame transforms and vector
    /// operators.
    ///
    /// [`Transform`]: crate::Transform
    pub fn to_transform_rotation(&self) -> Rotation {
        let r1 = Rotation::from_axis_angle(-Vector3::PLUS_I, self.roll);
        let r2 = Rotation::from_axis_angle(-Vector3::PLUS_J, self.pitch);
        let r3 = Rotation::from_axis_angle(-Vector3::PLUS_K, self.yaw);
        r1 * (r2 * r3)
    }

    /// The angle around the x-axis, in `[-π, π]`.
    pub fn roll(&self) -> f64 {
        self.roll
    }

    /// The angle around the y-axis, in `[-π/2, π/2]`.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// The angle around the z-axis, in `[-π, π]`.
    pub fn yaw(&self) -> f64 {
        self.yaw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    const ANGLE_ERROR: f64 = 1e-7;

    fn assert_angles_eq(actual: &NauticalAngles, roll: f64, pitch: f64, yaw: f64) {
        assert_relative_eq!(actual.roll(), roll, epsilon = ANGLE_ERROR);
        assert_relative_eq!(actual.pitch(), pitch, epsilon = ANGLE_ERROR);
        assert_relative_eq!(actual.yaw(), yaw, epsilon = ANGLE_ERROR);
    }

    #[test]
    fn normalize_wraps_yaw() {
        let a = NauticalAngles::new(0.0, 0.0, 3.0 * FRAC_PI_2);
        assert_angles_eq(&a, 0.0, 0.0, -FRAC_PI_2);
    }

    #[test]
    fn normalize_reflects_pitch_through_the_pole() {
        let a = NauticalAngles::new(FRAC_PI_4, 3.0 * PI / 4.0, FRAC_PI_2);
        assert_angles_eq(&a, -3.0 * PI / 4.0, FRAC_PI_4, -FRAC_PI_2);
    }

    #[test]
    fn normalization_agrees_with_rotation_roundtrip() {
        let raw = NauticalAngles::new_unnormalized(FRAC_PI_4, 3.0 * PI / 4.0, FRAC_PI_2);
        let through_rotation = NauticalAngles::from_rotation(&raw.to_rotation());
        let normalized = NauticalAngles::new(FRAC_PI_4, 3.0 * PI / 4.0, FRAC_PI_2);
        assert_angles_eq(
            &through_rotation,
            normalized.roll(),
            normalized.pitch(),
            normalized.yaw(),
        );
    }

    #[test]
    fn rotation_roundtrip_over_canonical_grid() {
        let mut r = -3.1;
        while r < 3.1 {
            let mut p = -1.55;
            while p < 1.55 {
                let mut y = -3.1;
                while y < 3.1 {
                    let a = NauticalAngles::new(r, p, y);
                    let b = NauticalAngles::from_rotation(&a.to_rotation());
                    assert_angles_eq(&b, a.roll(), a.pitch(), a.yaw());
                    y += 0.3;
                }
                p += 0.3;
            }
            r += 0.3;
        }
    }

    #[test]
    fn transform_rotation_matches_frame_rotation() {
        let mut y = -3.1;
        while y < 3.1 {
            let a = NauticalAngles::new(0.4, -0.9, y);
            let v = Vector3::new(0.3, -2.0, 1.1);
            let u1 = a.to_rotation().apply_to(v);
            let u2 = a.to_transform_rotation().apply_to(v);
            assert_relative_eq!(u1.x, u2.x, epsilon = 1e-12);
            assert_relative_eq!(u1.y, u2.y, epsilon = 1e-12);
            assert_relative_eq!(u1.z, u2.z, epsilon = 1e-12);
            y += 0.7;
        }
    }

    #[test]
    fn gimbal_lock_up_reports_yaw() {
        let a = NauticalAngles::from_rotation(
            &NauticalAngles::new(0.0, FRAC_PI_2, FRAC_PI_2).to_rotation(),
        );
        assert_angles_eq(&a, 0.0, FRAC_PI_2, FRAC_PI_2);
    }

    #[test]
    fn gimbal_lock_up_with_small_yaw() {
        let yaw = 1.0f64.to_radians();
        let a =
            NauticalAngles::from_rotation(&NauticalAngles::new(0.0, FRAC_PI_2, yaw).to_rotation());
        assert_angles_eq(&a, 0.0, FRAC_PI_2, yaw);
    }

    #[test]
    fn gimbal_lock_up_over_yaw_sweep() {
        let mut deg = 0.0;
        while deg < 180.0 {
            let yaw = (deg as f64).to_radians();
            let a = NauticalAngles::from_rotation(
                &NauticalAngles::new(0.0, FRAC_PI_2, yaw).to_rotation(),
            );
            assert_angles_eq(&a, 0.0, FRAC_PI_2, yaw);
            deg += 0.25;
        }
    }

    #[test]
    fn near_gimbal_lock_still_separates_roll_and_yaw() {
        // Any closer to the pole and the extraction error starts to grow.
        let pitch = (90.0 - 0.000001f64).to_radians();
        let mut deg = 0.0;
        while deg < 180.0 {
            let angle = (deg as f64).to_radians();
            let a = NauticalAngles::from_rotation(
                &NauticalAngles::new(angle, pitch, angle).to_rotation(),
            );
            assert_angles_eq(&a, angle, pitch, angle);
            deg += 0.25;
        }
    }

    #[test]
    fn gimbal_lock_down_reports_negative_yaw() {
        let a = NauticalAngles::from_rotation(
            &NauticalAngles::new(0.0, -FRAC_PI_2, -FRAC_PI_2).to_rotation(),
        );
        assert_angles_eq(&a, 0.0, -FRAC_PI_2, -FRAC_PI_2);
    }

    #[test]
    fn normalize_angle_is_centered() {
        assert_relative_eq!(normalize_angle(3.0 * PI, 0.0), -PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(-FRAC_PI_2, FRAC_PI_2), -FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(TAU + 0.25, 0.0), 0.25, epsilon = 1e-12);
    }
}
