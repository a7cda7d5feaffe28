//! Unit-quaternion rotations.
//!
//! A [`Rotation`] is a vector operator: [`Rotation::apply_to`] rotates a
//! vector, and the product `a * b` is the operator that applies `b` first and
//! then `a`.  Frame transforms (computing the coordinates of a fixed vector in
//! a rotated frame) are the inverse operators; the nautical-angle code builds
//! them by negating angles rather than by keeping a second convention here.

use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::vector::Vector3;

/// A rotation of 3-D space, stored as a normalized quaternion `(w, x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    w: f64,
    x: f64,
    y: f64,
    z: f64,
}

impl Rotation {
    /// The identity rotation.
    pub const IDENTITY: Rotation = Rotation {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Creates a rotation from raw quaternion components, normalizing them.
    ///
    /// A degenerate all-zero quaternion yields the identity rotation rather
    /// than a panic; the engine never raises on numeric edge cases.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        let norm = (w * w + x * x + y * y + z * z).sqrt();
        if norm <= f64::MIN_POSITIVE {
            return Rotation::IDENTITY;
        }
        let inv = 1.0 / norm;
        Rotation {
            w: w * inv,
            x: x * inv,
            y: y * inv,
            z: z * inv,
        }
    }

    /// Creates the rotation of `angle` radians around `axis` (right-hand
    /// rule), as a vector operator.
    ///
    /// A vanishing axis yields the identity rotation.
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Self {
        let Some(unit) = axis.normalized() else {
            return Rotation::IDENTITY;
        };
        let half = 0.5 * angle;
        let sin = half.sin();
        Rotation {
            w: half.cos(),
            x: sin * unit.x,
            y: sin * unit.y,
            z: sin * unit.z,
        }
    }

    /// Creates a rotation from an orthonormal matrix given by rows, such that
    /// `apply_to(v)` computes `m · v`.
    ///
    /// The caller is responsible for orthonormality (right-handed, unit
    /// rows); the constructor only selects the numerically stable extraction
    /// branch.
    pub fn from_matrix(m: [[f64; 3]; 3]) -> Self {
        // Shepperd's method: pick the largest of w, x, y, z to divide by.
        let trace = m[0][0] + m[1][1] + m[2][2];
        if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Rotation::new(
                0.25 * s,
                (m[2][1] - m[1][2]) / s,
                (m[0][2] - m[2][0]) / s,
                (m[1][0] - m[0][1]) / s,
            )
        } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
            let s = (1.0 + m[0][0] - m[1][1] - m[2][2]).sqrt() * 2.0;
            Rotation::new(
                (m[2][1] - m[1][2]) / s,
                0.25 * s,
                (m[0][1] + m[1][0]) / s,
                (m[0][2] + m[2][0]) / s,
            )
        } else if m[1][1] > m[2][2] {
            let s = (1.0 + m[1][1] - m[0][0] - m[2][2]).sqrt() * 2.0;
            Rotation::new(
                (m[0][2] - m[2][0]) / s,
                (m[0][1] + m[1][0]) / s,
                0.25 * s,
                (m[1][2] + m[2][1]) / s,
            )
        } else {
            let s = (1.0 + m[2][2] - m[0][0] - m[1][1]).sqrt() * 2.0;
            Rotation::new(
                (m[1][0] - m[0][1]) / s,
                (m[0][2] + m[2][0]) / s,
                (m[1][2] + m[2][1]) / s,
                0.25 * s,
            )
        }
    }

    /// The scalar quaternion component.
    pub fn w(&self) -> f64 {
        self.w
    }

    /// The x quaternion component.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// The y quaternion component.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// The z quaternion component.
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Rotates a vector: `v' = q v q*`.
    pub fn apply_to(&self, v: Vector3) -> Vector3 {
        let q = Vector3::new(self.x, self.y, self.z);
        let t = q.cross(v).scale(2.0);
        v + t.scale(self.w) + q.cross(t)
    }

    /// Applies the inverse rotation to a vector.
    pub fn apply_inverse_to(&self, v: Vector3) -> Vector3 {
        self.revert().apply_to(v)
    }

    /// The inverse rotation (quaternion conjugate).
    pub fn revert(&self) -> Rotation {
        Rotation {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// The rotation angle in `[0, π]`.
    pub fn angle(&self) -> f64 {
        let sin = (self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        2.0 * sin.atan2(self.w.abs())
    }
}

impl Mul for Rotation {
    type Output = Rotation;

    /// Hamilton product: `(a * b).apply_to(v) == a.apply_to(b.apply_to(v))`.
    fn mul(self, rhs: Rotation) -> Rotation {
        Rotation {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}
