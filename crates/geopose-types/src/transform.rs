//! Rigid affine transforms between frames.
//!
//! A [`Transform`] maps the coordinates of a point from one frame into
//! another: `p' = R · (p + t)`, the translation applied before the rotation.
//! All transforms in this system are fixed in time.

use serde::{Deserialize, Serialize};

use crate::angles::NauticalAngles;
use crate::pose::Pose;
use crate::rotation::Rotation;
use crate::vector::Vector3;

/// A composable, invertible rigid transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    translation: Vector3,
    rotation: Rotation,
}

impl Transform {
    /// The transform that maps every point to itself.
    pub const IDENTITY: Transform = Transform {
        translation: Vector3::ZERO,
        rotation: Rotation::IDENTITY,
    };

    /// Creates a transform from a translation and a rotation.
    pub const fn new(translation: Vector3, rotation: Rotation) -> Self {
        Transform {
            translation,
            rotation,
        }
    }

    /// Creates a pure translation.
    pub const fn from_translation(translation: Vector3) -> Self {
        Transform {
            translation,
            rotation: Rotation::IDENTITY,
        }
    }

    /// Creates a pure rotation.
    pub const fn from_rotation(rotation: Rotation) -> Self {
        Transform {
            translation: Vector3::ZERO,
            rotation,
        }
    }

    /// Creates the transform from a parent frame into the frame a pose
    /// places: translate by the negated position, then rotate by the pose
    /// orientation.
    pub fn from_pose(pose: &Pose) -> Self {
        Transform {
            translation: -pose.position,
            rotation: pose.orientation.to_transform_rotation(),
        }
    }

    /// Extracts the pose this parent-to-child transform places, the exact
    /// inverse of [`Transform::from_pose`].
    pub fn to_pose(&self) -> Pose {
        Pose::new(
            -self.translation,
            NauticalAngles::from_rotation(&self.rotation),
        )
    }

    /// The translation component, applied before the rotation.
    pub fn translation(&self) -> Vector3 {
        self.translation
    }

    /// The rotation component.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Composes this transform with a following one: the result applies
    /// `self` first and `next` second.
    pub fn and_then(&self, next: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation.apply_inverse_to(next.translation),
            rotation: next.rotation * self.rotation,
        }
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Transform {
        Transform {
            translation: -self.rotation.apply_to(self.translation),
            rotation: self.rotation.revert(),
        }
    }

    /// Maps the coordinates of a point.
    pub fn transform_position(&self, p: Vector3) -> Vector3 {
        self.rotation.apply_to(p + self.translation)
    }

    /// Maps the coordinates of a direction (rotation only).
    pub fn transform_direction(&self, v: Vector3) -> Vector3 {
        self.rotation.apply_to(v)
    }
}
