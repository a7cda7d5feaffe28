//! Geodetic frame kinematics.
//!
//! The orientation of a [`GeodeticPose`] is defined with respect to the
//! topocentric (North, East, Down) frame at its position, so every
//! conversion here composes the chain to the body frame with the topocentric
//! rotation at the relevant point.

use geopose_geodesy::OneAxisEllipsoid;
use geopose_types::{GeodeticPose, NauticalAngles, Pose, Transform, Vector3};

use crate::tree::TreeState;

/// Builds the transform from the body frame into a frame placed at a
/// geodetic pose: translate by the negated body-frame position, then rotate
/// by the pose orientation composed with the topocentric rotation at the
/// position.
pub(crate) fn make_transform(ellipsoid: &OneAxisEllipsoid, pose: &GeodeticPose) -> Transform {
    let translation = -ellipsoid.to_ecef(&pose.position);
    let topocentric = ellipsoid.topocentric_rotation(&pose.position);
    Transform::new(translation, pose.orientation.to_rotation() * topocentric)
}

/// The geodetic pose of a local pose in a named frame, or `None` when the
/// chain to the body frame is unknown or the solver degenerates.
pub(crate) fn pose_to_geodetic(
    ellipsoid: &OneAxisEllipsoid,
    state: &TreeState,
    name: &str,
    pose: &Pose,
) -> Option<GeodeticPose> {
    let frame_to_body = state.transform_between(name, state.root_name()).ok()?;
    let pose_to_body = Transform::from_pose(pose).inverse().and_then(&frame_to_body);

    let body_position = pose_to_body.transform_position(Vector3::ZERO);
    let point = ellipsoid.from_ecef(&body_position).ok()?;

    let topocentric = ellipsoid.topocentric_rotation(&point);
    let orientation = (topocentric * pose_to_body.rotation()).revert();
    Some(GeodeticPose::new(
        point,
        NauticalAngles::from_rotation(&orientation),
    ))
}

/// The local pose, in a named frame, of a geodetic pose; `None` when the
/// chain to the body frame is unknown.
pub(crate) fn geodetic_to_pose(
    ellipsoid: &OneAxisEllipsoid,
    state: &TreeState,
    name: &str,
    geopose: &GeodeticPose,
) -> Option<Pose> {
    let frame_to_body = state.transform_between(name, state.root_name()).ok()?;
    let body_to_pose = make_transform(ellipsoid, geopose);
    Some(frame_to_body.and_then(&body_to_pose).to_pose())
}

/// The apparent pose in a destination frame of a pose given in a source
/// frame; `None` when the connecting chain is unknown.
pub(crate) fn transform_pose(
    state: &TreeState,
    src: &str,
    dst: &str,
    pose: &Pose,
) -> Option<Pose> {
    let dst_to_src = state.transform_between(dst, src).ok()?;
    Some(dst_to_src.and_then(&Transform::from_pose(pose)).to_pose())
}
