//! Pivot-relative transform operations.
//!
//! These are the building blocks for the node-level `rotate`, `rotate_around`
//! and `look_at` operations. They only touch values, never node state.

use cgmath::{InnerSpace, Quaternion, Rad, Rotation, Rotation3, Vector3};

use crate::EPSILON;

// =============================================================================
// Pivot-Based Transforms
// =============================================================================

/// Rotates a position around a pivot point.
///
/// # Arguments
/// * `position` - The position to rotate
/// * `pivot` - The pivot point, in the same space as `position`
/// * `rotation` - The rotation to apply
pub fn rotate_position_about_pivot(
    position: Vector3<f32>,
    pivot: Vector3<f32>,
    rotation: Quaternion<f32>,
) -> Vector3<f32> {
    let offset = position - pivot;
    pivot + rotation.rotate_vector(offset)
}

/// Applies a rotation on top of an existing orientation (`rotation * current`).
pub fn compose_rotation(
    current_rotation: Quaternion<f32>,
    rotation: Quaternion<f32>,
) -> Quaternion<f32> {
    rotation * current_rotation
}

// =============================================================================
// Quaternion Utilities
// =============================================================================

/// Creates a rotation quaternion from an axis and angle, with safety for zero-length axes.
///
/// The axis does not need to be normalized. A near-zero axis yields the
/// identity quaternion.
pub fn quaternion_from_axis_angle_safe(axis: Vector3<f32>, angle: f32) -> Quaternion<f32> {
    if axis.magnitude2() > EPSILON {
        Quaternion::from_axis_angle(axis.normalize(), Rad(angle))
    } else {
        Quaternion::new(1.0, 0.0, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    const TEST_EPSILON: f32 = 1e-5;

    #[test]
    fn test_rotate_position_about_pivot_identity() {
        let position = Vector3::new(1.0, 0.0, 0.0);
        let rotation = Quaternion::new(1.0, 0.0, 0.0, 0.0);

        let result = rotate_position_about_pivot(position, Vector3::new(5.0, 5.0, 5.0), rotation);

        assert!((result - position).magnitude() < TEST_EPSILON);
    }

    #[test]
    fn test_rotate_position_about_offset_pivot() {
        let position = Vector3::new(2.0, 0.0, 0.0);
        let pivot = Vector3::new(1.0, 0.0, 0.0);
        let rotation = Quaternion::from_angle_z(Deg(90.0));

        let result = rotate_position_about_pivot(position, pivot, rotation);

        assert!((result - Vector3::new(1.0, 1.0, 0.0)).magnitude() < TEST_EPSILON);
    }

    #[test]
    fn test_compose_rotation_applies_new_rotation_last() {
        let current = Quaternion::from_angle_x(Deg(90.0));
        let rotation = Quaternion::from_angle_y(Deg(90.0));

        let composed = compose_rotation(current, rotation);
        let v = composed.rotate_vector(Vector3::unit_y());
        let expected = rotation.rotate_vector(current.rotate_vector(Vector3::unit_y()));

        assert!((v - expected).magnitude() < TEST_EPSILON);
    }

    #[test]
    fn test_axis_angle_safe_zero_axis() {
        let q = quaternion_from_axis_angle_safe(Vector3::new(0.0, 0.0, 0.0), 1.0);
        assert_eq!(q, Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_axis_angle_safe_normalizes_axis() {
        let q = quaternion_from_axis_angle_safe(Vector3::new(0.0, 0.0, 10.0), std::f32::consts::FRAC_PI_2);
        let v = q.rotate_vector(Vector3::unit_x());
        assert!((v - Vector3::unit_y()).magnitude() < TEST_EPSILON);
    }
}
