//! Billboard modes and the two camera-facing rotation algorithms.

use bitflags::bitflags;
use cgmath::{Matrix4, Vector3, Zero};

use crate::camera::CameraView;
use crate::common::{euler_to_matrix, invert_or_identity, with_translation};

bitflags! {
    /// Axes along which a node turns to face the active camera.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BillboardMode: u8 {
        /// No billboarding
        const NONE = 0b000;
        const X = 0b001;
        const Y = 0b010;
        const Z = 0b100;
        /// Fully face the camera
        const ALL = Self::X.bits() | Self::Y.bits() | Self::Z.bits();
    }
}

impl Default for BillboardMode {
    fn default() -> Self {
        Self::NONE
    }
}

/// Rotation applied between a node's own rotation and its translation so
/// that it faces `camera`.
///
/// `node_position` is the node's position in world space (its local position
/// carried through the parent chain). A full `ALL` mask aligns with the
/// inverse view rotation; any other mask solves each selected axis angle
/// independently. When the camera looks straight at the node both agree.
pub fn billboard_rotation(
    mode: BillboardMode,
    camera: &CameraView,
    node_position: Vector3<f32>,
) -> Matrix4<f32> {
    if mode.contains(BillboardMode::ALL) {
        full_facing_rotation(camera)
    } else {
        partial_axis_rotation(mode, camera.global_position - node_position)
    }
}

/// Per-axis billboard: each selected axis rotates local +Z towards the
/// camera along the node-to-camera offset `to_camera`.
pub fn partial_axis_rotation(mode: BillboardMode, to_camera: Vector3<f32>) -> Matrix4<f32> {
    let mut euler = Vector3::zero();

    if mode.contains(BillboardMode::X) {
        euler.x = (-to_camera.y).atan2(to_camera.z);
    }
    if mode.contains(BillboardMode::Y) {
        euler.y = to_camera.x.atan2(to_camera.z);
    }
    if mode.contains(BillboardMode::Z) {
        euler.z = to_camera.y.atan2(to_camera.x);
    }

    euler_to_matrix(euler)
}

/// Full billboard: the inverse of the view matrix with its translation removed.
pub fn full_facing_rotation(camera: &CameraView) -> Matrix4<f32> {
    let view_rotation = with_translation(&camera.view, Vector3::zero());
    invert_or_identity(&view_rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, InnerSpace, Rad, SquareMatrix};

    fn assert_matrix_close(a: &Matrix4<f32>, b: &Matrix4<f32>) {
        for col in 0..4 {
            for row in 0..4 {
                assert!(
                    (a[col][row] - b[col][row]).abs() < 1e-4,
                    "element [{col}][{row}]: {} != {}",
                    a[col][row],
                    b[col][row]
                );
            }
        }
    }

    fn local_z(rotation: &Matrix4<f32>) -> Vector3<f32> {
        (rotation * Vector3::unit_z().extend(0.0)).truncate()
    }

    #[test]
    fn test_all_is_union_of_axes() {
        assert_eq!(BillboardMode::ALL, BillboardMode::X | BillboardMode::Y | BillboardMode::Z);
        assert!(BillboardMode::default().is_empty());
    }

    #[test]
    fn test_full_facing_matches_camera_rotation() {
        let rotation = Matrix4::from_angle_y(Deg(30.0)) * Matrix4::from_angle_x(Deg(-10.0));
        let world = Matrix4::from_translation(Vector3::new(4.0, 5.0, 6.0)) * rotation;
        let camera = CameraView::from_world_matrix(world);

        assert_matrix_close(&full_facing_rotation(&camera), &rotation);
    }

    #[test]
    fn test_partial_y_turns_towards_camera() {
        let camera = CameraView::from_world_matrix(Matrix4::from_translation(Vector3::new(4.0, 0.0, 0.0)));
        let matrix = billboard_rotation(BillboardMode::Y, &camera, Vector3::zero());

        assert_matrix_close(&matrix, &Matrix4::from_angle_y(Rad(std::f32::consts::FRAC_PI_2)));
        assert!((local_z(&matrix) - Vector3::unit_x()).magnitude() < 1e-4);
    }

    #[test]
    fn test_partial_x_turns_towards_camera_above() {
        let matrix = partial_axis_rotation(BillboardMode::X, Vector3::new(0.0, 3.0, 3.0));
        let expected = Vector3::new(0.0, 1.0, 1.0).normalize();

        assert!((local_z(&matrix) - expected).magnitude() < 1e-4);
    }

    #[test]
    fn test_partial_ignores_unselected_axes() {
        let matrix = partial_axis_rotation(BillboardMode::Z, Vector3::new(0.0, 0.0, 5.0));
        assert_matrix_close(&matrix, &Matrix4::identity());
    }

    #[test]
    fn test_partial_and_full_agree_when_camera_looks_at_node() {
        let cases = [
            (Matrix4::from_translation(Vector3::new(3.0, 0.0, 0.0)), Vector3::new(3.0, 0.0, -10.0)),
            (Matrix4::from_angle_y(Deg(90.0)), Vector3::new(-10.0, 0.0, 0.0)),
        ];

        for (world, node_position) in cases {
            let camera = CameraView::from_world_matrix(world);
            let full = billboard_rotation(BillboardMode::ALL, &camera, node_position);

            for mode in [BillboardMode::Y, BillboardMode::X | BillboardMode::Y] {
                let partial = billboard_rotation(mode, &camera, node_position);
                assert_matrix_close(&partial, &full);
            }
        }
    }

    #[test]
    fn test_partial_and_full_differ_when_camera_looks_away() {
        // Camera at the origin yawed to face -X; the node sits off to its side.
        let world = Matrix4::from_angle_y(Deg(90.0));
        let camera = CameraView::from_world_matrix(world);
        let node_position = Vector3::new(0.0, 0.0, -10.0);

        let full = billboard_rotation(BillboardMode::ALL, &camera, node_position);
        let partial = billboard_rotation(BillboardMode::X | BillboardMode::Y, &camera, node_position);

        // Full mode copies the camera orientation, partial aims at the camera position.
        assert_matrix_close(&full, &world);
        assert!((local_z(&full) - Vector3::unit_x()).magnitude() < 1e-4);
        assert!((local_z(&partial) - Vector3::unit_z()).magnitude() < 1e-4);
    }
}
