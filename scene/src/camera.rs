//! Read-only camera state consumed by billboarding and infinite-distance nodes.
//!
//! The active camera is itself a node in the scene; before a node composes
//! its world matrix the scene snapshots the camera into a [`CameraView`].

use cgmath::{Matrix4, Vector3};

use crate::common::{invert_or_identity, translation_of};

/// Snapshot of the active camera's world state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// The camera node's world matrix.
    pub world: Matrix4<f32>,
    /// World-to-camera matrix (inverse of `world`).
    pub view: Matrix4<f32>,
    /// Camera position in world space.
    pub global_position: Vector3<f32>,
}

impl CameraView {
    /// Builds the view from the camera node's world matrix.
    pub fn from_world_matrix(world: Matrix4<f32>) -> Self {
        Self {
            world,
            view: invert_or_identity(&world),
            global_position: translation_of(&world),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, SquareMatrix};

    #[test]
    fn test_view_is_inverse_of_world() {
        let world = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)) * Matrix4::from_angle_y(Deg(40.0));
        let camera = CameraView::from_world_matrix(world);
        let product = camera.view * camera.world;

        for col in 0..4 {
            for row in 0..4 {
                assert!((product[col][row] - Matrix4::<f32>::identity()[col][row]).abs() < 1e-5);
            }
        }
        assert_eq!(camera.global_position, Vector3::new(1.0, 2.0, 3.0));
    }
}
