//! Allocation-free pieces of world-matrix composition.
//!
//! Everything a node needs from the outside world (parent matrices, camera,
//! frame id) is gathered by the scene into a [`ComposeContext`] passed by
//! value, so composition works purely on stack-local `Copy` matrices.

use cgmath::{Matrix4, Vector3};

use crate::cache::DependencyStamp;
use crate::camera::CameraView;
use crate::clock::RenderId;
use crate::common::{transform_coordinates, translation_of, with_translation};

/// The already-computed state of a node's parent.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParentFrame {
    pub world: Matrix4<f32>,
    /// World matrix of the bone referral, if the node is attached to a bone.
    pub referral: Option<Matrix4<f32>>,
    pub non_uniform_scaling: bool,
    pub stamp: DependencyStamp,
}

impl ParentFrame {
    /// The matrix children are composed against: the parent's world matrix,
    /// followed by the bone referral's when present.
    pub fn combined(&self) -> Matrix4<f32> {
        match self.referral {
            Some(referral) => referral * self.world,
            None => self.world,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ComposeContext {
    pub render_id: RenderId,
    pub parent: Option<ParentFrame>,
    pub camera: Option<CameraView>,
}

/// Scaling matrix with the determinant sign applied to every axis.
pub(crate) fn scaling_matrix(scaling: Vector3<f32>, determinant: f32) -> Matrix4<f32> {
    let s = scaling * determinant;
    Matrix4::from_nonuniform_scale(s.x, s.y, s.z)
}

/// Translation by `position`, offset by the camera position for
/// infinite-distance nodes.
pub(crate) fn translation_matrix(
    position: Vector3<f32>,
    follows_camera: bool,
    camera: Option<&CameraView>,
) -> Matrix4<f32> {
    match camera {
        Some(camera) if follows_camera => Matrix4::from_translation(position + camera.global_position),
        _ => Matrix4::from_translation(position),
    }
}

/// World-space anchor used by per-axis billboarding.
pub(crate) fn billboard_anchor(position: Vector3<f32>, parent: Option<&ParentFrame>) -> Vector3<f32> {
    match parent {
        Some(parent) => transform_coordinates(position, &parent.combined()),
        None => position,
    }
}

/// Combines a node's local world matrix with its parent.
///
/// Billboarded nodes only carry their translation through the parent, so the
/// camera-aligned axes are not rotated again.
pub(crate) fn attach_to_parent(
    local_world: &Matrix4<f32>,
    parent: Option<&ParentFrame>,
    billboarding: bool,
) -> Matrix4<f32> {
    let Some(parent) = parent else {
        return *local_world;
    };

    let combined = parent.combined();
    if billboarding {
        let translation = transform_coordinates(translation_of(local_world), &combined);
        with_translation(local_world, translation)
    } else {
        combined * local_world
    }
}
