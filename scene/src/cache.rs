//! Per-node synchronization cache.
//!
//! The cache holds the inputs the world matrix was last computed from. A node
//! can skip recomputation while its current inputs still match.

use cgmath::{Quaternion, Vector3, Zero};

use crate::billboard::BillboardMode;
use crate::node::NodeId;

/// Recompute counters of the nodes a world matrix was composed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DependencyStamp {
    pub parent: NodeId,
    pub parent_computations: u64,
    pub referral: Option<(NodeId, u64)>,
}

/// The local inputs that feed a world matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LocalInputs {
    pub position: Vector3<f32>,
    pub scaling: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub rotation_quaternion: Option<Quaternion<f32>>,
    pub billboard_mode: BillboardMode,
}

/// Snapshot of a node's transform inputs as of its last world-matrix pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncCache {
    pub position: Vector3<f32>,
    pub scaling: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub rotation_quaternion: Option<Quaternion<f32>>,
    pub billboard_mode: BillboardMode,
    /// Set by pivot changes, cleared by the next world-matrix pass.
    pub pivot_matrix_updated: bool,
    /// Whether the last pass saw changed local inputs, as opposed to only a
    /// moved parent.
    pub local_matrix_updated: bool,
    pub(crate) dependencies: Option<DependencyStamp>,
}

impl Default for SyncCache {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            scaling: Vector3::zero(),
            rotation: Vector3::zero(),
            rotation_quaternion: None,
            billboard_mode: BillboardMode::NONE,
            pivot_matrix_updated: false,
            local_matrix_updated: false,
            dependencies: None,
        }
    }
}

impl SyncCache {
    /// True when `inputs` equal the snapshot exactly.
    pub(crate) fn matches(&self, inputs: &LocalInputs) -> bool {
        self.position == inputs.position
            && self.scaling == inputs.scaling
            && self.rotation == inputs.rotation
            && self.rotation_quaternion == inputs.rotation_quaternion
            && self.billboard_mode == inputs.billboard_mode
    }

    /// Returns the snapshot replacing this one at the start of a world-matrix pass.
    pub(crate) fn capture(&self, inputs: LocalInputs, dependencies: Option<DependencyStamp>) -> Self {
        Self {
            position: inputs.position,
            scaling: inputs.scaling,
            rotation: inputs.rotation,
            rotation_quaternion: inputs.rotation_quaternion,
            billboard_mode: inputs.billboard_mode,
            pivot_matrix_updated: false,
            local_matrix_updated: self.pivot_matrix_updated || !self.matches(&inputs),
            dependencies,
        }
    }
}
