use cgmath::{Matrix4, Quaternion, Vector3};

use crate::billboard::BillboardMode;
use crate::error::Result;
use crate::node::NodeId;
use crate::scene::Scene;

/// Builder for nodes that need more than the identity transform.
///
/// Obtained from [`Scene::spawn`]. Unset fields keep the defaults of
/// [`Scene::add_node`].
///
/// # Example
///
/// ```
/// use cgmath::Vector3;
/// use transform_graph::{BillboardMode, Scene};
///
/// let mut scene = Scene::new();
/// let root = scene.add_node(None, "root").unwrap();
/// let sprite = scene
///     .spawn("sprite")
///     .with_parent(root)
///     .with_position(Vector3::new(0.0, 2.0, 0.0))
///     .with_billboard_mode(BillboardMode::Y)
///     .build()
///     .unwrap();
///
/// assert_eq!(scene.parent(sprite), Some(root));
/// ```
#[must_use = "call build() to add the node"]
pub struct NodeBuilder<'a> {
    scene: &'a mut Scene,
    name: String,
    parent: Option<NodeId>,
    position: Option<Vector3<f32>>,
    rotation: Option<Vector3<f32>>,
    rotation_quaternion: Option<Quaternion<f32>>,
    scaling: Option<Vector3<f32>>,
    billboard_mode: BillboardMode,
    infinite_distance: bool,
    pivot: Option<(Matrix4<f32>, bool)>,
}

impl<'a> NodeBuilder<'a> {
    pub(crate) fn new(scene: &'a mut Scene, name: String) -> Self {
        Self {
            scene,
            name,
            parent: None,
            position: None,
            rotation: None,
            rotation_quaternion: None,
            scaling: None,
            billboard_mode: BillboardMode::NONE,
            infinite_distance: false,
            pivot: None,
        }
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.position = Some(position);
        self
    }

    /// Euler rotation in radians (`x` = pitch, `y` = yaw, `z` = roll).
    pub fn with_rotation(mut self, rotation: Vector3<f32>) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Quaternion rotation. Takes precedence over [`NodeBuilder::with_rotation`].
    pub fn with_rotation_quaternion(mut self, rotation: Quaternion<f32>) -> Self {
        self.rotation_quaternion = Some(rotation);
        self
    }

    pub fn with_scaling(mut self, scaling: Vector3<f32>) -> Self {
        self.scaling = Some(scaling);
        self
    }

    pub fn with_billboard_mode(mut self, mode: BillboardMode) -> Self {
        self.billboard_mode = mode;
        self
    }

    pub fn with_infinite_distance(mut self, infinite_distance: bool) -> Self {
        self.infinite_distance = infinite_distance;
        self
    }

    pub fn with_pivot_matrix(mut self, matrix: Matrix4<f32>, post_multiply: bool) -> Self {
        self.pivot = Some((matrix, post_multiply));
        self
    }

    /// Adds the node to the scene.
    ///
    /// # Errors
    /// Returns [`crate::SceneError::NodeNotFound`] if the parent doesn't exist.
    pub fn build(self) -> Result<NodeId> {
        let id = self.scene.add_node(self.parent, self.name)?;
        let node = self.scene.node_mut(id)?;

        if let Some(position) = self.position {
            node.set_position(position);
        }
        if let Some(rotation) = self.rotation {
            node.set_rotation(rotation);
        }
        if let Some(rotation) = self.rotation_quaternion {
            node.set_rotation_quaternion(Some(rotation));
        }
        if let Some(scaling) = self.scaling {
            node.set_scaling(scaling);
        }
        if let Some((matrix, post_multiply)) = self.pivot {
            node.set_pivot_matrix(matrix, post_multiply);
        }
        node.set_billboard_mode(self.billboard_mode);
        node.set_infinite_distance(self.infinite_distance);

        Ok(id)
    }
}
