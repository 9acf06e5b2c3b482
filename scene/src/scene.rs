use std::collections::{HashMap, HashSet};

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3};

use crate::builder::NodeBuilder;
use crate::cache::DependencyStamp;
use crate::camera::CameraView;
use crate::clock::{RenderClock, RenderId};
use crate::common::{
    decompose, invert_or_identity, quaternion_from_axis_angle_safe, quaternion_to_euler,
    transform_coordinates, transform_normal,
};
use crate::compose::{ComposeContext, ParentFrame};
use crate::error::{Result, SceneError};
use crate::hierarchy::Hierarchy;
use crate::node::{NodeId, Space, TransformNode, TransformProperty};
use crate::tree::{CollectIds, walk_tree};

/// Registry of transform nodes and driver of their world matrices.
///
/// The scene owns every node, the parent/child table, the render-id clock and
/// the active camera. World matrices are computed on demand: asking for a
/// node's matrix first brings its parent (and bone referral) up to date.
#[derive(Debug)]
pub struct Scene {
    nodes: HashMap<NodeId, TransformNode>,
    hierarchy: Hierarchy,
    clock: RenderClock,
    active_camera: Option<NodeId>,
    next_node_id: NodeId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            hierarchy: Hierarchy::new(),
            clock: RenderClock::new(),
            active_camera: None,
            next_node_id: 0,
        }
    }

    // ========== Node API ==========

    /// Adds a node with identity transform.
    ///
    /// # Errors
    /// Returns [`SceneError::NodeNotFound`] if `parent` is `Some` but the
    /// specified node doesn't exist.
    pub fn add_node(&mut self, parent: Option<NodeId>, name: impl Into<String>) -> Result<NodeId> {
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(&parent_id) {
                return Err(SceneError::NodeNotFound(parent_id));
            }
        }

        let id = self.next_node_id;
        self.next_node_id += 1;

        let node = TransformNode::new(id, name);
        log::debug!("Adding node {} ({:?}) under {:?}", id, node.name, parent);
        self.nodes.insert(id, node);
        self.hierarchy.insert(id);
        if parent.is_some() {
            self.hierarchy.link(id, parent)?;
        }
        Ok(id)
    }

    /// Starts building a node with non-default settings.
    pub fn spawn(&mut self, name: impl Into<String>) -> NodeBuilder<'_> {
        NodeBuilder::new(self, name.into())
    }

    /// Gets a reference to a node by ID.
    pub fn get_node(&self, id: NodeId) -> Option<&TransformNode> {
        self.nodes.get(&id)
    }

    /// Gets a mutable reference to a node by ID.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut TransformNode> {
        self.nodes.get_mut(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&TransformNode> {
        self.nodes.get(&id).ok_or(SceneError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut TransformNode> {
        self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))
    }

    // ========== Hierarchy API ==========

    /// Returns a slice of root node IDs.
    pub fn root_nodes(&self) -> &[NodeId] {
        self.hierarchy.roots()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.hierarchy.parent(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.hierarchy.children(id)
    }

    /// Descendants of `id` in pre-order, or only its direct children.
    pub fn descendants(&self, id: NodeId, direct_only: bool) -> Result<Vec<NodeId>> {
        self.node(id)?;

        let mut collect = CollectIds::with_max_depth(direct_only.then_some(1));
        walk_tree(self, id, &mut collect);
        Ok(collect.ids.into_iter().skip(1).collect())
    }

    /// Moves `id` under `parent` (or to the roots) without changing its
    /// world-space pose.
    ///
    /// The node's local position, rotation and scaling are rewritten from
    /// `inverse(parent world) * world`. Shear from a non-uniformly scaled and
    /// rotated parent cannot be represented and is lost.
    ///
    /// # Errors
    /// Returns [`SceneError::CycleDetected`] if `parent` is `id` itself or
    /// depends on it through parents or bone referrals. The hierarchy is left
    /// unchanged.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<()> {
        match parent {
            Some(parent_id) => {
                self.hierarchy.check_link(id, parent_id)?;
                if self.depends_on(parent_id, id) {
                    return Err(SceneError::CycleDetected {
                        node: id,
                        parent: parent_id,
                    });
                }
            }
            None => {
                self.node(id)?;
                if self.hierarchy.parent(id).is_none() {
                    return Ok(());
                }
            }
        }

        let world = self.compute_world_matrix(id, true)?;
        let local = match parent {
            Some(parent_id) => {
                let parent_world = self.compute_world_matrix(parent_id, true)?;
                let inverse = parent_world.invert().unwrap_or_else(|| {
                    log::warn!("World matrix of new parent {} is singular; reparenting {} as if at origin", parent_id, id);
                    Matrix4::identity()
                });
                inverse * world
            }
            None => world,
        };

        self.hierarchy.link(id, parent)?;
        let node = self.node_mut(id)?;
        node.set_local_transform(decompose(&local));
        node.mark_as_dirty(TransformProperty::Parent);
        log::debug!("Reparented node {} under {:?}", id, parent);
        Ok(())
    }

    // ========== Bones ==========

    /// Links `id` under `bone`, composing `affected`'s world matrix after the
    /// bone's. Mirrored bones flip the node's scaling determinant.
    ///
    /// # Errors
    /// Returns [`SceneError::CycleDetected`] if either `bone` or `affected`
    /// depends on `id`.
    pub fn attach_to_bone(&mut self, id: NodeId, bone: NodeId, affected: NodeId) -> Result<()> {
        self.hierarchy.check_link(id, bone)?;
        self.node(affected)?;
        for dependency in [bone, affected] {
            if self.depends_on(dependency, id) {
                return Err(SceneError::CycleDetected {
                    node: id,
                    parent: dependency,
                });
            }
        }

        self.hierarchy.link(id, Some(bone))?;
        let bone_world = self.world_matrix(bone)?;

        let node = self.node_mut(id)?;
        node.set_bone_referral(Some(affected));
        if bone_world.determinant() < 0.0 {
            let determinant = node.scaling_determinant();
            node.set_scaling_determinant(-determinant);
        }
        log::debug!("Attached node {} to bone {} (affecting {})", id, bone, affected);
        Ok(())
    }

    /// Whether computing `id` requires the world matrix of `target`, following
    /// parent links and bone referrals. A node depends on itself.
    fn depends_on(&self, id: NodeId, target: NodeId) -> bool {
        let mut pending = vec![id];
        let mut visited = HashSet::new();

        while let Some(current) = pending.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            pending.extend(self.hierarchy.parent(current));
            if let Some(node) = self.nodes.get(&current) {
                pending.extend(node.bone_referral());
            }
        }
        false
    }

    /// Undoes [`Scene::attach_to_bone`] and moves the node to the roots,
    /// keeping its world pose.
    pub fn detach_from_bone(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.hierarchy.parent(id) else {
            self.node(id)?;
            return Ok(());
        };

        let parent_world = self.world_matrix(parent)?;
        let node = self.node_mut(id)?;
        if parent_world.determinant() < 0.0 {
            let determinant = node.scaling_determinant();
            node.set_scaling_determinant(-determinant);
        }
        node.set_bone_referral(None);
        log::debug!("Detached node {} from bone {}", id, parent);

        self.set_parent(id, None)
    }

    // ========== Frame & Camera ==========

    pub fn render_id(&self) -> RenderId {
        self.clock.render_id()
    }

    /// Starts a new frame. Called once per frame by the render loop.
    pub fn advance_frame(&mut self) -> RenderId {
        let render_id = self.clock.advance();
        log::trace!("Starting frame {}", render_id);
        render_id
    }

    pub fn active_camera(&self) -> Option<NodeId> {
        self.active_camera
    }

    /// Sets the node billboarded and infinite-distance nodes follow.
    pub fn set_active_camera(&mut self, camera: Option<NodeId>) -> Result<()> {
        if let Some(id) = camera {
            self.node(id)?;
        }
        log::debug!("Active camera set to {:?}", camera);
        self.active_camera = camera;
        Ok(())
    }

    // ========== World Matrices ==========

    /// Returns the world matrix for the current frame, computing it first if
    /// it is stale.
    pub fn world_matrix(&mut self, id: NodeId) -> Result<Matrix4<f32>> {
        let node = self.node(id)?;
        if node.is_world_matrix_frozen() {
            return Ok(node.world_matrix_from_cache());
        }

        let parent = self.parent_frame(id)?;
        let node = self.node(id)?;
        let computed_this_frame = node.current_render_id() == Some(self.clock.render_id());
        if computed_this_frame && node.sync_cache().dependencies == parent.map(|p| p.stamp) {
            return Ok(node.world_matrix_from_cache());
        }

        self.compose(id, parent, false)
    }

    /// (Re)computes the world matrix. Without `force`, recomposition is
    /// skipped when the node is synchronized with its inputs and its parent.
    pub fn compute_world_matrix(&mut self, id: NodeId, force: bool) -> Result<Matrix4<f32>> {
        let node = self.node(id)?;
        if node.is_world_matrix_frozen() {
            return Ok(node.world_matrix_from_cache());
        }

        let parent = self.parent_frame(id)?;
        self.compose(id, parent, force)
    }

    /// Brings every node's world matrix up to date, parents first.
    pub fn compute_world_matrices(&mut self) -> Result<()> {
        let mut collect = CollectIds::default();
        for &root in self.hierarchy.roots() {
            walk_tree(self, root, &mut collect);
        }

        for id in collect.ids {
            self.world_matrix(id)?;
        }
        Ok(())
    }

    /// World-space position of the node for the current frame.
    pub fn absolute_position(&mut self, id: NodeId) -> Result<Vector3<f32>> {
        self.world_matrix(id)?;
        Ok(self.node(id)?.cached_absolute_position())
    }

    /// True when neither the node, nor its ancestors, nor its bone referral
    /// have changed since the node was last computed.
    pub fn is_synchronized(&self, id: NodeId) -> Result<bool> {
        let node = self.node(id)?;
        if !node.is_synchronized() || node.sync_cache().dependencies != self.current_stamp(id)? {
            return Ok(false);
        }

        match self.hierarchy.parent(id) {
            Some(parent) => self.is_synchronized(parent),
            None => Ok(true),
        }
    }

    /// Computes the world matrix one last time and stops recomputing it.
    pub fn freeze_world_matrix(&mut self, id: NodeId) -> Result<Matrix4<f32>> {
        self.node_mut(id)?.set_world_matrix_frozen(false);
        let world = self.compute_world_matrix(id, true)?;
        self.node_mut(id)?.set_world_matrix_frozen(true);
        log::debug!("Froze world matrix of node {}", id);
        Ok(world)
    }

    pub fn unfreeze_world_matrix(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        node.set_world_matrix_frozen(false);
        node.mark_as_dirty(TransformProperty::Position);
        log::debug!("Unfroze world matrix of node {}", id);
        Ok(())
    }

    /// Brings the parent and bone referral up to date and snapshots them.
    fn parent_frame(&mut self, id: NodeId) -> Result<Option<ParentFrame>> {
        let Some(parent) = self.hierarchy.parent(id) else {
            return Ok(None);
        };

        let world = self.world_matrix(parent)?;
        let referral = match self.node(id)?.bone_referral() {
            Some(referral) => Some(self.world_matrix(referral)?),
            None => None,
        };

        let Some(stamp) = self.current_stamp(id)? else {
            return Ok(None);
        };
        Ok(Some(ParentFrame {
            world,
            referral,
            non_uniform_scaling: self.node(parent)?.non_uniform_scaling(),
            stamp,
        }))
    }

    /// Recompute counters of the node's parent and referral as they are now.
    fn current_stamp(&self, id: NodeId) -> Result<Option<DependencyStamp>> {
        let Some(parent) = self.hierarchy.parent(id) else {
            return Ok(None);
        };

        let referral = match self.node(id)?.bone_referral() {
            Some(referral) => Some((referral, self.node(referral)?.computations())),
            None => None,
        };

        Ok(Some(DependencyStamp {
            parent,
            parent_computations: self.node(parent)?.computations(),
            referral,
        }))
    }

    fn compose(&mut self, id: NodeId, parent: Option<ParentFrame>, force: bool) -> Result<Matrix4<f32>> {
        let render_id = self.clock.render_id();
        let node = self.node(id)?;

        let synchronized =
            node.is_synchronized() && node.sync_cache().dependencies == parent.map(|p| p.stamp);
        if !force && synchronized {
            let node = self.node_mut(id)?;
            node.mark_current(render_id);
            return Ok(node.world_matrix_from_cache());
        }

        let needs_camera = !node.billboard_mode().is_empty()
            || (node.infinite_distance() && parent.is_none());
        let camera = if needs_camera {
            self.camera_view_for(id)?
        } else {
            None
        };

        let ctx = ComposeContext {
            render_id,
            parent,
            camera,
        };
        let node = self.node_mut(id)?;
        node.recompute(&ctx);
        Ok(node.world_matrix_from_cache())
    }

    /// Snapshot of the active camera as seen by `id`.
    fn camera_view_for(&mut self, id: NodeId) -> Result<Option<CameraView>> {
        let Some(camera) = self.active_camera else {
            return Ok(None);
        };
        if camera == id {
            return Ok(None);
        }

        // A camera that depends on the node cannot be brought up to date first.
        let world = if self.depends_on(camera, id) {
            self.node(camera)?.world_matrix_from_cache()
        } else {
            self.world_matrix(camera)?
        };
        Ok(Some(CameraView::from_world_matrix(world)))
    }

    // ========== Pivot ==========

    /// Pivots the node around `point`, given in local or world space.
    pub fn set_pivot_point(&mut self, id: NodeId, point: Vector3<f32>, space: Space) -> Result<()> {
        if self.clock.render_id() == 0 {
            self.compute_world_matrix(id, true)?;
        }

        let point = match space {
            Space::Local => point,
            Space::World => {
                let world = self.world_matrix(id)?;
                transform_coordinates(point, &invert_or_identity(&world))
            }
        };

        self.node_mut(id)?
            .set_pivot_matrix(Matrix4::from_translation(-point), true);
        Ok(())
    }

    /// The pivot point in world space.
    pub fn absolute_pivot_point(&mut self, id: NodeId) -> Result<Vector3<f32>> {
        let world = self.compute_world_matrix(id, false)?;
        Ok(transform_coordinates(self.node(id)?.pivot_point(), &world))
    }

    // ========== Position ==========

    /// Moves the node so that its world translation becomes `position`.
    pub fn set_absolute_position(&mut self, id: NodeId, position: Vector3<f32>) -> Result<()> {
        let local = match self.hierarchy.parent(id) {
            Some(parent) => {
                let parent_world = self.world_matrix(parent)?;
                transform_coordinates(position, &invert_or_identity(&parent_world))
            }
            None => position,
        };

        self.node_mut(id)?.set_position(local);
        Ok(())
    }

    /// Sets the position from a vector expressed along the node's own axes.
    pub fn set_position_with_local_vector(&mut self, id: NodeId, vector: Vector3<f32>) -> Result<()> {
        self.compute_world_matrix(id, false)?;
        let node = self.node_mut(id)?;
        let position = transform_normal(vector, &node.local_world());
        node.set_position(position);
        Ok(())
    }

    /// The position expressed along the node's own axes.
    pub fn position_expressed_in_local_space(&mut self, id: NodeId) -> Result<Vector3<f32>> {
        self.compute_world_matrix(id, false)?;
        let node = self.node(id)?;
        Ok(transform_normal(node.position(), &invert_or_identity(&node.local_world())))
    }

    /// Moves the node to `vector` carried through its current local matrix.
    pub fn locally_translate(&mut self, id: NodeId, vector: Vector3<f32>) -> Result<()> {
        self.compute_world_matrix(id, true)?;
        let node = self.node_mut(id)?;
        let position = transform_coordinates(vector, &node.local_world());
        node.set_position(position);
        Ok(())
    }

    /// Moves the node by `distance` along `axis`.
    pub fn translate(&mut self, id: NodeId, axis: Vector3<f32>, distance: f32, space: Space) -> Result<()> {
        let displacement = axis * distance;
        match space {
            Space::Local => {
                let local = self.position_expressed_in_local_space(id)?;
                self.set_position_with_local_vector(id, local + displacement)
            }
            Space::World => {
                let position = self.absolute_position(id)?;
                self.set_absolute_position(id, position + displacement)
            }
        }
    }

    // ========== Rotation ==========

    /// Rotates the node by `amount` radians about `axis`.
    ///
    /// In local space the axis is one of the node's own axes; in world space
    /// it is a scene axis. Switches the node to quaternion rotation.
    pub fn rotate(&mut self, id: NodeId, axis: Vector3<f32>, amount: f32, space: Space) -> Result<()> {
        let axis = match (space, self.hierarchy.parent(id)) {
            (Space::World, Some(parent)) => {
                let parent_world = self.world_matrix(parent)?;
                transform_normal(axis, &invert_or_identity(&parent_world))
            }
            _ => axis,
        };
        let rotation = quaternion_from_axis_angle_safe(axis, amount);

        let node = self.node_mut(id)?;
        let orientation = node.ensure_rotation_quaternion();
        let orientation = match space {
            Space::Local => orientation * rotation,
            Space::World => rotation * orientation,
        };
        node.set_rotation_quaternion(Some(orientation));
        Ok(())
    }

    /// Rotates the node about a world-space `point` and `axis`, turning both
    /// its position and its orientation.
    pub fn rotate_around(&mut self, id: NodeId, point: Vector3<f32>, axis: Vector3<f32>, amount: f32) -> Result<()> {
        let (point, axis) = match self.hierarchy.parent(id) {
            Some(parent) => {
                let inverse = invert_or_identity(&self.world_matrix(parent)?);
                (transform_coordinates(point, &inverse), transform_normal(axis, &inverse))
            }
            None => (point, axis),
        };

        self.node_mut(id)?.rotate_around(point, axis, amount);
        Ok(())
    }

    /// Orients the node's local +Z toward `target`, then applies the yaw,
    /// pitch and roll corrections (radians).
    pub fn look_at(
        &mut self,
        id: NodeId,
        target: Vector3<f32>,
        yaw_correction: f32,
        pitch_correction: f32,
        roll_correction: f32,
        space: Space,
    ) -> Result<()> {
        let origin = match space {
            Space::Local => self.node(id)?.position(),
            Space::World => self.absolute_position(id)?,
        };
        let direction = target - origin;
        if direction.magnitude2() == 0.0 {
            return Ok(());
        }

        let parent_rotation = match (space, self.hierarchy.parent(id)) {
            (Space::World, Some(parent)) => Some(decompose(&self.world_matrix(parent)?).rotation),
            _ => None,
        };

        let node = self.node_mut(id)?;
        node.orient_towards(direction, yaw_correction, pitch_correction, roll_correction);

        if let Some(parent_rotation) = parent_rotation {
            let local = parent_rotation.conjugate() * node.rotation_state().to_quaternion();
            if node.rotation_quaternion().is_some() {
                node.set_rotation_quaternion(Some(local));
            } else {
                node.set_rotation(quaternion_to_euler(local));
            }
        }
        Ok(())
    }

    /// `local_axis` expressed in world space.
    pub fn direction(&mut self, id: NodeId, local_axis: Vector3<f32>) -> Result<Vector3<f32>> {
        let world = self.world_matrix(id)?;
        Ok(transform_normal(local_axis, &world))
    }

    // ========== Disposal ==========

    /// Removes a node from the scene.
    ///
    /// With `do_not_recurse`, direct children are moved to the roots keeping
    /// their world pose; otherwise the whole subtree is disposed.
    pub fn dispose(&mut self, id: NodeId, do_not_recurse: bool) -> Result<()> {
        self.node(id)?;

        let disposed = if do_not_recurse {
            for child in self.children(id).to_vec() {
                self.set_parent(child, None)?;
                self.compute_world_matrix(child, true)?;
            }
            vec![id]
        } else {
            let mut collect = CollectIds::default();
            walk_tree(self, id, &mut collect);
            collect.ids
        };

        for &gone in &disposed {
            self.hierarchy.remove(gone);
            if let Some(mut node) = self.nodes.remove(&gone) {
                node.clear_observers();
            }
            if self.active_camera == Some(gone) {
                self.active_camera = None;
            }
        }

        for node in self.nodes.values_mut() {
            if node.bone_referral().is_some_and(|referral| disposed.contains(&referral)) {
                node.set_bone_referral(None);
            }
        }

        log::debug!("Disposed node {} ({} nodes removed)", id, disposed.len());
        Ok(())
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
