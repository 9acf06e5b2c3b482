use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3, Zero};

use crate::billboard::{BillboardMode, billboard_rotation};
use crate::cache::{LocalInputs, SyncCache};
use crate::clock::RenderId;
use crate::common::{
    Decomposed, compose_rotation, euler_to_quaternion, invert_or_identity, is_non_uniform,
    quaternion_from_axis_angle_safe, quaternion_to_euler, rotate_position_about_pivot,
    translation_of,
};
use crate::compose::{self, ComposeContext};
use crate::observer::{Observable, ObserverHandle};

/// Unique identifier for a node in the scene.
pub type NodeId = u32;

/// Coordinate space an operation is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// The node's own (parent-relative) space
    Local,
    /// Scene space
    World,
}

/// Transform inputs that can be explicitly invalidated with
/// [`TransformNode::mark_as_dirty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformProperty {
    Position,
    /// Euler rotation was assigned; any rotation quaternion is discarded.
    Rotation,
    Scaling,
    Pivot,
    Parent,
}

/// A node's rotation, held either as Euler angles or as a quaternion.
///
/// While a quaternion is live, Euler assignments accumulate in `pending`
/// and are folded into the quaternion by [`Rotation::reconciled`] before the
/// rotation is used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Yaw/pitch/roll angles in radians (`x` = pitch, `y` = yaw, `z` = roll).
    Euler(Vector3<f32>),
    Quaternion {
        orientation: Quaternion<f32>,
        pending: Vector3<f32>,
    },
}

impl Rotation {
    /// The Euler vector as seen by callers: the angles themselves, or the
    /// not-yet-folded delta when a quaternion is live.
    pub fn euler(&self) -> Vector3<f32> {
        match *self {
            Rotation::Euler(euler) => euler,
            Rotation::Quaternion { pending, .. } => pending,
        }
    }

    pub fn quaternion(&self) -> Option<Quaternion<f32>> {
        match *self {
            Rotation::Euler(_) => None,
            Rotation::Quaternion { orientation, .. } => Some(orientation),
        }
    }

    /// Folds a pending Euler delta into the quaternion (`q * euler(delta)`).
    pub fn reconciled(self) -> Self {
        match self {
            Rotation::Quaternion {
                orientation,
                pending,
            } if !pending.is_zero() => Rotation::Quaternion {
                orientation: orientation * euler_to_quaternion(pending),
                pending: Vector3::zero(),
            },
            other => other,
        }
    }

    /// The authoritative rotation after reconciliation.
    pub fn to_quaternion(&self) -> Quaternion<f32> {
        match self.reconciled() {
            Rotation::Euler(euler) => euler_to_quaternion(euler),
            Rotation::Quaternion { orientation, .. } => orientation,
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::Euler(Vector3::zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pivot {
    matrix: Matrix4<f32>,
    inverse: Matrix4<f32>,
    post_multiply: bool,
}

/// A node in the transform hierarchy.
///
/// Local inputs are mutated through setters; the derived matrices are only
/// refreshed by [`crate::Scene::world_matrix`] and
/// [`crate::Scene::compute_world_matrix`], which know the parent and camera.
#[derive(Debug)]
pub struct TransformNode {
    id: NodeId,
    pub name: String,

    // Local transform components
    position: Vector3<f32>,
    rotation: Rotation,
    scaling: Vector3<f32>,
    scaling_determinant: f32,
    billboard_mode: BillboardMode,
    infinite_distance: bool,
    pivot: Pivot,
    bone_referral: Option<NodeId>,

    // Derived state
    local_world: Matrix4<f32>,
    world_matrix: Matrix4<f32>,
    absolute_position: Vector3<f32>,
    pose_matrix: Option<Matrix4<f32>>,
    non_uniform_scaling: bool,

    // Bookkeeping
    is_dirty: bool,
    current_render_id: Option<RenderId>,
    world_matrix_frozen: bool,
    computations: u64,
    cache: SyncCache,

    after_world_matrix_update: Observable<TransformNode>,
}

impl TransformNode {
    /// Creates a node with identity transform. New nodes start dirty, so the
    /// first world-matrix request always composes.
    pub(crate) fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: Vector3::zero(),
            rotation: Rotation::default(),
            scaling: Vector3::new(1.0, 1.0, 1.0),
            scaling_determinant: 1.0,
            billboard_mode: BillboardMode::NONE,
            infinite_distance: false,
            pivot: Pivot {
                matrix: Matrix4::identity(),
                inverse: Matrix4::identity(),
                post_multiply: false,
            },
            bone_referral: None,
            local_world: Matrix4::identity(),
            world_matrix: Matrix4::identity(),
            absolute_position: Vector3::zero(),
            pose_matrix: None,
            non_uniform_scaling: false,
            is_dirty: true,
            current_render_id: None,
            world_matrix_frozen: false,
            computations: 0,
            cache: SyncCache::default(),
            after_world_matrix_update: Observable::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    // ========== Local Transform ==========

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.invalidate_frame();
    }

    /// The Euler rotation vector. Reads as zero once a quaternion has absorbed it.
    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation.euler()
    }

    /// Assigns Euler angles. With a live quaternion they act as a delta that
    /// is folded into it on the next world-matrix pass.
    pub fn set_rotation(&mut self, rotation: Vector3<f32>) {
        self.rotation = match self.rotation {
            Rotation::Euler(_) => Rotation::Euler(rotation),
            Rotation::Quaternion { orientation, .. } => Rotation::Quaternion {
                orientation,
                pending: rotation,
            },
        };
        self.invalidate_frame();
    }

    pub fn rotation_quaternion(&self) -> Option<Quaternion<f32>> {
        self.rotation.quaternion()
    }

    /// Switches to (or away from) the quaternion representation.
    ///
    /// Assigning a quaternion zeroes the Euler vector. Clearing it keeps
    /// whatever Euler delta was pending as the new Euler rotation.
    pub fn set_rotation_quaternion(&mut self, quaternion: Option<Quaternion<f32>>) {
        self.rotation = match quaternion {
            Some(orientation) => Rotation::Quaternion {
                orientation,
                pending: Vector3::zero(),
            },
            None => Rotation::Euler(self.rotation.euler()),
        };
        self.invalidate_frame();
    }

    pub fn rotation_state(&self) -> Rotation {
        self.rotation
    }

    pub fn scaling(&self) -> Vector3<f32> {
        self.scaling
    }

    pub fn set_scaling(&mut self, scaling: Vector3<f32>) {
        self.scaling = scaling;
        self.invalidate_frame();
    }

    /// Sign applied to all scaling axes; flipped when attached to a mirrored bone.
    pub fn scaling_determinant(&self) -> f32 {
        self.scaling_determinant
    }

    pub fn set_scaling_determinant(&mut self, determinant: f32) {
        self.scaling_determinant = determinant;
        self.mark_as_dirty(TransformProperty::Scaling);
    }

    pub fn billboard_mode(&self) -> BillboardMode {
        self.billboard_mode
    }

    pub fn set_billboard_mode(&mut self, mode: BillboardMode) {
        self.billboard_mode = mode;
        self.invalidate_frame();
    }

    /// Whether this node follows the camera position (skybox style).
    pub fn infinite_distance(&self) -> bool {
        self.infinite_distance
    }

    /// Not part of the sync cache, so any change forces the next pass.
    pub fn set_infinite_distance(&mut self, infinite_distance: bool) {
        self.infinite_distance = infinite_distance;
        self.mark_as_dirty(TransformProperty::Position);
    }

    /// Accumulates a yaw/pitch/roll rotation (`x` = pitch, `y` = yaw, `z` = roll)
    /// in whichever representation is live.
    pub fn add_rotation(&mut self, x: f32, y: f32, z: f32) {
        let accumulation = euler_to_quaternion(Vector3::new(x, y, z));
        self.rotation = match self.rotation.reconciled() {
            Rotation::Euler(euler) => {
                Rotation::Euler(quaternion_to_euler(euler_to_quaternion(euler) * accumulation))
            }
            Rotation::Quaternion { orientation, .. } => Rotation::Quaternion {
                orientation: orientation * accumulation,
                pending: Vector3::zero(),
            },
        };
        self.invalidate_frame();
    }

    /// Rotates the node about `point` (in parent space), turning its
    /// orientation by the same amount. Switches to quaternion representation.
    pub fn rotate_around(&mut self, point: Vector3<f32>, axis: Vector3<f32>, amount: f32) {
        let rotation = quaternion_from_axis_angle_safe(axis, amount);
        let orientation = self.rotation.to_quaternion();

        self.position = rotate_position_about_pivot(self.position, point, rotation);
        self.set_rotation_quaternion(Some(compose_rotation(orientation, rotation)));
    }

    /// Turns the node so its local +Z follows `direction`, plus corrections.
    pub(crate) fn orient_towards(
        &mut self,
        direction: Vector3<f32>,
        yaw_correction: f32,
        pitch_correction: f32,
        roll_correction: f32,
    ) {
        let yaw = direction.x.atan2(direction.z);
        let horizontal = (direction.x * direction.x + direction.z * direction.z).sqrt();
        let pitch = (-direction.y).atan2(horizontal);
        let euler = Vector3::new(pitch + pitch_correction, yaw + yaw_correction, roll_correction);

        match self.rotation {
            Rotation::Quaternion { .. } => {
                self.set_rotation_quaternion(Some(euler_to_quaternion(euler)))
            }
            Rotation::Euler(_) => self.set_rotation(euler),
        }
    }

    /// Converts to quaternion representation if needed and returns the quaternion.
    pub(crate) fn ensure_rotation_quaternion(&mut self) -> Quaternion<f32> {
        let orientation = self.rotation.to_quaternion();
        self.set_rotation_quaternion(Some(orientation));
        orientation
    }

    /// Overwrites the local transform with a decomposed matrix, keeping the
    /// current rotation representation.
    pub(crate) fn set_local_transform(&mut self, decomposed: Decomposed) {
        self.position = decomposed.translation;
        self.scaling = decomposed.scale;
        self.rotation = match self.rotation {
            Rotation::Quaternion { .. } => Rotation::Quaternion {
                orientation: decomposed.rotation,
                pending: Vector3::zero(),
            },
            Rotation::Euler(_) => Rotation::Euler(quaternion_to_euler(decomposed.rotation)),
        };
        self.invalidate_frame();
    }

    // ========== Pivot ==========

    pub fn pivot_matrix(&self) -> Matrix4<f32> {
        self.pivot.matrix
    }

    pub fn post_multiply_pivot_matrix(&self) -> bool {
        self.pivot.post_multiply
    }

    /// Sets the pivot matrix applied before scaling and rotation.
    ///
    /// With `post_multiply`, the pivot's inverse is also applied after parent
    /// composition; a singular pivot then inverts to the identity.
    pub fn set_pivot_matrix(&mut self, matrix: Matrix4<f32>, post_multiply: bool) {
        self.pivot.matrix = matrix;
        self.pivot.post_multiply = post_multiply;

        if post_multiply {
            self.pivot.inverse = match matrix.invert() {
                Some(inverse) => inverse,
                None => {
                    log::warn!("Pivot matrix of node {} is singular; using identity inverse", self.id);
                    Matrix4::identity()
                }
            };
        } else {
            self.pivot.inverse = Matrix4::identity();
        }

        self.cache.pivot_matrix_updated = true;
        self.invalidate_frame();
    }

    /// The local pivot point (negated translation of the pivot matrix).
    pub fn pivot_point(&self) -> Vector3<f32> {
        -translation_of(&self.pivot.matrix)
    }

    // ========== Derived State ==========

    /// Local matrix before parent composition, as of the last world-matrix pass.
    pub fn local_world(&self) -> Matrix4<f32> {
        self.local_world
    }

    /// The world matrix as of the last pass, without recomputing.
    pub fn world_matrix_from_cache(&self) -> Matrix4<f32> {
        self.world_matrix
    }

    /// The world translation as of the last pass, without recomputing.
    pub fn cached_absolute_position(&self) -> Vector3<f32> {
        self.absolute_position
    }

    /// Inverse world matrix at bind time; set on the first pass unless provided.
    pub fn pose_matrix(&self) -> Option<Matrix4<f32>> {
        self.pose_matrix
    }

    pub fn update_pose_matrix(&mut self, matrix: Matrix4<f32>) {
        self.pose_matrix = Some(matrix);
    }

    /// True when this node or any ancestor has non-uniform scaling.
    pub fn non_uniform_scaling(&self) -> bool {
        self.non_uniform_scaling
    }

    pub fn bone_referral(&self) -> Option<NodeId> {
        self.bone_referral
    }

    pub(crate) fn set_bone_referral(&mut self, referral: Option<NodeId>) {
        self.bone_referral = referral;
        self.mark_as_dirty(TransformProperty::Parent);
    }

    // ========== Synchronization ==========

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// The frame this node's world matrix was last computed for.
    pub fn current_render_id(&self) -> Option<RenderId> {
        self.current_render_id
    }

    pub fn is_world_matrix_frozen(&self) -> bool {
        self.world_matrix_frozen
    }

    pub(crate) fn set_world_matrix_frozen(&mut self, frozen: bool) {
        self.world_matrix_frozen = frozen;
    }

    /// Number of world-matrix passes performed so far.
    pub fn computations(&self) -> u64 {
        self.computations
    }

    pub fn sync_cache(&self) -> &SyncCache {
        &self.cache
    }

    /// Forces recomputation on the next request. Marking the rotation dirty
    /// drops the rotation quaternion so the Euler vector becomes authoritative.
    pub fn mark_as_dirty(&mut self, property: TransformProperty) {
        if property == TransformProperty::Rotation {
            self.set_rotation_quaternion(None);
        }
        self.current_render_id = None;
        self.is_dirty = true;
    }

    /// True when the local inputs still match the last pass and nothing
    /// camera-dependent (billboarding, infinite distance) is active.
    ///
    /// Parent changes are checked by [`crate::Scene::is_synchronized`].
    pub fn is_synchronized(&self) -> bool {
        if self.is_dirty {
            return false;
        }

        if self.billboard_mode != self.cache.billboard_mode || !self.billboard_mode.is_empty() {
            return false;
        }

        if self.cache.pivot_matrix_updated || self.infinite_distance {
            return false;
        }

        self.cache.matches(&self.local_inputs())
    }

    pub(crate) fn mark_current(&mut self, render_id: RenderId) {
        self.current_render_id = Some(render_id);
    }

    fn invalidate_frame(&mut self) {
        self.current_render_id = None;
    }

    fn local_inputs(&self) -> LocalInputs {
        LocalInputs {
            position: self.position,
            scaling: self.scaling,
            rotation: self.rotation.euler(),
            rotation_quaternion: self.rotation.quaternion(),
            billboard_mode: self.billboard_mode,
        }
    }

    // ========== Observers ==========

    /// Registers a callback run after every world-matrix pass of this node.
    pub fn register_after_world_matrix_update(
        &mut self,
        callback: impl FnMut(&TransformNode) + 'static,
    ) -> ObserverHandle {
        self.after_world_matrix_update.add(callback)
    }

    pub fn unregister_after_world_matrix_update(&mut self, handle: ObserverHandle) -> bool {
        self.after_world_matrix_update.remove(handle)
    }

    pub(crate) fn clear_observers(&mut self) {
        self.after_world_matrix_update.clear();
    }

    // ========== World Matrix Pass ==========

    /// Recomposes the local and world matrices against `ctx`.
    ///
    /// The caller guarantees the parent (and bone referral) in `ctx` were
    /// computed first.
    pub(crate) fn recompute(&mut self, ctx: &ComposeContext) {
        self.rotation = self.rotation.reconciled();
        self.cache = self
            .cache
            .capture(self.local_inputs(), ctx.parent.map(|parent| parent.stamp));
        self.current_render_id = Some(ctx.render_id);
        self.is_dirty = false;

        let scaling = compose::scaling_matrix(self.scaling, self.scaling_determinant);
        let rotation = Matrix4::from(self.rotation.to_quaternion());
        let translation = compose::translation_matrix(
            self.position,
            self.infinite_distance && ctx.parent.is_none(),
            ctx.camera.as_ref(),
        );

        let mut local = rotation * scaling * self.pivot.matrix;
        if !self.billboard_mode.is_empty() {
            if let Some(camera) = ctx.camera.as_ref() {
                let anchor = compose::billboard_anchor(self.position, ctx.parent.as_ref());
                local = billboard_rotation(self.billboard_mode, camera, anchor) * local;
            }
        }
        self.local_world = translation * local;

        self.world_matrix = compose::attach_to_parent(
            &self.local_world,
            ctx.parent.as_ref(),
            !self.billboard_mode.is_empty(),
        );
        if self.pivot.post_multiply {
            self.world_matrix = self.pivot.inverse * self.world_matrix;
        }

        self.non_uniform_scaling = is_non_uniform(self.scaling)
            || ctx.parent.is_some_and(|parent| parent.non_uniform_scaling);
        self.absolute_position = translation_of(&self.world_matrix);
        self.computations += 1;
        log::trace!("Recomputed world matrix of node {} (frame {})", self.id, ctx.render_id);

        let mut observers = std::mem::take(&mut self.after_world_matrix_update);
        observers.notify(self);
        self.after_world_matrix_update = observers;

        if self.pose_matrix.is_none() {
            self.pose_matrix = Some(invert_or_identity(&self.world_matrix));
        }
    }
}
