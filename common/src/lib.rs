//! Math primitives shared by the transform graph.
//!
//! Everything here is a pure function over small `Copy` cgmath types, so the
//! per-frame composition path never needs heap allocation or shared scratch
//! storage.

pub mod matrix_ops;
pub mod rotation;
pub mod transform_ops;

pub use matrix_ops::{
    Decomposed, decompose, invert_or_identity, is_non_uniform, transform_coordinates,
    transform_normal, translation_of, with_translation,
};
pub use rotation::{euler_to_matrix, euler_to_quaternion, quaternion_to_euler};
pub use transform_ops::{compose_rotation, quaternion_from_axis_angle_safe, rotate_position_about_pivot};

/// Tolerance used for floating-point comparisons throughout the workspace.
pub const EPSILON: f32 = 1e-5;
