//! Matrix helpers used when composing and decomposing node transforms.
//!
//! All matrices are cgmath column-major, column-vector matrices: the
//! translation lives in the `w` column and `A * B` applies `B` first.

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix3, Matrix4, Point3, Quaternion, SquareMatrix, Transform,
    Vector3,
};

use crate::EPSILON;

/// Scale, rotation and translation recovered from an affine matrix.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Decomposed {
    pub scale: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub translation: Vector3<f32>,
}

impl Decomposed {
    /// Recomposes the matrix as `T * R * S`.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// Splits an affine matrix into scale, rotation and translation.
///
/// A negative determinant is expressed as a negative X scale. When any scale
/// axis collapses to zero there is no recoverable rotation and the identity
/// quaternion is returned alongside the (degenerate) scale.
pub fn decompose(matrix: &Matrix4<f32>) -> Decomposed {
    let translation = matrix.w.truncate();

    let x_axis = matrix.x.truncate();
    let y_axis = matrix.y.truncate();
    let z_axis = matrix.z.truncate();

    let mut scale = Vector3::new(x_axis.magnitude(), y_axis.magnitude(), z_axis.magnitude());
    if matrix.determinant() < 0.0 {
        scale.x = -scale.x;
    }

    let rotation = if scale.x.abs() < EPSILON || scale.y.abs() < EPSILON || scale.z.abs() < EPSILON
    {
        Quaternion::new(1.0, 0.0, 0.0, 0.0)
    } else {
        let basis = Matrix3::from_cols(x_axis / scale.x, y_axis / scale.y, z_axis / scale.z);
        Quaternion::from(basis).normalize()
    };

    Decomposed {
        scale,
        rotation,
        translation,
    }
}

/// Inverts a matrix, falling back to the identity when it is singular.
pub fn invert_or_identity(matrix: &Matrix4<f32>) -> Matrix4<f32> {
    matrix.invert().unwrap_or(Matrix4::identity())
}

/// Transforms a point (w = 1) by a matrix, including the perspective divide.
pub fn transform_coordinates(point: Vector3<f32>, matrix: &Matrix4<f32>) -> Vector3<f32> {
    matrix.transform_point(Point3::from_vec(point)).to_vec()
}

/// Transforms a direction (w = 0) by a matrix, ignoring its translation.
pub fn transform_normal(vector: Vector3<f32>, matrix: &Matrix4<f32>) -> Vector3<f32> {
    matrix.transform_vector(vector)
}

/// Returns the translation column of a matrix.
pub fn translation_of(matrix: &Matrix4<f32>) -> Vector3<f32> {
    matrix.w.truncate()
}

/// Returns a copy of `matrix` with its translation column replaced.
pub fn with_translation(matrix: &Matrix4<f32>, translation: Vector3<f32>) -> Matrix4<f32> {
    let mut result = *matrix;
    result.w = translation.extend(1.0);
    result
}

/// True when the absolute scale factors differ between axes.
pub fn is_non_uniform(scale: Vector3<f32>) -> bool {
    let (x, y, z) = (scale.x.abs(), scale.y.abs(), scale.z.abs());
    (x - y).abs() > EPSILON || (y - z).abs() > EPSILON || (x - z).abs() > EPSILON
}
