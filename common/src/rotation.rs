//! Conversions between yaw/pitch/roll Euler angles and quaternions.
//!
//! Euler vectors are stored as `(pitch, yaw, roll)` in `(x, y, z)`: pitch
//! rotates about X, yaw about Y and roll about Z. A vector is rotated by roll
//! first, then pitch, then yaw, so the equivalent matrix is `Ry * Rx * Rz`.

use cgmath::{InnerSpace, Matrix3, Matrix4, Quaternion, Rad, Rotation3, Vector3};

use crate::EPSILON;

/// Builds the quaternion for an Euler vector (`x` = pitch, `y` = yaw, `z` = roll).
pub fn euler_to_quaternion(euler: Vector3<f32>) -> Quaternion<f32> {
    Quaternion::from_angle_y(Rad(euler.y))
        * Quaternion::from_angle_x(Rad(euler.x))
        * Quaternion::from_angle_z(Rad(euler.z))
}

/// Builds the rotation matrix for an Euler vector.
pub fn euler_to_matrix(euler: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_angle_y(Rad(euler.y))
        * Matrix4::from_angle_x(Rad(euler.x))
        * Matrix4::from_angle_z(Rad(euler.z))
}

/// Extracts the Euler vector of a rotation; the inverse of [`euler_to_quaternion`].
///
/// Near gimbal lock (pitch of ±90°) the roll is folded into the yaw and
/// reported as zero. A degenerate (zero-length) quaternion yields zero angles.
pub fn quaternion_to_euler(rotation: Quaternion<f32>) -> Vector3<f32> {
    if rotation.magnitude2() < EPSILON {
        return Vector3::new(0.0, 0.0, 0.0);
    }

    // cgmath indexes matrices as m[column][row].
    let m = Matrix3::from(rotation.normalize());
    let sin_pitch = (-m[2][1]).clamp(-1.0, 1.0);
    let pitch = sin_pitch.asin();

    if sin_pitch.abs() < 1.0 - 1e-6 {
        let yaw = m[2][0].atan2(m[2][2]);
        let roll = m[0][1].atan2(m[1][1]);
        Vector3::new(pitch, yaw, roll)
    } else {
        let yaw = (-m[0][2]).atan2(m[0][0]);
        Vector3::new(pitch, yaw, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation};

    const TEST_EPSILON: f32 = 1e-4;

    fn assert_vec_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!(
            (a - b).magnitude() < TEST_EPSILON,
            "expected {:?}, got {:?}",
            b,
            a
        );
    }

    #[test]
    fn test_zero_euler_is_identity() {
        let q = euler_to_quaternion(Vector3::new(0.0, 0.0, 0.0));
        assert!((q.s - 1.0).abs() < EPSILON);
        assert!(q.v.magnitude() < EPSILON);
    }

    #[test]
    fn test_yaw_turns_forward_toward_x() {
        let q = euler_to_quaternion(Vector3::new(0.0, Rad::from(Deg(90.0)).0, 0.0));
        let forward = q.rotate_vector(Vector3::unit_z());
        assert_vec_close(forward, Vector3::unit_x());
    }

    #[test]
    fn test_roll_is_applied_before_pitch_and_yaw() {
        let euler = Vector3::new(0.3, -0.7, 1.1);
        let q = euler_to_quaternion(euler);
        let v = Vector3::new(1.0, 2.0, 3.0);

        let manual = Quaternion::from_angle_y(Rad(euler.y)).rotate_vector(
            Quaternion::from_angle_x(Rad(euler.x))
                .rotate_vector(Quaternion::from_angle_z(Rad(euler.z)).rotate_vector(v)),
        );
        assert_vec_close(q.rotate_vector(v), manual);
    }

    #[test]
    fn test_matrix_matches_quaternion() {
        let euler = Vector3::new(-0.4, 2.0, 0.25);
        let from_matrix = euler_to_matrix(euler) * Vector3::new(0.5, -1.0, 2.0).extend(0.0);
        let from_quaternion = euler_to_quaternion(euler).rotate_vector(Vector3::new(0.5, -1.0, 2.0));
        assert_vec_close(from_matrix.truncate(), from_quaternion);
    }

    #[test]
    fn test_quaternion_to_euler_recovers_angles() {
        let euler = Vector3::new(0.5, -1.2, 0.8);
        let recovered = quaternion_to_euler(euler_to_quaternion(euler));
        assert_vec_close(recovered, euler);
    }

    #[test]
    fn test_quaternion_to_euler_gimbal_lock_keeps_rotation() {
        let euler = Vector3::new(std::f32::consts::FRAC_PI_2, 0.4, 0.3);
        let original = euler_to_quaternion(euler);
        let recovered = euler_to_quaternion(quaternion_to_euler(original));

        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_vec_close(recovered.rotate_vector(v), original.rotate_vector(v));
    }

    #[test]
    fn test_degenerate_quaternion_gives_zero_angles() {
        let recovered = quaternion_to_euler(Quaternion::new(0.0, 0.0, 0.0, 0.0));
        assert_vec_close(recovered, Vector3::new(0.0, 0.0, 0.0));
    }
}
