//! SE(3) primitives for product-of-exponentials kinematics.
//!
//! Twists are 6-vectors ordered `[wx, wy, wz, vx, vy, vz]` (angular part
//! first), matching the screw-axis layout in the arm configuration.

use nalgebra::{Matrix3, Matrix4, Matrix6, Vector3, Vector6};
use std::f64::consts::PI;

/// Threshold below which a scalar is treated as zero.
pub fn near_zero(z: f64) -> bool {
    z.abs() < 1e-6
}

/// Skew-symmetric (so3) matrix of a 3-vector.
pub fn vec_to_so3(omg: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -omg[2], omg[1], //
        omg[2], 0.0, -omg[0], //
        -omg[1], omg[0], 0.0,
    )
}

/// 3-vector of a skew-symmetric matrix.
pub fn so3_to_vec(so3mat: &Matrix3<f64>) -> Vector3<f64> {
    Vector3::new(so3mat[(2, 1)], so3mat[(0, 2)], so3mat[(1, 0)])
}

/// Assemble a homogeneous transform from rotation and translation.
pub fn rp_to_trans(r: &Matrix3<f64>, p: &Vector3<f64>) -> Matrix4<f64> {
    let mut t = Matrix4::identity();
    t.fixed_view_mut::<3, 3>(0, 0).copy_from(r);
    t.fixed_view_mut::<3, 1>(0, 3).copy_from(p);
    t
}

/// Split a homogeneous transform into rotation and translation.
pub fn trans_to_rp(t: &Matrix4<f64>) -> (Matrix3<f64>, Vector3<f64>) {
    let r = t.fixed_view::<3, 3>(0, 0).into_owned();
    let p = Vector3::new(t[(0, 3)], t[(1, 3)], t[(2, 3)]);
    (r, p)
}

/// Inverse of a homogeneous transform, exploiting the SE(3) structure.
pub fn trans_inv(t: &Matrix4<f64>) -> Matrix4<f64> {
    let (r, p) = trans_to_rp(t);
    let rt = r.transpose();
    rp_to_trans(&rt, &(-(rt * p)))
}

/// Adjoint representation of a homogeneous transform.
pub fn adjoint(t: &Matrix4<f64>) -> Matrix6<f64> {
    let (r, p) = trans_to_rp(t);
    let mut ad = Matrix6::zeros();
    ad.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    ad.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
    ad.fixed_view_mut::<3, 3>(3, 0).copy_from(&(vec_to_so3(&p) * r));
    ad
}

/// Rotation-matrix exponential of a skew-symmetric matrix (Rodrigues).
pub fn matrix_exp3(so3mat: &Matrix3<f64>) -> Matrix3<f64> {
    let omgtheta = so3_to_vec(so3mat);
    let theta = omgtheta.norm();
    if near_zero(theta) {
        return Matrix3::identity();
    }
    let omgmat = vec_to_so3(&(omgtheta / theta));
    Matrix3::identity() + theta.sin() * omgmat + (1.0 - theta.cos()) * (omgmat * omgmat)
}

/// Matrix logarithm of a rotation matrix.
pub fn matrix_log3(r: &Matrix3<f64>) -> Matrix3<f64> {
    let acosinput = ((r.trace() - 1.0) / 2.0).clamp(-1.0, 1.0);
    if acosinput >= 1.0 {
        Matrix3::zeros()
    } else if acosinput <= -1.0 {
        // Rotation by pi; pick any axis column with a usable denominator.
        let omg = if !near_zero(1.0 + r[(2, 2)]) {
            (1.0 / (2.0 * (1.0 + r[(2, 2)]).sqrt()))
                * Vector3::new(r[(0, 2)], r[(1, 2)], 1.0 + r[(2, 2)])
        } else if !near_zero(1.0 + r[(1, 1)]) {
            (1.0 / (2.0 * (1.0 + r[(1, 1)]).sqrt()))
                * Vector3::new(r[(0, 1)], 1.0 + r[(1, 1)], r[(2, 1)])
        } else {
            (1.0 / (2.0 * (1.0 + r[(0, 0)]).sqrt()))
                * Vector3::new(1.0 + r[(0, 0)], r[(1, 0)], r[(2, 0)])
        };
        vec_to_so3(&(PI * omg))
    } else {
        let theta = acosinput.acos();
        (theta / (2.0 * theta.sin())) * (r - r.transpose())
    }
}

/// SE(3) exponential of a twist `[w, v]`.
pub fn exp6(twist: &Vector6<f64>) -> Matrix4<f64> {
    let omg = Vector3::new(twist[0], twist[1], twist[2]);
    let v = Vector3::new(twist[3], twist[4], twist[5]);
    let theta = omg.norm();
    if near_zero(theta) {
        return rp_to_trans(&Matrix3::identity(), &v);
    }
    let omgmat = vec_to_so3(&(omg / theta));
    let r = matrix_exp3(&vec_to_so3(&omg));
    let g = Matrix3::identity() * theta
        + (1.0 - theta.cos()) * omgmat
        + (theta - theta.sin()) * (omgmat * omgmat);
    rp_to_trans(&r, &(g * (v / theta)))
}

/// Twist `[w, v]` whose SE(3) exponential is the given transform.
pub fn log6(t: &Matrix4<f64>) -> Vector6<f64> {
    let (r, p) = trans_to_rp(t);
    let omgmat = matrix_log3(&r);
    if omgmat == Matrix3::zeros() {
        return Vector6::new(0.0, 0.0, 0.0, p[0], p[1], p[2]);
    }
    let theta = ((r.trace() - 1.0) / 2.0).clamp(-1.0, 1.0).acos();
    let g_inv = Matrix3::identity() - omgmat / 2.0
        + (1.0 / theta - 1.0 / (theta / 2.0).tan() / 2.0) * (omgmat * omgmat) / theta;
    let v = g_inv * p;
    let omg = so3_to_vec(&omgmat);
    Vector6::new(omg[0], omg[1], omg[2], v[0], v[1], v[2])
}

/// Roll/pitch/yaw of a rotation matrix (R = Rz(yaw)·Ry(pitch)·Rx(roll)).
pub fn rotation_to_rpy(rotation: &Matrix3<f64>) -> Vector3<f64> {
    let sy = (rotation[(0, 0)].powi(2) + rotation[(1, 0)].powi(2)).sqrt();

    let singular = sy < 1e-6;

    let (roll, pitch, yaw) = if !singular {
        (
            rotation[(2, 1)].atan2(rotation[(2, 2)]),
            (-rotation[(2, 0)]).atan2(sy),
            rotation[(1, 0)].atan2(rotation[(0, 0)]),
        )
    } else {
        (
            (-rotation[(1, 2)]).atan2(rotation[(1, 1)]),
            (-rotation[(2, 0)]).atan2(sy),
            0.0,
        )
    };

    Vector3::new(roll, pitch, yaw)
}

/// Rotation matrix from roll/pitch/yaw (R = Rz(yaw)·Ry(pitch)·Rx(roll)).
pub fn rpy_to_rotation(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();
    Matrix3::new(
        cy * cp,
        cy * sp * sr - sy * cr,
        cy * sp * cr + sy * sr,
        sy * cp,
        sy * sp * sr + cy * cr,
        sy * sp * cr - cy * sr,
        -sp,
        cp * sr,
        cp * cr,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exp3_log3_round_trip() {
        let omg = Vector3::new(0.3, -0.7, 0.5);
        let r = matrix_exp3(&vec_to_so3(&omg));
        let recovered = so3_to_vec(&matrix_log3(&r));

        assert!((recovered - omg).norm() < 1e-9);
    }

    #[test]
    fn test_exp6_log6_round_trip() {
        let twist = Vector6::new(0.2, -0.4, 0.6, 0.1, 0.3, -0.2);
        let t = exp6(&twist);
        let recovered = log6(&t);

        assert!((recovered - twist).norm() < 1e-9);
    }

    #[test]
    fn test_trans_inv() {
        let twist = Vector6::new(0.5, 0.1, -0.3, 1.0, -2.0, 0.5);
        let t = exp6(&twist);
        let product = t * trans_inv(&t);

        assert!((product - Matrix4::identity()).abs().max() < 1e-12);
    }

    #[test]
    fn test_rpy_round_trip() {
        let r = rpy_to_rotation(0.3, -0.5, 1.1);
        let rpy = rotation_to_rpy(&r);

        assert!((rpy[0] - 0.3).abs() < 1e-9);
        assert!((rpy[1] + 0.5).abs() < 1e-9);
        assert!((rpy[2] - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_adjoint_of_identity() {
        let ad = adjoint(&Matrix4::identity());
        assert!((ad - Matrix6::identity()).abs().max() < 1e-12);
    }
}
