use crate::types::Pose;
use crate::utils::se3;

/// Yaw-decoupled control frames derived from the committed end-effector
/// pose `T_sb`.
///
/// `T_sy` carries only the yaw of the committed pose; `T_yb` is the residual
/// pose relative to that yaw frame. Joystick deltas are always expressed
/// against `T_yb`, so "move +x" means forward relative to the arm's current
/// heading no matter how far the waist has rotated.
#[derive(Debug, Clone)]
pub struct FrameDecomposer {
    t_sy: Pose,
    t_yb: Pose,
}

impl FrameDecomposer {
    pub fn from_pose(t_sb: &Pose) -> Self {
        let mut frames = Self {
            t_sy: Pose::identity(),
            t_yb: Pose::identity(),
        };
        frames.resync(t_sb);
        frames
    }

    /// Recompute both frames from a committed pose. Required after any
    /// committed change that was not an incremental edit of `T_yb` itself
    /// (presets, waist-only moves).
    pub fn resync(&mut self, t_sb: &Pose) {
        let (rotation, _) = se3::trans_to_rp(t_sb);
        let yaw = se3::rotation_to_rpy(&rotation)[2];

        self.t_sy = se3::rp_to_trans(
            &se3::rpy_to_rotation(0.0, 0.0, yaw),
            &nalgebra::Vector3::zeros(),
        );
        self.t_yb = se3::trans_inv(&self.t_sy) * t_sb;
    }

    /// Adopt a working transform that was committed through an incremental
    /// end-effector edit.
    pub fn commit_incremental(&mut self, t_yb: Pose) {
        self.t_yb = t_yb;
    }

    pub fn t_sy(&self) -> Pose {
        self.t_sy
    }

    pub fn t_yb(&self) -> Pose {
        self.t_yb
    }

    /// `T_sy · T_yb`, which always reproduces the committed pose.
    pub fn recompose(&self) -> Pose {
        self.t_sy * self.t_yb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::se3::{rotation_to_rpy, rp_to_trans, rpy_to_rotation, trans_to_rp};
    use nalgebra::Vector3;

    fn pose(roll: f64, pitch: f64, yaw: f64, p: [f64; 3]) -> Pose {
        rp_to_trans(&rpy_to_rotation(roll, pitch, yaw), &Vector3::new(p[0], p[1], p[2]))
    }

    #[test]
    fn test_decompose_recompose_round_trip() {
        let t_sb = pose(0.2, -0.4, 0.9, [0.3, -0.1, 0.25]);
        let frames = FrameDecomposer::from_pose(&t_sb);

        assert!((frames.recompose() - t_sb).abs().max() < 1e-12);
    }

    #[test]
    fn test_t_sy_is_yaw_only() {
        let t_sb = pose(0.3, 0.2, 0.7, [0.4, 0.0, 0.3]);
        let frames = FrameDecomposer::from_pose(&t_sb);

        let (r_sy, p_sy) = trans_to_rp(&frames.t_sy());
        let rpy = rotation_to_rpy(&r_sy);
        assert!(rpy[0].abs() < 1e-12);
        assert!(rpy[1].abs() < 1e-12);
        assert!((rpy[2] - 0.7).abs() < 1e-9);
        assert!(p_sy.norm() < 1e-12);
    }

    #[test]
    fn test_t_yb_has_no_yaw() {
        let t_sb = pose(0.1, -0.3, 1.2, [0.35, 0.05, 0.2]);
        let frames = FrameDecomposer::from_pose(&t_sb);

        let (r_yb, _) = trans_to_rp(&frames.t_yb());
        assert!(rotation_to_rpy(&r_yb)[2].abs() < 1e-9);
    }

    #[test]
    fn test_identity_pose() {
        let frames = FrameDecomposer::from_pose(&Pose::identity());
        assert!((frames.t_sy() - Pose::identity()).abs().max() < 1e-12);
        assert!((frames.t_yb() - Pose::identity()).abs().max() < 1e-12);
    }
}
