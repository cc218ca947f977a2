use crate::types::{ArmConfig, JointLimit, JointVector, Pose};
use crate::utils::se3;
use eyre::Result;
use nalgebra::{DMatrix, DVector, Matrix6, Vector6};
use std::f64::consts::TAU;
use tracing::{debug, warn};

/// Residual tolerance on both the angular and linear error norms.
const IK_TOLERANCE: f64 = 1e-3;
/// Newton iteration cap per guess; guarantees termination.
const IK_MAX_ITERATIONS: usize = 20;
/// Singular values below this are dropped by the pseudo-inverse.
const PINV_EPSILON: f64 = 1e-8;

/// Product-of-exponentials kinematics over a fixed 6-joint chain.
///
/// The screw axes and home pose are set at construction and never mutated.
/// Joint limits are carried so the solver can resolve periodic aliasing
/// before handing a solution to the commit gate.
pub struct KinematicsModel {
    screw_axes: Matrix6<f64>,
    home_pose: Pose,
    joint_limits: Vec<JointLimit>,
}

enum SolveOutcome {
    Converged(JointVector),
    OutOfLimit,
    Diverged,
}

impl KinematicsModel {
    pub fn new(config: &ArmConfig) -> Result<Self> {
        eyre::ensure!(
            config.kinematics.screw_axes.len() == 6 && config.joint_limits.len() == 6,
            "kinematic chain must describe exactly 6 joints"
        );

        let mut screw_axes = Matrix6::zeros();
        for (i, axis) in config.kinematics.screw_axes.iter().enumerate() {
            screw_axes.set_column(i, &Vector6::from_column_slice(axis));
        }

        let [roll, pitch, yaw] = config.kinematics.home_orientation_rpy;
        let rotation = se3::rpy_to_rotation(roll, pitch, yaw);
        let position = nalgebra::Vector3::from_column_slice(&config.kinematics.home_position);

        Ok(Self {
            screw_axes,
            home_pose: se3::rp_to_trans(&rotation, &position),
            joint_limits: config.joint_limits.clone(),
        })
    }

    /// End-effector pose for a joint vector, in the space frame.
    pub fn forward_kinematics(&self, joints: &JointVector) -> Pose {
        let mut t = self.home_pose;
        for i in (0..6).rev() {
            let twist: Vector6<f64> = self.screw_axes.column(i) * joints[i];
            t = se3::exp6(&twist) * t;
        }
        t
    }

    /// Space-frame Jacobian at a joint vector.
    pub fn space_jacobian(&self, joints: &JointVector) -> Matrix6<f64> {
        let mut jacobian = self.screw_axes;
        let mut t = Pose::identity();
        for i in 1..6 {
            let twist: Vector6<f64> = self.screw_axes.column(i - 1) * joints[i - 1];
            t *= se3::exp6(&twist);
            let column: Vector6<f64> = se3::adjoint(&t) * self.screw_axes.column(i);
            jacobian.set_column(i, &column);
        }
        jacobian
    }

    /// Numeric inverse kinematics with limit-aware guess fallback.
    ///
    /// The target is tried against an ordered guess list: the caller's seed
    /// (if any), then three fixed defaults chosen to escape the common elbow
    /// singularity local minima. The first guess whose solution converges
    /// and lands within joint limits (after ±2π aliasing correction) wins.
    /// `dof < 6` restricts the solve to the joint-vector prefix; trailing
    /// joints stay at the guess values.
    pub fn inverse_kinematics(
        &self,
        target: &Pose,
        seed: Option<&JointVector>,
        dof: usize,
    ) -> Option<JointVector> {
        let dof = dof.clamp(1, 6);

        let mut guesses: Vec<(JointVector, bool)> = Vec::with_capacity(4);
        if let Some(seed) = seed {
            guesses.push((*seed, true));
        }
        guesses.push((JointVector::zeros(), false));
        // 120 degrees either way on the shoulder
        for shoulder in [-TAU / 3.0, TAU / 3.0] {
            let mut guess = JointVector::zeros();
            guess[1] = shoulder;
            guesses.push((guess, false));
        }

        for (guess, is_seed) in guesses {
            match self.solve_from(&guess, target, dof) {
                SolveOutcome::Converged(solution) => return Some(solution),
                SolveOutcome::OutOfLimit => {
                    if is_seed {
                        warn!(
                            "seeded IK solution violates joint limits; \
                             falling back to default guesses"
                        );
                    }
                }
                SolveOutcome::Diverged => {
                    debug!("IK guess did not converge within {IK_MAX_ITERATIONS} iterations");
                }
            }
        }

        None
    }

    /// Newton iteration from one guess, followed by wrap-around correction.
    fn solve_from(&self, guess: &JointVector, target: &Pose, dof: usize) -> SolveOutcome {
        let mut joints = *guess;
        let mut converged = false;

        for iteration in 0..=IK_MAX_ITERATIONS {
            let t_sb = self.forward_kinematics(&joints);
            let error: Vector6<f64> =
                se3::adjoint(&t_sb) * se3::log6(&(se3::trans_inv(&t_sb) * target));

            let angular = error.fixed_rows::<3>(0).norm();
            let linear = error.fixed_rows::<3>(3).norm();
            if angular < IK_TOLERANCE && linear < IK_TOLERANCE {
                converged = true;
                break;
            }
            if iteration == IK_MAX_ITERATIONS {
                break;
            }

            let full = self.space_jacobian(&joints);
            let jacobian = DMatrix::from_fn(6, dof, |r, c| full[(r, c)]);
            let Ok(pinv) = jacobian.pseudo_inverse(PINV_EPSILON) else {
                return SolveOutcome::Diverged;
            };
            let step = pinv * DVector::from_column_slice(error.as_slice());
            for i in 0..dof {
                joints[i] += step[i];
            }
        }

        if !converged {
            return SolveOutcome::Diverged;
        }

        // Wrap into (-2pi, 2pi), then resolve periodic aliasing with a
        // single +-2pi shift. A joint that still lands outside its limit
        // invalidates the whole solution.
        for i in 0..dof {
            let mut angle = joints[i] % TAU;
            let limit = &self.joint_limits[i];
            if angle > limit.max_angle {
                angle -= TAU;
            } else if angle < limit.min_angle {
                angle += TAU;
            }
            if angle < limit.min_angle || angle > limit.max_angle {
                return SolveOutcome::OutOfLimit;
            }
            joints[i] = angle;
        }

        SolveOutcome::Converged(joints)
    }

    pub fn home_pose(&self) -> Pose {
        self.home_pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> KinematicsModel {
        KinematicsModel::new(&ArmConfig::default()).unwrap()
    }

    fn max_abs_diff(a: &Pose, b: &Pose) -> f64 {
        (a - b).abs().max()
    }

    #[test]
    fn test_fk_at_zero_is_home_pose() {
        let model = model();
        let pose = model.forward_kinematics(&JointVector::zeros());

        assert!(max_abs_diff(&pose, &model.home_pose()) < 1e-12);
        assert!((pose[(0, 3)] - 0.40).abs() < 1e-12);
        assert!((pose[(2, 3)] - 0.36).abs() < 1e-12);
    }

    #[test]
    fn test_fk_waist_rotation() {
        let model = model();
        let mut joints = JointVector::zeros();
        joints[0] = 0.5;
        let pose = model.forward_kinematics(&joints);

        // Waist yaw swings the whole home pose around z
        assert!((pose[(0, 3)] - 0.40 * 0.5f64.cos()).abs() < 1e-12);
        assert!((pose[(1, 3)] - 0.40 * 0.5f64.sin()).abs() < 1e-12);
        assert!((pose[(2, 3)] - 0.36).abs() < 1e-12);
    }

    #[test]
    fn test_fk_ik_round_trip() {
        let model = model();
        let joints = JointVector::new(0.2, 0.3, -0.3, 0.1, 0.4, -0.2);
        let target = model.forward_kinematics(&joints);

        let solution = model.inverse_kinematics(&target, None, 6).unwrap();
        let reached = model.forward_kinematics(&solution);

        assert!(max_abs_diff(&reached, &target) < 1e-2);
        for i in 0..6 {
            let limit = &model.joint_limits[i];
            assert!(solution[i] >= limit.min_angle && solution[i] <= limit.max_angle);
        }
    }

    #[test]
    fn test_guess_fallback_yields_in_limit_solution() {
        let model = model();
        let joints = JointVector::new(0.2, 0.3, -0.3, 0.1, 0.4, -0.2);
        let target = model.forward_kinematics(&joints);

        // A pathological seed must not poison the solve; the default
        // guesses still find an in-limit solution.
        let seed = JointVector::from_element(3.0);
        let solution = model.inverse_kinematics(&target, Some(&seed), 6).unwrap();

        for i in 0..6 {
            let limit = &model.joint_limits[i];
            assert!(solution[i] >= limit.min_angle && solution[i] <= limit.max_angle);
        }
        let reached = model.forward_kinematics(&solution);
        assert!(max_abs_diff(&reached, &target) < 1e-2);
    }

    #[test]
    fn test_ik_prefix_solve_leaves_trailing_joints() {
        let model = model();
        let joints = JointVector::new(0.3, 0.2, -0.3, 0.1, 0.0, 0.0);
        let target = model.forward_kinematics(&joints);

        let seed = JointVector::new(0.25, 0.15, -0.25, 0.05, 0.0, 0.0);
        let solution = model.inverse_kinematics(&target, Some(&seed), 4).unwrap();

        assert_eq!(solution[4], 0.0);
        assert_eq!(solution[5], 0.0);
        let reached = model.forward_kinematics(&solution);
        assert!(max_abs_diff(&reached, &target) < 1e-2);
    }

    #[test]
    fn test_unreachable_target_returns_none() {
        let model = model();
        let mut target = model.home_pose();
        target[(0, 3)] = 2.0; // far past the reach envelope

        assert!(model.inverse_kinematics(&target, None, 6).is_none());
    }
}
