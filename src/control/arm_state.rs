use crate::control::bus::ArmCommandBus;
use crate::types::{ArmConfig, JointFeedbackChannel, JointLimit, JointVector, Pose};
use crate::utils::kinematics::KinematicsModel;
use eyre::Result;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Warn-once-per-streak tracking for end-effector IK failures. Warnings
/// fire on the Idle -> Failing edge only; recovery logs on the way back.
#[derive(Debug)]
enum IkStreak {
    Idle,
    Failing { since: Instant },
}

/// Sole gate committing joint vectors to hardware.
///
/// Owns the last-committed joint vector and a per-instance copy of the
/// joint limits. The sensed joint vector arrives asynchronously through the
/// shared feedback channel and is only ever read as a snapshot.
pub struct ArmState<B: ArmCommandBus> {
    committed: JointVector,
    joint_limits: Vec<JointLimit>,
    kinematics: KinematicsModel,
    feedback: JointFeedbackChannel,
    bus: B,
    ik_streak: IkStreak,
}

impl<B: ArmCommandBus> ArmState<B> {
    pub fn new(config: &ArmConfig, feedback: JointFeedbackChannel, bus: B) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            committed: JointVector::zeros(),
            joint_limits: config.joint_limits.clone(),
            kinematics: KinematicsModel::new(config)?,
            feedback,
            bus,
            ik_streak: IkStreak::Idle,
        })
    }

    /// Commit a full joint vector. Succeeds iff every element is within its
    /// limit; on success the vector is published and becomes the committed
    /// state, on failure nothing changes. Every target posture passes
    /// through here.
    pub fn set_all_joints(&mut self, joints: &JointVector) -> Result<bool> {
        for (i, limit) in self.joint_limits.iter().enumerate() {
            if joints[i] < limit.min_angle || joints[i] > limit.max_angle {
                debug!(
                    "joint {} target {:.3} outside limits [{:.3}, {:.3}]; commit rejected",
                    i, joints[i], limit.min_angle, limit.max_angle
                );
                return Ok(false);
            }
        }

        self.bus.publish_joint_command(joints)?;
        self.committed = *joints;
        Ok(true)
    }

    /// Edit one joint of the committed vector. Full-vector validation still
    /// applies, so an isolated edit can be rejected.
    pub fn set_single_joint(&mut self, index: usize, angle: f64) -> Result<bool> {
        let mut joints = self.committed;
        joints[index] = angle;
        self.set_all_joints(&joints)
    }

    /// Solve IK for a target pose, seeded with the sensed joint vector, and
    /// commit the solution. Unreachable targets leave the committed posture
    /// untouched and raise at most one warning per continuous failure
    /// streak.
    pub fn set_end_effector_pose(&mut self, target: &Pose) -> Result<bool> {
        let seed = self.feedback.snapshot();
        match self.kinematics.inverse_kinematics(target, Some(&seed), 6) {
            Some(solution) => {
                let committed = self.set_all_joints(&solution)?;
                if committed {
                    self.note_ik_success();
                } else {
                    self.note_ik_failure();
                }
                Ok(committed)
            }
            None => {
                self.note_ik_failure();
                Ok(false)
            }
        }
    }

    fn note_ik_failure(&mut self) {
        if matches!(self.ik_streak, IkStreak::Idle) {
            warn!("end-effector target unreachable; holding last committed posture");
            self.ik_streak = IkStreak::Failing {
                since: Instant::now(),
            };
        }
    }

    fn note_ik_success(&mut self) {
        if let IkStreak::Failing { since } = self.ik_streak {
            info!(
                "end-effector target reachable again after {:.1}s",
                since.elapsed().as_secs_f64()
            );
            self.ik_streak = IkStreak::Idle;
        }
    }

    pub fn ik_failure_streak_active(&self) -> bool {
        matches!(self.ik_streak, IkStreak::Failing { .. })
    }

    pub fn committed(&self) -> &JointVector {
        &self.committed
    }

    /// Forward kinematics of the committed vector.
    pub fn committed_pose(&self) -> Pose {
        self.kinematics.forward_kinematics(&self.committed)
    }

    pub fn kinematics(&self) -> &KinematicsModel {
        &self.kinematics
    }

    pub fn joint_limit(&self, index: usize) -> &JointLimit {
        &self.joint_limits[index]
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::bus::testing::RecordingBus;

    fn arm() -> ArmState<RecordingBus> {
        ArmState::new(
            &ArmConfig::default(),
            JointFeedbackChannel::new(),
            RecordingBus::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_in_limit_commit_is_exact() {
        let mut arm = arm();
        let target = JointVector::new(0.5, -1.0, 1.2, -2.5, 0.9, 3.0);

        assert!(arm.set_all_joints(&target).unwrap());
        assert_eq!(*arm.committed(), target);
        assert_eq!(arm.bus().joints.len(), 1);
        assert_eq!(arm.bus().joints[0], target);
    }

    #[test]
    fn test_out_of_limit_commit_has_no_side_effect() {
        let mut arm = arm();
        let good = JointVector::new(0.1, 0.2, 0.3, 0.4, 0.5, 0.6);
        assert!(arm.set_all_joints(&good).unwrap());

        let bad = JointVector::new(0.1, 2.5, 0.3, 0.4, 0.5, 0.6);
        assert!(!arm.set_all_joints(&bad).unwrap());

        assert_eq!(*arm.committed(), good);
        assert_eq!(arm.bus().joints.len(), 1);
    }

    #[test]
    fn test_single_joint_edit_validates_full_vector() {
        let mut arm = arm();

        assert!(arm.set_single_joint(1, 1.5).unwrap());
        assert_eq!(arm.committed()[1], 1.5);

        assert!(!arm.set_single_joint(1, 2.5).unwrap());
        assert_eq!(arm.committed()[1], 1.5);
    }

    #[test]
    fn test_set_end_effector_pose_reaches_target() {
        let mut arm = arm();
        let mut target = arm.committed_pose();
        target[(0, 3)] += 0.01;

        assert!(arm.set_end_effector_pose(&target).unwrap());
        let reached = arm.committed_pose();
        assert!((reached[(0, 3)] - target[(0, 3)]).abs() < 5e-3);
        assert!(!arm.ik_failure_streak_active());
    }

    #[test]
    fn test_ik_failure_streak_warns_once_per_streak() {
        let mut arm = arm();
        let before = *arm.committed();

        let mut unreachable = arm.committed_pose();
        unreachable[(0, 3)] = 2.0;

        // Two consecutive failures stay within one streak
        assert!(!arm.set_end_effector_pose(&unreachable).unwrap());
        assert!(arm.ik_failure_streak_active());
        assert!(!arm.set_end_effector_pose(&unreachable).unwrap());
        assert!(arm.ik_failure_streak_active());
        assert_eq!(*arm.committed(), before);
        assert!(arm.bus().joints.is_empty());

        // Recovery closes the streak
        let mut reachable = arm.committed_pose();
        reachable[(0, 3)] += 0.005;
        assert!(arm.set_end_effector_pose(&reachable).unwrap());
        assert!(!arm.ik_failure_streak_active());
    }
}
