use crate::control::arm_state::ArmState;
use crate::control::bus::{ArmCommandBus, TORQUE_OFF, TORQUE_ON};
use crate::control::frames::FrameDecomposer;
use crate::types::{
    ArmConfig, AxisCmd, ControlConfig, JointFeedbackChannel, JointVector, JoystickChannel,
    JoystickCommand, Pose, PoseCmd, PresetConfig, ResetCmd, TorqueCmd,
};
use crate::utils::se3;
use eyre::Result;
use nalgebra::Vector3;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Fixed-rate incremental control loop.
///
/// Single-threaded and cooperative: each tick snapshots the joystick
/// command, turns it into one discrete pose or joint edit, and sleeps out
/// the remainder of the period. The joystick and feedback listeners run in
/// external threads and only ever touch the shared channels.
pub struct TeleopLoop<B: ArmCommandBus> {
    control: ControlConfig,
    presets: PresetConfig,
    arm: ArmState<B>,
    frames: FrameDecomposer,
    joystick: JoystickChannel,
    torque_enabled: bool,
    speed_scale: f64,
    gripper_spacing: f64,
    home_translation: Vector3<f64>,
}

impl<B: ArmCommandBus> TeleopLoop<B> {
    pub fn new(
        config: &ArmConfig,
        joystick: JoystickChannel,
        feedback: JointFeedbackChannel,
        bus: B,
    ) -> Result<Self> {
        let arm = ArmState::new(config, feedback, bus)?;
        let frames = FrameDecomposer::from_pose(&arm.committed_pose());
        let (_, home_translation) = se3::trans_to_rp(&arm.kinematics().home_pose());

        Ok(Self {
            control: config.control.clone(),
            presets: config.presets.clone(),
            arm,
            frames,
            joystick,
            torque_enabled: true,
            speed_scale: config.control.speed_scale,
            gripper_spacing: 0.0,
            home_translation,
        })
    }

    /// Drive ticks at the configured rate until `shutdown` is raised.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        let period = Duration::from_secs_f64(1.0 / self.control.tick_rate_hz);
        info!(
            "teleop loop running at {:.0} Hz",
            self.control.tick_rate_hz
        );

        while !shutdown.load(Ordering::Relaxed) {
            let tick_start = Instant::now();
            self.tick()?;
            if let Some(remaining) = period.checked_sub(tick_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }

        info!("teleop loop stopped");
        Ok(())
    }

    /// One control step: snapshot the command and apply it.
    pub fn tick(&mut self) -> Result<()> {
        let cmd = self.joystick.take();
        self.apply(&cmd)
    }

    fn apply(&mut self, cmd: &JoystickCommand) -> Result<()> {
        // Torque toggles are handled before the output gate so a released
        // arm can be re-torqued from the same stick.
        match cmd.torque_cmd {
            TorqueCmd::Enable if !self.torque_enabled => {
                self.arm.bus_mut().publish_torque_command(TORQUE_ON)?;
                self.torque_enabled = true;
                info!("torque output enabled");
            }
            TorqueCmd::Disable if self.torque_enabled => {
                self.arm.bus_mut().publish_torque_command(TORQUE_OFF)?;
                self.torque_enabled = false;
                info!("torque output disabled");
            }
            _ => {}
        }
        if !self.torque_enabled {
            return Ok(());
        }

        if cmd.speed_cmd.is_active() {
            let factor = self.control.speed_scale_factor;
            let scaled = match cmd.speed_cmd {
                AxisCmd::Increase => self.speed_scale * factor,
                _ => self.speed_scale / factor,
            };
            self.speed_scale =
                scaled.clamp(self.control.speed_scale_min, self.control.speed_scale_max);
            debug!("speed scale now {:.2}", self.speed_scale);
        }

        // Gripper spacing bypasses the joint-limit gate entirely.
        if cmd.gripper_cmd.is_active() {
            let next = (self.gripper_spacing + cmd.gripper_cmd.sign() * self.control.gripper_step)
                .clamp(self.control.gripper_min, self.control.gripper_max);
            if next != self.gripper_spacing {
                self.gripper_spacing = next;
                self.arm.bus_mut().publish_gripper_command(next)?;
            }
        }

        if cmd.pose_cmd != PoseCmd::Inactive {
            return self.apply_preset(cmd.pose_cmd);
        }

        if cmd.yaw_cmd.is_active() {
            return self.apply_waist(cmd.yaw_cmd);
        }

        self.apply_end_effector_edit(cmd)
    }

    /// Commit an absolute preset posture and resynchronize the frames.
    fn apply_preset(&mut self, preset: PoseCmd) -> Result<()> {
        let joints = match preset {
            PoseCmd::Home => &self.presets.home,
            PoseCmd::Sleep => &self.presets.sleep,
            PoseCmd::Upright => &self.presets.upright,
            PoseCmd::Inactive => return Ok(()),
        };
        let target = JointVector::from_iterator(joints.iter().copied());

        if self.arm.set_all_joints(&target)? {
            let pose = self.arm.committed_pose();
            self.frames.resync(&pose);
            debug!("preset {:?} committed", preset);
        } else {
            warn!("preset {:?} rejected by joint limits", preset);
        }
        Ok(())
    }

    /// Yaw motion is exclusively the waist joint: nudge it, clamp to its
    /// own limit, and resynchronize the frames around the new heading.
    fn apply_waist(&mut self, yaw_cmd: AxisCmd) -> Result<()> {
        let limit = self.arm.joint_limit(0);
        let target = (self.arm.committed()[0]
            + yaw_cmd.sign() * self.control.waist_step * self.speed_scale)
            .clamp(limit.min_angle, limit.max_angle);

        if self.arm.set_single_joint(0, target)? {
            let pose = self.arm.committed_pose();
            self.frames.resync(&pose);
        }
        Ok(())
    }

    /// Combine position/orientation deltas into one end-effector edit. The
    /// edit is committed wholesale or dropped wholesale: a failed IK solve
    /// leaves `T_yb` exactly as it was.
    fn apply_end_effector_edit(&mut self, cmd: &JoystickCommand) -> Result<()> {
        let any_delta = cmd.has_translation_delta() || cmd.has_orientation_delta();
        if !any_delta && cmd.reset_cmd == ResetCmd::Inactive {
            return Ok(());
        }

        let mut working = self.frames.t_yb();
        self.apply_pose_deltas(cmd, &mut working);

        let target = self.frames.t_sy() * working;
        if self.arm.set_end_effector_pose(&target)? {
            self.frames.commit_incremental(working);
        }
        Ok(())
    }

    /// Edit the working transform in the yaw frame. Pure on everything but
    /// `working`; unit-tested directly.
    fn apply_pose_deltas(&self, cmd: &JoystickCommand, working: &mut Pose) {
        let step = self.control.translate_step * self.speed_scale;

        working[(0, 3)] += cmd.x_cmd.sign() * step;
        // Lateral motion is blocked close to the base column
        if cmd.y_cmd.is_active() && working[(0, 3)] > self.control.lateral_guard_x {
            working[(1, 3)] += cmd.y_cmd.sign() * step;
        }
        working[(2, 3)] += cmd.z_cmd.sign() * step;

        let any_delta = cmd.has_translation_delta() || cmd.has_orientation_delta();

        // Position reset is delta-exclusive
        if cmd.reset_cmd == ResetCmd::Position && !any_delta {
            working[(0, 3)] = self.home_translation[0];
            working[(1, 3)] = self.home_translation[1];
            working[(2, 3)] = self.home_translation[2];
        }

        if cmd.has_orientation_delta() {
            let (rotation, _) = se3::trans_to_rp(working);
            let rpy = se3::rotation_to_rpy(&rotation);
            let rotate_step = self.control.rotate_step * self.speed_scale;
            // Yaw deltas never reach this path; yaw belongs to the waist
            let updated = se3::rpy_to_rotation(
                rpy[0] + cmd.roll_cmd.sign() * rotate_step,
                rpy[1] + cmd.pitch_cmd.sign() * rotate_step,
                rpy[2],
            );
            working.fixed_view_mut::<3, 3>(0, 0).copy_from(&updated);
        }

        if cmd.reset_cmd == ResetCmd::Orientation {
            working[(1, 3)] = 0.0;
            let (rotation, _) = se3::trans_to_rp(working);
            let pitch = se3::rotation_to_rpy(&rotation)[1];
            let flattened = se3::rpy_to_rotation(0.0, pitch, 0.0);
            working.fixed_view_mut::<3, 3>(0, 0).copy_from(&flattened);
        }
    }

    pub fn arm(&self) -> &ArmState<B> {
        &self.arm
    }

    pub fn frames(&self) -> &FrameDecomposer {
        &self.frames
    }

    pub fn speed_scale(&self) -> f64 {
        self.speed_scale
    }

    pub fn gripper_spacing(&self) -> f64 {
        self.gripper_spacing
    }

    pub fn torque_enabled(&self) -> bool {
        self.torque_enabled
    }
}
