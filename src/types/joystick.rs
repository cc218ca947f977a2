use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Tri-state axis request: nudge up, nudge down, or leave alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisCmd {
    Increase,
    Decrease,
    #[default]
    Neutral,
}

impl AxisCmd {
    /// Signed direction of the request (+1, -1, or 0).
    pub fn sign(self) -> f64 {
        match self {
            AxisCmd::Increase => 1.0,
            AxisCmd::Decrease => -1.0,
            AxisCmd::Neutral => 0.0,
        }
    }

    pub fn is_active(self) -> bool {
        self != AxisCmd::Neutral
    }
}

/// Torque output toggle request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TorqueCmd {
    Enable,
    Disable,
    #[default]
    Neutral,
}

/// One-shot preset posture request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseCmd {
    Home,
    Sleep,
    Upright,
    #[default]
    Inactive,
}

/// One-shot reset request for the working transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetCmd {
    Position,
    Orientation,
    #[default]
    Inactive,
}

/// Decoded joystick snapshot, produced by the external input node and
/// consumed read-only by the control loop once per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoystickCommand {
    pub x_cmd: AxisCmd,
    pub y_cmd: AxisCmd,
    pub z_cmd: AxisCmd,
    pub roll_cmd: AxisCmd,
    pub pitch_cmd: AxisCmd,
    pub yaw_cmd: AxisCmd,
    pub gripper_cmd: AxisCmd,
    pub speed_cmd: AxisCmd,
    pub torque_cmd: TorqueCmd,
    pub pose_cmd: PoseCmd,
    pub reset_cmd: ResetCmd,
}

impl JoystickCommand {
    /// True if any translation delta is requested this snapshot.
    pub fn has_translation_delta(&self) -> bool {
        self.x_cmd.is_active() || self.y_cmd.is_active() || self.z_cmd.is_active()
    }

    /// True if any roll/pitch delta is requested this snapshot.
    pub fn has_orientation_delta(&self) -> bool {
        self.roll_cmd.is_active() || self.pitch_cmd.is_active()
    }
}

/// Shared handle between the joystick listener and the control loop.
///
/// The listener replaces the whole record with `store`; the loop copies it
/// out with `take`. The lock is scoped strictly to the copy so neither side
/// ever holds it across a publish call, and the loop can never observe a
/// torn record.
#[derive(Clone, Default)]
pub struct JoystickChannel {
    inner: Arc<Mutex<JoystickCommand>>,
}

impl JoystickChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot (called by the input listener).
    pub fn store(&self, cmd: JoystickCommand) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        *guard = cmd;
    }

    /// Copy the snapshot out and clear the one-shot preset/reset codes so
    /// they fire on exactly one tick.
    pub fn take(&self) -> JoystickCommand {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let snapshot = guard.clone();
        guard.pose_cmd = PoseCmd::Inactive;
        guard.reset_cmd = ResetCmd::Inactive;
        guard.torque_cmd = TorqueCmd::Neutral;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_one_shot_codes() {
        let channel = JoystickChannel::new();
        channel.store(JoystickCommand {
            x_cmd: AxisCmd::Increase,
            pose_cmd: PoseCmd::Home,
            reset_cmd: ResetCmd::Orientation,
            torque_cmd: TorqueCmd::Enable,
            ..Default::default()
        });

        let first = channel.take();
        assert_eq!(first.pose_cmd, PoseCmd::Home);
        assert_eq!(first.reset_cmd, ResetCmd::Orientation);
        assert_eq!(first.torque_cmd, TorqueCmd::Enable);

        // Held axis commands persist, one-shots do not
        let second = channel.take();
        assert_eq!(second.x_cmd, AxisCmd::Increase);
        assert_eq!(second.pose_cmd, PoseCmd::Inactive);
        assert_eq!(second.reset_cmd, ResetCmd::Inactive);
        assert_eq!(second.torque_cmd, TorqueCmd::Neutral);
    }

    #[test]
    fn test_command_serialization_round_trip() {
        let cmd = JoystickCommand {
            z_cmd: AxisCmd::Decrease,
            gripper_cmd: AxisCmd::Increase,
            pose_cmd: PoseCmd::Sleep,
            ..Default::default()
        };

        let bytes = serde_json::to_vec(&cmd).unwrap();
        let decoded: JoystickCommand = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(cmd, decoded);
    }
}
