use crate::types::JointVector;
use eyre::Result;

/// Torque-channel token for enabled actuators.
pub const TORQUE_ON: &str = "open";
/// Torque-channel token for released actuators.
pub const TORQUE_OFF: &str = "off";

/// Outgoing command channels, implemented by the external transport node.
///
/// The core publishes a joint command on every committed joint vector, a
/// gripper command on every spacing change, and a torque token on toggles.
/// Publish failures are the only fallible edge of the core and propagate
/// to the loop driver.
pub trait ArmCommandBus {
    fn publish_joint_command(&mut self, joints: &JointVector) -> Result<()>;
    fn publish_gripper_command(&mut self, spacing: f64) -> Result<()>;
    fn publish_torque_command(&mut self, token: &str) -> Result<()>;
}

/// Bus that discards everything; useful for dry runs and solver benches.
#[derive(Debug, Default)]
pub struct NullBus;

impl ArmCommandBus for NullBus {
    fn publish_joint_command(&mut self, _joints: &JointVector) -> Result<()> {
        Ok(())
    }

    fn publish_gripper_command(&mut self, _spacing: f64) -> Result<()> {
        Ok(())
    }

    fn publish_torque_command(&mut self, _token: &str) -> Result<()> {
        Ok(())
    }
}
