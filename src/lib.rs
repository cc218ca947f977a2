//! # Arm Teleop Library
//!
//! Core of a joystick teleoperation stack for a 6-DOF robotic arm.
//! Discrete joystick deltas become limit-validated joint commands through
//! inverse kinematics and a yaw-decoupled control frame, so "forward" on the
//! stick means forward relative to wherever the arm is currently pointing.
//!
//! Transport (message bus, topic wiring) and raw joystick decoding live in
//! external nodes; they talk to this crate through the [`ArmCommandBus`]
//! trait and the shared [`JoystickChannel`] / [`JointFeedbackChannel`]
//! handles.

pub mod control;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use control::*;
pub use types::*;
pub use utils::*;
