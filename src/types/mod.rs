pub mod config;
pub mod joint_state;
pub mod joystick;

pub use config::*;
pub use joint_state::*;
pub use joystick::*;

/// Ordered joint angles in radians, index 0..5 <-> physical joints 1..6.
pub type JointVector = nalgebra::Vector6<f64>;

/// Homogeneous transform (3x3 rotation, 3x1 translation) of the end-effector
/// frame relative to the base.
pub type Pose = nalgebra::Matrix4<f64>;
