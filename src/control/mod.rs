pub mod arm_state;
pub mod bus;
pub mod frames;
pub mod teleop;

pub use arm_state::*;
pub use bus::*;
pub use frames::*;
pub use teleop::*;
