pub mod kinematics;
pub mod se3;
pub mod tracing;

pub use kinematics::*;
pub use se3::*;
pub use self::tracing::init_tracing;
