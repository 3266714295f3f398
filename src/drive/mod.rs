// Drive module for the mecanum base
//
// Provides:
// - Mecanum inverse kinematics (body command -> wheel speeds)
// - Drivetrain wrapper that applies wheel inversion and writes the outputs

mod drivetrain;
pub mod kinematics;

pub use drivetrain::Drivetrain;
pub use kinematics::{mecanum_mix, WheelSpeeds};
