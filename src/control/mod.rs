// Controllers run by the mode dispatcher
//
// - auton: timed instruction sequencer
// - teleop: gamepad mapping with response curve and modifiers
// - vision: target steering, ranging and search
// - shooter: spin-up and feed sequence

pub mod auton;
pub mod shooter;
pub mod teleop;
pub mod vision;

pub use auton::{Sequencer, SequencerState};
pub use shooter::{FireOutput, FireState, ShooterController};
pub use teleop::{AssistRequest, AuxCommands, LiftCommand, TeleopMapper, TeleopOutput};
pub use vision::VisionController;
