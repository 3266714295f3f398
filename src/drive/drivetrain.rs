// Drivetrain for the mecanum base
//
// Combines the kinematics with per-wheel inversion and hands the result to the
// injected wheel output.

use tracing::{debug, info};

use super::kinematics::{mecanum_mix, WheelSpeeds};
use crate::actuator::{ActuatorError, WheelOutput};
use crate::config::DriveConfig;
use crate::messages::{clamp_unit, VelocityCommand};

pub struct Drivetrain<W> {
    output: W,
    inverted: [bool; 4], // [front_left, front_right, rear_left, rear_right]
}

impl<W: WheelOutput> Drivetrain<W> {
    pub fn new(output: W, config: &DriveConfig) -> Self {
        Self {
            output,
            inverted: config.inverted.as_array(),
        }
    }

    /// Drive with a body command
    ///
    /// # Arguments
    /// * `forward` - positive = toward the front of the robot
    /// * `strafe` - positive = to the right
    /// * `rotate` - positive = counter-clockwise
    ///
    /// Each input is clamped to [-1, 1] before mixing.
    pub fn drive(&mut self, forward: f64, strafe: f64, rotate: f64) -> Result<(), ActuatorError> {
        let wheels = mecanum_mix(clamp_unit(forward), clamp_unit(strafe), clamp_unit(rotate));
        self.set_wheel_speeds(wheels)
    }

    pub fn drive_command(&mut self, cmd: &VelocityCommand) -> Result<(), ActuatorError> {
        self.drive(cmd.forward, cmd.strafe, cmd.rotate)
    }

    /// Send wheel speeds, applying the configured inversion
    pub fn set_wheel_speeds(&mut self, speeds: WheelSpeeds) -> Result<(), ActuatorError> {
        let mut out = speeds.as_array();
        for (speed, &inverted) in out.iter_mut().zip(&self.inverted) {
            if inverted {
                *speed = -*speed;
            }
        }
        let out = WheelSpeeds::from_array(out);

        debug!(
            "Setting wheel speeds: fl={:.3}, fr={:.3}, rl={:.3}, rr={:.3}",
            out.front_left, out.front_right, out.rear_left, out.rear_right
        );
        self.output.set_wheels(out)
    }

    /// Stop all wheels
    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        info!("Stopping drivetrain");
        self.output.set_wheels(WheelSpeeds::zero())
    }
}
