// Actuator capabilities handed to the controllers
//
// The motor-controller drivers live outside this process. Controllers only see
// these traits; the runtime backs them with a shared `ActuationFrame` that is
// published once per tick, and tests read the same frame back.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::DriveConfig;
use crate::drive::WheelSpeeds;
use crate::messages::ActuationFrame;

#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("{0} output is unavailable")]
    Unavailable(&'static str),

    #[error("{name} rejected output {value}")]
    Rejected { name: &'static str, value: f64 },
}

/// A single velocity-controlled motor (or group of motors driven together)
pub trait MotorOutput {
    /// Command a normalized speed in [-1, 1]
    fn set(&mut self, output: f64) -> Result<(), ActuatorError>;

    /// Cut power to the motor
    fn stop(&mut self) -> Result<(), ActuatorError>;
}

/// The four drive motors, written together
pub trait WheelOutput {
    fn set_wheels(&mut self, speeds: WheelSpeeds) -> Result<(), ActuatorError>;
}

/// Auxiliary mechanisms that share the actuation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    Shooter,
    Belt,
    Intake,
    Lift,
}

impl Mechanism {
    pub fn name(self) -> &'static str {
        match self {
            Mechanism::Shooter => "shooter",
            Mechanism::Belt => "belt",
            Mechanism::Intake => "intake",
            Mechanism::Lift => "lift",
        }
    }

    fn slot(self, frame: &mut ActuationFrame) -> &mut Option<f64> {
        match self {
            Mechanism::Shooter => &mut frame.shooter,
            Mechanism::Belt => &mut frame.belt,
            Mechanism::Intake => &mut frame.intake,
            Mechanism::Lift => &mut frame.lift,
        }
    }
}

/// Actuation frame shared between the outputs and the publisher
#[derive(Debug, Clone, Default)]
pub struct SharedFrame {
    inner: Arc<Mutex<ActuationFrame>>,
}

impl SharedFrame {
    /// Frame with wheel channels taken from the drive configuration
    pub fn new(drive: &DriveConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ActuationFrame::stopped(&drive.channels))),
        }
    }

    fn lock(&self, name: &'static str) -> Result<MutexGuard<'_, ActuationFrame>, ActuatorError> {
        self.inner.lock().map_err(|_| ActuatorError::Unavailable(name))
    }

    /// Copy of the current outputs
    pub fn snapshot(&self) -> Result<ActuationFrame, ActuatorError> {
        Ok(self.lock("frame")?.clone())
    }

    pub fn wheels(&self) -> FrameWheels {
        FrameWheels { frame: self.clone() }
    }

    pub fn motor(&self, mechanism: Mechanism) -> FrameMotor {
        FrameMotor {
            frame: self.clone(),
            mechanism,
        }
    }
}

/// Drive motors backed by a shared frame
#[derive(Debug, Clone)]
pub struct FrameWheels {
    frame: SharedFrame,
}

impl WheelOutput for FrameWheels {
    fn set_wheels(&mut self, speeds: WheelSpeeds) -> Result<(), ActuatorError> {
        for value in speeds.as_array() {
            if !value.is_finite() {
                return Err(ActuatorError::Rejected { name: "drive", value });
            }
        }
        let mut frame = self.frame.lock("drive")?;
        frame.front_left.output = speeds.front_left;
        frame.front_right.output = speeds.front_right;
        frame.rear_left.output = speeds.rear_left;
        frame.rear_right.output = speeds.rear_right;
        Ok(())
    }
}

/// One mechanism motor backed by a shared frame
#[derive(Debug, Clone)]
pub struct FrameMotor {
    frame: SharedFrame,
    mechanism: Mechanism,
}

impl MotorOutput for FrameMotor {
    fn set(&mut self, output: f64) -> Result<(), ActuatorError> {
        let name = self.mechanism.name();
        if !output.is_finite() {
            return Err(ActuatorError::Rejected { name, value: output });
        }
        let mut frame = self.frame.lock(name)?;
        *self.mechanism.slot(&mut frame) = Some(output.clamp(-1.0, 1.0));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        let mut frame = self.frame.lock(self.mechanism.name())?;
        *self.mechanism.slot(&mut frame) = None;
        Ok(())
    }
}
