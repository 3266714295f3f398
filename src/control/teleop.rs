// Operator gamepad -> drive command and mechanism commands

use crate::config::TeleopConfig;
use crate::messages::{GamepadState, VelocityCommand};

/// Lift request from the directional pad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftCommand {
    Raise,
    Lower,
    Stop,
}

impl LiftCommand {
    /// Dpad up raises, dpad down lowers, anything else (including diagonals) stops
    pub fn from_pov(pov: i32) -> Self {
        match pov {
            0 => LiftCommand::Raise,
            180 => LiftCommand::Lower,
            _ => LiftCommand::Stop,
        }
    }
}

/// Mechanism requests for one tick, kept apart from the drive command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxCommands {
    /// Intake output, 0 when released
    pub intake: f64,
    /// Manual belt request; `None` leaves the belt to the firing sequence
    pub belt: Option<f64>,
    pub lift: LiftCommand,
}

/// Which assisted-driving controls are held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssistRequest {
    pub aim: bool,
    pub range: bool,
}

impl AssistRequest {
    pub fn any(&self) -> bool {
        self.aim || self.range
    }
}

/// Everything the operator asked for on one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleopOutput {
    pub drive: VelocityCommand,
    pub aux: AuxCommands,
    pub assist: AssistRequest,
    /// Right trigger reading, consumed by the firing sequence
    pub fire_trigger: f64,
}

/// Maps the operator gamepad to commands
///
/// Button layout: A intake, X belt, B aim, Y range, left bumper reverse,
/// right bumper boost, right trigger fire, dpad lift.
pub struct TeleopMapper {
    config: TeleopConfig,
}

impl TeleopMapper {
    pub fn new(config: TeleopConfig) -> Self {
        Self { config }
    }

    pub fn map(&self, pad: &GamepadState) -> TeleopOutput {
        let cfg = &self.config;

        // Reverse drives the robot "facing the other way"
        let reverse = if pad.left_bumper { -1.0 } else { 1.0 };
        let speed = if pad.right_bumper {
            cfg.boost_speed
        } else {
            cfg.translation_speed
        };

        // Stick y reads negative when pushed forward; right stick right = clockwise
        let forward = cfg.curve.apply(-axis(pad.left_y)) * speed;
        let strafe = cfg.curve.apply(axis(pad.left_x)) * speed;
        let rotate = cfg.curve.apply(-axis(pad.right_x)) * cfg.rotate_sensitivity;

        let drive = VelocityCommand::new(forward * reverse, strafe * reverse, rotate * reverse);

        let intake = if pad.a {
            cfg.intake_speed * reverse
        } else {
            0.0
        };
        let aux = AuxCommands {
            intake,
            belt: pad.x.then_some(cfg.belt_speed * reverse),
            lift: LiftCommand::from_pov(pad.pov),
        };

        TeleopOutput {
            drive,
            aux,
            assist: AssistRequest {
                aim: pad.b,
                range: pad.y,
            },
            fire_trigger: trigger(pad.right_trigger),
        }
    }
}

// Sanitize a stick reading from the driver
fn axis(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn trigger(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
