// Loop timing, bus topics and the robot's tuning parameters
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Gamepad watchdog: fall back to a neutral pad when input goes quiet
pub const INPUT_TIMEOUT: Duration = Duration::from_millis(250);

// Vision watchdog: a target sample older than this reads as "no target"
pub const VISION_TIMEOUT: Duration = Duration::from_millis(500);

// Zenoh topics
pub const TOPIC_PHASE: &str = "robot/ctl/phase"; // field control
pub const TOPIC_GAMEPAD_PREFIX: &str = "robot/input/gamepad"; // + "/<port>"
pub const TOPIC_VISION: &str = "limelight/targets"; // vision appliance
pub const TOPIC_ACTUATION: &str = "robot/rt/actuation"; // to the driver layer
pub const TOPIC_HEALTH: &str = "robot/state/health";
pub const TOPIC_DASHBOARD: &str = "robot/dashboard/limelight";

/// Key expression for the gamepad on the given driver-station port
pub fn gamepad_topic(port: u8) -> String {
    format!("{}/{}", TOPIC_GAMEPAD_PREFIX, port)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Wheel channel {0} is assigned more than once")]
    DuplicateChannel(u8),
}

/// Complete tuning for the robot, fixed at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RobotConfig {
    /// Driver-station port of the operator gamepad
    pub controller_port: u8,
    pub drive: DriveConfig,
    pub teleop: TeleopConfig,
    pub vision: VisionConfig,
    pub shooter: ShooterConfig,
    pub auton: AutonConfig,
}

impl RobotConfig {
    /// Load from a TOML file; sections or keys left out keep their defaults
    ///
    /// The one required key is `duration` on each autonomous instruction.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controllers cannot run with
    ///
    /// Autonomous instructions are deliberately not checked here: a bad step is
    /// clamped or skipped by the sequencer instead of stopping the robot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let channels = self.drive.channels.as_array();
        for (i, ch) in channels.iter().enumerate() {
            if channels[..i].contains(ch) {
                return Err(ConfigError::DuplicateChannel(*ch));
            }
        }

        unit("teleop.rotate_sensitivity", self.teleop.rotate_sensitivity)?;
        unit("teleop.translation_speed", self.teleop.translation_speed)?;
        unit("teleop.boost_speed", self.teleop.boost_speed)?;
        unit("teleop.intake_speed", self.teleop.intake_speed)?;
        unit("teleop.belt_speed", self.teleop.belt_speed)?;
        unit("teleop.lift_speed", self.teleop.lift_speed)?;

        finite("vision.kp", self.vision.kp)?;
        finite("vision.kp_distance", self.vision.kp_distance)?;
        unit("vision.min_command", self.vision.min_command)?;
        unit("vision.search_speed", self.vision.search_speed)?;
        non_negative("vision.deadband", self.vision.deadband)?;

        unit("shooter.trigger_threshold", self.shooter.trigger_threshold)?;
        unit("shooter.shooter_speed", self.shooter.shooter_speed)?;
        unit("shooter.feed_speed", self.shooter.feed_speed)?;
        positive("shooter.spinup_time", self.shooter.spinup_time)?;
        non_negative("shooter.feed_delay", self.shooter.feed_delay)?;

        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} is not a finite number", value),
        })
    }
}

fn unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} is outside [0, 1]", value),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} is negative", value),
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} must be greater than zero", value),
        })
    }
}

/// Wheel inversion, in [front_left, front_right, rear_left, rear_right] order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WheelInversion {
    pub front_left: bool,
    pub front_right: bool,
    pub rear_left: bool,
    pub rear_right: bool,
}

impl Default for WheelInversion {
    // Right side motors are mounted mirrored
    fn default() -> Self {
        Self {
            front_left: false,
            front_right: true,
            rear_left: false,
            rear_right: true,
        }
    }
}

impl WheelInversion {
    pub fn as_array(&self) -> [bool; 4] {
        [self.front_left, self.front_right, self.rear_left, self.rear_right]
    }
}

/// Motor controller channel for each wheel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WheelChannels {
    pub front_left: u8,
    pub front_right: u8,
    pub rear_left: u8,
    pub rear_right: u8,
}

impl Default for WheelChannels {
    fn default() -> Self {
        Self {
            front_left: 4,
            front_right: 2,
            rear_left: 3,
            rear_right: 1,
        }
    }
}

impl WheelChannels {
    pub fn as_array(&self) -> [u8; 4] {
        [self.front_left, self.front_right, self.rear_left, self.rear_right]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriveConfig {
    pub inverted: WheelInversion,
    pub channels: WheelChannels,
}

/// Shaping applied to the raw stick value
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCurve {
    Linear,
    /// f(v) = v³: fine control near center, full range at the edges
    #[default]
    Cubic,
}

impl ResponseCurve {
    pub fn apply(self, v: f64) -> f64 {
        match self {
            ResponseCurve::Linear => v,
            ResponseCurve::Cubic => v * v * v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TeleopConfig {
    pub curve: ResponseCurve,
    /// Cap on rotation speed, applied after the curve
    pub rotate_sensitivity: f64,
    /// Translation scale with the boost button released
    pub translation_speed: f64,
    /// Translation scale while boost is held (rotation is never boosted)
    pub boost_speed: f64,
    pub intake_speed: f64,
    /// Manual belt speed (X button)
    pub belt_speed: f64,
    pub lift_speed: f64,
}

impl Default for TeleopConfig {
    fn default() -> Self {
        Self {
            curve: ResponseCurve::Cubic,
            rotate_sensitivity: 0.5,
            translation_speed: 0.5,
            boost_speed: 1.0,
            intake_speed: 0.3,
            belt_speed: 0.5,
            lift_speed: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisionConfig {
    /// Proportional steering gain, per degree of heading error
    pub kp: f64,
    /// Floor added to the steering command outside the deadband
    pub min_command: f64,
    /// Horizontal offset (degrees) treated as on target
    pub deadband: f64,
    /// Rotation used to sweep for a target that is not in view
    pub search_speed: f64,
    /// Range-closing gain, per degree of vertical offset
    pub kp_distance: f64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            kp: 0.1,
            min_command: 0.05,
            deadband: 1.0,
            search_speed: 0.2,
            kp_distance: -0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShooterConfig {
    /// Trigger reading above which the sequence is armed
    pub trigger_threshold: f64,
    /// Seconds to ramp the shooter from rest to full speed
    pub spinup_time: f64,
    /// Seconds after arming before the belt feeds
    pub feed_delay: f64,
    /// Full shooter speed; the wheel spins in the negative direction
    pub shooter_speed: f64,
    pub feed_speed: f64,
}

impl Default for ShooterConfig {
    fn default() -> Self {
        Self {
            trigger_threshold: 0.75,
            spinup_time: 1.0,
            feed_delay: 2.0,
            shooter_speed: 1.0,
            feed_speed: 0.7,
        }
    }
}

/// One timed step of the autonomous script
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AutonomousInstruction {
    #[serde(default)]
    pub forward: f64,
    #[serde(default)]
    pub strafe: f64,
    #[serde(default)]
    pub rotate: f64,
    /// Seconds to hold this command; the only required key
    pub duration: f64,
}

impl AutonomousInstruction {
    pub const fn new(forward: f64, strafe: f64, rotate: f64, duration: f64) -> Self {
        Self {
            forward,
            strafe,
            rotate,
            duration,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutonConfig {
    pub instructions: Vec<AutonomousInstruction>,
}

impl Default for AutonConfig {
    fn default() -> Self {
        Self {
            instructions: vec![
                AutonomousInstruction::new(-0.5, 0.0, 0.0, 3.0),
                AutonomousInstruction::new(0.0, 0.5, 0.1, 2.0),
                AutonomousInstruction::new(-0.25, 0.25, 0.0, 4.5),
            ],
        }
    }
}
