// Define message types exchanged between the control core and the bus

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::WheelChannels;

/// Competition phase selected by the field controller
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Disabled,
    Autonomous,
    Teleop,
}

/// Body-frame drive request, every axis in [-1, 1]
///
/// `forward` is positive toward the front of the robot, `strafe` positive to
/// the right and `rotate` positive counter-clockwise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct VelocityCommand {
    pub forward: f64,
    pub strafe: f64,
    pub rotate: f64,
}

impl VelocityCommand {
    /// Build a command, clamping each axis into [-1, 1] (NaN becomes 0)
    pub fn new(forward: f64, strafe: f64, rotate: f64) -> Self {
        Self {
            forward: clamp_unit(forward),
            strafe: clamp_unit(strafe),
            rotate: clamp_unit(rotate),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.forward == 0.0 && self.strafe == 0.0 && self.rotate == 0.0
    }
}

/// Clamp a normalized output into [-1, 1]; non-numbers map to 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Snapshot of an Xbox-style gamepad, as published by the gamepad driver
///
/// Stick y axes follow the usual HID convention: pushing up reads negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GamepadState {
    pub left_x: f64,
    pub left_y: f64,
    pub right_x: f64,
    pub right_y: f64,
    pub left_trigger: f64,
    pub right_trigger: f64,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub left_bumper: bool,
    pub right_bumper: bool,
    /// Directional pad angle in degrees, -1 when centered
    pub pov: i32,
}

impl Default for GamepadState {
    fn default() -> Self {
        Self {
            left_x: 0.0,
            left_y: 0.0,
            right_x: 0.0,
            right_y: 0.0,
            left_trigger: 0.0,
            right_trigger: 0.0,
            a: false,
            b: false,
            x: false,
            y: false,
            left_bumper: false,
            right_bumper: false,
            pov: -1,
        }
    }
}

impl GamepadState {
    /// All sticks centered, nothing pressed
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// Latest target estimate from the vision appliance
///
/// Accepts both the appliance's short keys (`tx`, `ty`, `ta`, `tv`) and the
/// long names. Anything missing reads as 0 / not visible.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TargetTelemetry {
    /// Horizontal offset to target in degrees, positive = target to the right
    #[serde(alias = "tx", alias = "offsetX")]
    pub offset_x: f64,
    /// Vertical offset to target in degrees
    #[serde(alias = "ty", alias = "offsetY")]
    pub offset_y: f64,
    /// Target area as a percentage of the image
    #[serde(alias = "ta")]
    pub area: f64,
    #[serde(alias = "tv", deserialize_with = "flag_from_number_or_bool")]
    pub visible: bool,
}

// The appliance reports `tv` as 0.0 / 1.0; other publishers send a bool
fn flag_from_number_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Number(n) => n >= 0.5,
    })
}

/// Values forwarded to the dashboard every tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DashboardSample {
    pub offset_x: f64,
    pub offset_y: f64,
    pub area: f64,
}

impl From<&TargetTelemetry> for DashboardSample {
    fn from(t: &TargetTelemetry) -> Self {
        Self {
            offset_x: t.offset_x,
            offset_y: t.offset_y,
            area: t.area,
        }
    }
}

/// Output for one drive motor, tagged with its controller channel
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct WheelActuation {
    pub channel: u8,
    pub output: f64,
}

/// Every actuator output for one tick, published to the driver layer
///
/// Mechanism fields are `None` when the motor is commanded to stop (coast)
/// rather than driven at a speed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActuationFrame {
    pub front_left: WheelActuation,
    pub front_right: WheelActuation,
    pub rear_left: WheelActuation,
    pub rear_right: WheelActuation,
    pub shooter: Option<f64>,
    pub belt: Option<f64>,
    pub intake: Option<f64>,
    pub lift: Option<f64>,
}

impl ActuationFrame {
    /// Every wheel at zero and every mechanism stopped
    pub fn stopped(channels: &WheelChannels) -> Self {
        let wheel = |channel| WheelActuation {
            channel,
            output: 0.0,
        };
        Self {
            front_left: wheel(channels.front_left),
            front_right: wheel(channels.front_right),
            rear_left: wheel(channels.rear_left),
            rear_right: wheel(channels.rear_right),
            ..Default::default()
        }
    }
}

/// Health status published by the runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    InputStale,
}
