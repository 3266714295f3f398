// Mecanum inverse kinematics for a four-wheel base
// Converts a normalized body command (forward, strafe, rotate) to per-wheel outputs.

/// Normalized wheel outputs, each in [-1, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelSpeeds {
    pub front_left: f64,
    pub front_right: f64,
    pub rear_left: f64,
    pub rear_right: f64,
}

impl WheelSpeeds {
    pub fn new(front_left: f64, front_right: f64, rear_left: f64, rear_right: f64) -> Self {
        Self {
            front_left,
            front_right,
            rear_left,
            rear_right,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns speeds as array [front_left, front_right, rear_left, rear_right]
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.front_left,
            self.front_right,
            self.rear_left,
            self.rear_right,
        ]
    }

    pub fn from_array(speeds: [f64; 4]) -> Self {
        Self::new(speeds[0], speeds[1], speeds[2], speeds[3])
    }

    /// Largest wheel magnitude
    pub fn max_abs(&self) -> f64 {
        self.as_array().iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
    }
}

/// Mix a body command into wheel speeds
///
/// # Arguments
/// * `forward` - positive = toward the front of the robot
/// * `strafe` - positive = to the right
/// * `rotate` - positive = counter-clockwise
///
/// Inputs are expected in [-1, 1]. If any wheel would exceed full speed, all
/// four are divided by the largest magnitude so the direction of travel is kept.
pub fn mecanum_mix(forward: f64, strafe: f64, rotate: f64) -> WheelSpeeds {
    // Rollers form an X seen from above: diagonal pairs share the strafe sign
    let mut speeds = [
        forward + strafe - rotate, // front left
        forward - strafe + rotate, // front right
        forward - strafe - rotate, // rear left
        forward + strafe + rotate, // rear right
    ];

    let max = speeds.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if max > 1.0 {
        let scale = 1.0 / max;
        for speed in &mut speeds {
            *speed *= scale;
        }
    }

    WheelSpeeds::from_array(speeds)
}
