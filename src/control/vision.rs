// Vision-assisted aiming and ranging
//
// Steers the robot toward the target reported by the vision appliance with a
// proportional law plus a minimum command, closes range on the vertical offset,
// and sweeps in place while no target is in view.

use tracing::info;

use super::teleop::AssistRequest;
use crate::config::VisionConfig;
use crate::messages::{TargetTelemetry, VelocityCommand};

pub struct VisionController {
    config: VisionConfig,
    // Used only to log acquire/lose transitions
    had_target: Option<bool>,
}

impl VisionController {
    pub fn new(config: VisionConfig) -> Self {
        Self {
            config,
            had_target: None,
        }
    }

    /// Raw steering correction for a visible target, before clamping
    ///
    /// Positive `offset_x` means the target is to the right, so the correction
    /// opposes it. Inside the deadband no correction is applied; outside it the
    /// minimum command is added in the direction of the correction so small
    /// errors still overcome drivetrain friction.
    pub fn steering_adjust(&self, telemetry: &TargetTelemetry) -> f64 {
        let cfg = &self.config;
        let x = finite_or_zero(telemetry.offset_x);
        if x.abs() <= cfg.deadband {
            return 0.0;
        }
        let heading_error = -x;
        cfg.kp * heading_error + heading_error.signum() * cfg.min_command
    }

    /// Forward correction that drives the vertical offset toward zero
    pub fn driving_adjust(&self, telemetry: &TargetTelemetry) -> f64 {
        self.config.kp_distance * finite_or_zero(telemetry.offset_y)
    }

    /// Command overriding the operator's drive, or `None` when no assist is held
    ///
    /// Aim supplies rotation (or the search sweep when the target is lost),
    /// range supplies forward motion; translation the operator asked for is
    /// replaced either way.
    pub fn command(
        &mut self,
        request: AssistRequest,
        telemetry: &TargetTelemetry,
    ) -> Option<VelocityCommand> {
        if !request.any() {
            self.had_target = None;
            return None;
        }

        let visible = telemetry.visible;
        if self.had_target != Some(visible) {
            if visible {
                info!(
                    "Target acquired at tx={:.2}, ty={:.2}",
                    telemetry.offset_x, telemetry.offset_y
                );
            } else {
                info!("No target in view");
            }
            self.had_target = Some(visible);
        }

        let rotate = match (request.aim, visible) {
            (false, _) => 0.0,
            (true, true) => self.steering_adjust(telemetry),
            (true, false) => self.config.search_speed,
        };
        let forward = if request.range && visible {
            self.driving_adjust(telemetry)
        } else {
            0.0
        };

        Some(VelocityCommand::new(forward, 0.0, rotate))
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
