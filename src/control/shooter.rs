// Firing sequence: spin the shooter up, then feed it with the belt
//
// Timeline while the trigger is held past the threshold:
//   0 .. spinup_time        shooter ramps linearly to full speed
//   spinup_time ..          shooter at full speed
//   > feed_delay            belt feeds game pieces into the shooter
// Releasing the trigger stops both motors and resets the clock.

use tracing::{debug, info};

use crate::actuator::{ActuatorError, MotorOutput};
use crate::config::ShooterConfig;

/// Clock and arming state of the firing sequence
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FireState {
    /// Seconds the trigger has been held, including the current tick
    pub elapsed: f64,
    pub armed: bool,
    /// Armed on the previous tick; the rising edge restarts the clock
    pub was_armed: bool,
}

/// Outputs chosen for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireOutput {
    /// `None` stops the shooter
    pub shooter: Option<f64>,
    pub belt: f64,
}

pub struct ShooterController<S, B> {
    config: ShooterConfig,
    shooter: S,
    belt: B,
    state: FireState,
}

impl<S: MotorOutput, B: MotorOutput> ShooterController<S, B> {
    pub fn new(config: ShooterConfig, shooter: S, belt: B) -> Self {
        Self {
            config,
            shooter,
            belt,
            state: FireState::default(),
        }
    }

    pub fn state(&self) -> FireState {
        self.state
    }

    /// Advance the sequence and write the shooter and belt
    ///
    /// `manual_belt` is the operator's belt request; it drives the belt whenever
    /// the sequence is not feeding.
    pub fn tick(
        &mut self,
        trigger: f64,
        manual_belt: Option<f64>,
        dt: f64,
    ) -> Result<FireOutput, ActuatorError> {
        let out = self.step(trigger, manual_belt, dt);

        match out.shooter {
            Some(speed) => self.shooter.set(speed)?,
            None => self.shooter.stop()?,
        }
        self.belt.set(out.belt)?;
        Ok(out)
    }

    /// Disarm, clear the clock and stop both motors
    pub fn reset(&mut self) -> Result<(), ActuatorError> {
        if self.state.armed {
            info!("Firing sequence cancelled");
        }
        self.state = FireState::default();
        self.shooter.stop()?;
        self.belt.set(0.0)
    }

    fn step(&mut self, trigger: f64, manual_belt: Option<f64>, dt: f64) -> FireOutput {
        let cfg = &self.config;
        let armed = trigger > cfg.trigger_threshold;
        let idle_belt = manual_belt.unwrap_or(0.0);

        if !armed {
            if self.state.was_armed {
                info!("Firing sequence released after {:.2}s", self.state.elapsed);
            }
            self.state = FireState::default();
            return FireOutput {
                shooter: None,
                belt: idle_belt,
            };
        }

        if self.state.was_armed {
            self.state.elapsed += dt;
        } else {
            info!("Firing sequence armed");
            self.state.elapsed = dt;
        }
        self.state.armed = true;
        self.state.was_armed = true;

        let elapsed = self.state.elapsed;
        let shooter = if elapsed < cfg.spinup_time {
            -cfg.shooter_speed * (elapsed / cfg.spinup_time)
        } else {
            -cfg.shooter_speed
        };
        let belt = if elapsed > cfg.feed_delay {
            cfg.feed_speed
        } else {
            idle_belt
        };

        debug!("Fire t={:.3}s shooter={:.3} belt={:.2}", elapsed, shooter, belt);
        FireOutput {
            shooter: Some(shooter),
            belt,
        }
    }
}
