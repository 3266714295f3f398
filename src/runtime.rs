// 50 Hz host loop with input watchdog
// Plays the scheduler: gathers the latest phase, gamepad and vision samples from
// the bus, runs one robot tick and publishes the resulting actuation frame.
// Note: if the operator console stops publishing, the watchdog swaps in a
// neutral gamepad so the robot does not keep acting on the last stick position.
// Vision samples age out the same way and then read as "no target".

use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::actuator::{MotorOutput, SharedFrame, WheelOutput};
use crate::config::{
    gamepad_topic, DriveConfig, RobotConfig, INPUT_TIMEOUT, LOOP_HZ, TOPIC_ACTUATION,
    TOPIC_DASHBOARD, TOPIC_HEALTH, TOPIC_PHASE, TOPIC_VISION, VISION_TIMEOUT,
};
use crate::messages::{
    ActuationFrame, DashboardSample, GamepadState, Phase, RuntimeHealth, TargetTelemetry,
};
use crate::robot::Robot;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Latest inputs seen on the bus
pub struct Runtime {
    phase: Phase,
    latest_pad: Option<GamepadState>,
    pad_received_at: Instant,
    telemetry: TargetTelemetry,
    telemetry_received_at: Option<Instant>,
    vision_live: bool,
    health: RuntimeHealth,
    last_tick: Option<Instant>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            phase: Phase::Disabled,
            latest_pad: None,
            pad_received_at: Instant::now(),
            telemetry: TargetTelemetry::default(),
            telemetry_received_at: None,
            vision_live: false,
            health: RuntimeHealth::InputStale, // Start stale until first pad sample
            last_tick: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    fn on_phase(&mut self, phase: Phase) {
        if phase != self.phase {
            info!("Field control requested {:?}", phase);
        }
        self.phase = phase;
    }

    fn on_gamepad(&mut self, pad: GamepadState, now: Instant) {
        debug!("Gamepad: {:?}", &pad);
        self.latest_pad = Some(pad);
        self.pad_received_at = now;
    }

    fn on_telemetry(&mut self, telemetry: TargetTelemetry, now: Instant) {
        self.telemetry = telemetry;
        self.telemetry_received_at = Some(now);
    }

    /// Target telemetry to act on this tick; an old sample reads as no target
    pub fn telemetry(&mut self, now: Instant) -> TargetTelemetry {
        let age = self
            .telemetry_received_at
            .map(|at| now.saturating_duration_since(at));

        match age {
            Some(age) if age <= VISION_TIMEOUT => {
                if !self.vision_live {
                    info!("Vision telemetry live");
                }
                self.vision_live = true;
                self.telemetry
            }
            Some(age) => {
                if self.vision_live {
                    warn!("Vision telemetry stale ({:?} old), assuming no target", age);
                }
                self.vision_live = false;
                TargetTelemetry::default()
            }
            None => TargetTelemetry::default(),
        }
    }

    /// Gamepad to act on this tick, after the watchdog
    fn gamepad(&mut self, now: Instant) -> GamepadState {
        let age = now.saturating_duration_since(self.pad_received_at);

        match &self.latest_pad {
            Some(pad) if age <= INPUT_TIMEOUT => {
                if self.health != RuntimeHealth::Ok {
                    info!("Gamepad input live");
                }
                self.health = RuntimeHealth::Ok;
                pad.clone()
            }
            Some(_) => {
                // Watchdog triggered - treat the operator as hands-off
                if self.health != RuntimeHealth::InputStale {
                    warn!("Gamepad input stale ({:?} old), using neutral pad", age);
                }
                self.health = RuntimeHealth::InputStale;
                GamepadState::neutral()
            }
            None => {
                // No gamepad sample ever received
                self.health = RuntimeHealth::InputStale;
                GamepadState::neutral()
            }
        }
    }

    /// Seconds since the previous tick (0 on the first tick)
    fn dt(&mut self, now: Instant) -> f64 {
        let dt = self
            .last_tick
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        dt
    }
}

// Log and drop anything that doesn't parse; a bad sample must not stop the loop
fn parse<T: serde::de::DeserializeOwned>(topic: &str, payload: &[u8]) -> Option<T> {
    match serde_json::from_slice::<T>(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to parse message on {}: {}", topic, e);
            None
        }
    }
}

pub async fn run(config: RobotConfig) -> Result<(), Error> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    let topic_gamepad = gamepad_topic(config.controller_port);

    info!("Setting up publishers and subscribers...");
    let sub_phase = session.declare_subscriber(TOPIC_PHASE).await?;
    let sub_gamepad = session.declare_subscriber(topic_gamepad.as_str()).await?;
    let sub_vision = session.declare_subscriber(TOPIC_VISION).await?;
    let pub_actuation = session.declare_publisher(TOPIC_ACTUATION).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;
    let pub_dashboard = session.declare_publisher(TOPIC_DASHBOARD).await?;

    let frame = SharedFrame::new(&config.drive);
    let mut robot = Robot::with_frame(&config, &frame);
    robot.on_phase_enter(Phase::Disabled)?;

    let mut runtime = Runtime::new();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Runtime started: {}Hz loop, {}ms input watchdog, {}ms vision watchdog",
        LOOP_HZ,
        INPUT_TIMEOUT.as_millis(),
        VISION_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}, {}, {}", TOPIC_PHASE, topic_gamepad, TOPIC_VISION);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_ACTUATION, TOPIC_HEALTH, TOPIC_DASHBOARD
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = async {
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = &mut ctrl_c => {
                    info!("Shutdown requested, stopping all outputs");
                    return Ok::<(), Error>(());
                }
            }

            // 1. Drain all pending samples (non-blocking), keep latest
            while let Ok(Some(sample)) = sub_phase.try_recv() {
                let payload = sample.payload().to_bytes();
                if let Some(phase) = parse::<Phase>(TOPIC_PHASE, &payload) {
                    runtime.on_phase(phase);
                }
            }
            let now = Instant::now();
            while let Ok(Some(sample)) = sub_gamepad.try_recv() {
                let payload = sample.payload().to_bytes();
                if let Some(pad) = parse::<GamepadState>(&topic_gamepad, &payload) {
                    runtime.on_gamepad(pad, now);
                }
            }
            while let Ok(Some(sample)) = sub_vision.try_recv() {
                let payload = sample.payload().to_bytes();
                if let Some(telemetry) = parse::<TargetTelemetry>(TOPIC_VISION, &payload) {
                    runtime.on_telemetry(telemetry, now);
                }
            }

            // 2. Run the robot (watchdogs applied to gamepad and vision)
            let pad = runtime.gamepad(now);
            let telemetry = runtime.telemetry(now);
            let dt = runtime.dt(now);
            robot
                .on_tick(runtime.phase, dt, &pad, &telemetry)
                .inspect_err(|e| error!("Actuator fault: {}", e))?;

            // 3. Publish actuation
            let actuation_json = serde_json::to_string(&frame.snapshot()?)?;
            pub_actuation.put(actuation_json).await?;

            // 4. Publish health
            let health_json = serde_json::to_string(&runtime.health)?;
            pub_health.put(health_json).await?;

            // 5. Dashboard is best effort
            let dashboard_json = serde_json::to_string(&DashboardSample::from(&telemetry))?;
            if let Err(e) = pub_dashboard.put(dashboard_json).await {
                debug!("Dashboard publish failed: {}", e);
            }
        }
    }
    .await;

    let stopped = stop_outputs(&mut robot, &config.drive);
    match serde_json::to_string(&stopped) {
        Ok(json) => {
            if let Err(e) = pub_actuation.put(json).await {
                error!("Could not publish stopped frame: {}", e);
            }
        }
        Err(e) => error!("Could not encode stopped frame: {}", e),
    }

    result
}

// Stop every output and build the frame that tells the drivers to do the same.
// The frame is built from config so it goes out even if the shared one is
// unreadable.
fn stop_outputs<W: WheelOutput, M: MotorOutput>(
    robot: &mut Robot<W, M>,
    drive: &DriveConfig,
) -> ActuationFrame {
    if let Err(e) = robot.stop_all() {
        error!("Could not stop all outputs: {}", e);
    }
    ActuationFrame::stopped(&drive.channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pad_is_stale_and_neutral() {
        let mut runtime = Runtime::new();
        let pad = runtime.gamepad(Instant::now());
        assert_eq!(pad, GamepadState::neutral());
        assert_eq!(runtime.health(), RuntimeHealth::InputStale);
    }

    #[test]
    fn test_fresh_pad_passes_through() {
        let mut runtime = Runtime::new();
        let now = Instant::now();
        let pad = GamepadState {
            left_y: -0.4,
            ..GamepadState::neutral()
        };
        runtime.on_gamepad(pad.clone(), now);

        assert_eq!(runtime.gamepad(now + Duration::from_millis(100)), pad);
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
    }

    #[test]
    fn test_watchdog_neutralizes_stale_pad() {
        let mut runtime = Runtime::new();
        let now = Instant::now();
        runtime.on_gamepad(
            GamepadState {
                right_trigger: 1.0,
                ..GamepadState::neutral()
            },
            now,
        );

        let pad = runtime.gamepad(now + INPUT_TIMEOUT + Duration::from_millis(1));
        assert_eq!(pad, GamepadState::neutral());
        assert_eq!(runtime.health(), RuntimeHealth::InputStale);
    }

    #[test]
    fn test_stale_vision_reads_as_no_target() {
        let mut runtime = Runtime::new();
        let now = Instant::now();
        let target = TargetTelemetry {
            offset_x: 10.0,
            visible: true,
            ..TargetTelemetry::default()
        };
        runtime.on_telemetry(target, now);

        assert_eq!(runtime.telemetry(now + Duration::from_millis(100)), target);

        let stale = runtime.telemetry(now + VISION_TIMEOUT + Duration::from_millis(1));
        assert_eq!(stale, TargetTelemetry::default());
        assert!(!stale.visible);

        // A new sample brings the target back
        let later = now + Duration::from_secs(2);
        runtime.on_telemetry(target, later);
        assert_eq!(runtime.telemetry(later), target);
    }

    #[test]
    fn test_no_vision_sample_is_no_target() {
        let mut runtime = Runtime::new();
        assert_eq!(runtime.telemetry(Instant::now()), TargetTelemetry::default());
    }

    #[test]
    fn test_stop_outputs_zeroes_robot_and_frame() {
        let config = RobotConfig::default();
        let frame = SharedFrame::new(&config.drive);
        let mut robot = Robot::with_frame(&config, &frame);
        let pad = GamepadState {
            left_y: -1.0,
            a: true,
            right_trigger: 1.0,
            ..GamepadState::neutral()
        };
        robot
            .on_tick(Phase::Teleop, 0.02, &pad, &TargetTelemetry::default())
            .unwrap();
        assert_ne!(frame.snapshot().unwrap(), ActuationFrame::stopped(&config.drive.channels));

        let stopped = stop_outputs(&mut robot, &config.drive);
        assert_eq!(stopped, ActuationFrame::stopped(&config.drive.channels));
        assert_eq!(frame.snapshot().unwrap(), stopped);
    }

    #[test]
    fn test_dt_measured_between_ticks() {
        let mut runtime = Runtime::new();
        let start = Instant::now();
        assert_eq!(runtime.dt(start), 0.0);
        let dt = runtime.dt(start + Duration::from_millis(23));
        assert!((dt - 0.023).abs() < 1e-9);
    }

    #[test]
    fn test_bad_payload_dropped() {
        assert_eq!(parse::<Phase>("test", b"\"warp_speed\""), None);
        assert_eq!(parse::<Phase>("test", b"\"teleop\""), Some(Phase::Teleop));
    }

    #[test]
    fn test_telemetry_latest_wins() {
        let mut runtime = Runtime::new();
        let now = Instant::now();
        runtime.on_telemetry(
            TargetTelemetry {
                offset_x: 1.0,
                visible: true,
                ..TargetTelemetry::default()
            },
            now,
        );
        runtime.on_telemetry(TargetTelemetry::default(), now);
        assert!(!runtime.telemetry(now).visible);
    }

    #[test]
    fn test_phase_updates() {
        let mut runtime = Runtime::new();
        assert_eq!(runtime.phase(), Phase::Disabled);
        runtime.on_phase(Phase::Autonomous);
        assert_eq!(runtime.phase(), Phase::Autonomous);
    }
}
