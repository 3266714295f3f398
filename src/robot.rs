// Mode dispatcher: lifecycle entry points called by the scheduler
//
// Each tick sends exactly one velocity command to the drivetrain. In teleop the
// vision controller may replace the operator's command; the firing sequence and
// the intake/lift run alongside regardless of what the drive is doing.

use tracing::{info, warn};

use crate::actuator::{
    ActuatorError, FrameMotor, FrameWheels, Mechanism, MotorOutput, SharedFrame, WheelOutput,
};
use crate::config::RobotConfig;
use crate::control::{
    FireState, LiftCommand, Sequencer, ShooterController, TeleopMapper, VisionController,
};
use crate::drive::Drivetrain;
use crate::messages::{GamepadState, Phase, TargetTelemetry, VelocityCommand};

/// Actuator capabilities the robot is built from
pub struct RobotOutputs<W, M> {
    pub wheels: W,
    pub shooter: M,
    pub belt: M,
    pub intake: M,
    pub lift: M,
}

pub struct Robot<W, M> {
    phase: Phase,
    drivetrain: Drivetrain<W>,
    sequencer: Sequencer,
    teleop: TeleopMapper,
    vision: VisionController,
    shooter: ShooterController<M, M>,
    intake: M,
    lift: M,
    lift_speed: f64,
}

impl Robot<FrameWheels, FrameMotor> {
    /// Robot whose outputs all land in `frame`
    pub fn with_frame(config: &RobotConfig, frame: &SharedFrame) -> Self {
        Self::new(
            config,
            RobotOutputs {
                wheels: frame.wheels(),
                shooter: frame.motor(Mechanism::Shooter),
                belt: frame.motor(Mechanism::Belt),
                intake: frame.motor(Mechanism::Intake),
                lift: frame.motor(Mechanism::Lift),
            },
        )
    }
}

impl<W: WheelOutput, M: MotorOutput> Robot<W, M> {
    pub fn new(config: &RobotConfig, outputs: RobotOutputs<W, M>) -> Self {
        Self {
            phase: Phase::Disabled,
            drivetrain: Drivetrain::new(outputs.wheels, &config.drive),
            sequencer: Sequencer::new(config.auton.instructions.clone()),
            teleop: TeleopMapper::new(config.teleop.clone()),
            vision: VisionController::new(config.vision.clone()),
            shooter: ShooterController::new(config.shooter.clone(), outputs.shooter, outputs.belt),
            intake: outputs.intake,
            lift: outputs.lift,
            lift_speed: config.teleop.lift_speed,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn fire_state(&self) -> FireState {
        self.shooter.state()
    }

    /// Enter `phase`: every output is zeroed and every timer reset
    ///
    /// Calling it again without an intervening tick leaves the same state.
    pub fn on_phase_enter(&mut self, phase: Phase) -> Result<(), ActuatorError> {
        self.enter(phase)?;
        self.drivetrain.stop()
    }

    /// Run one scheduler period and return the command sent to the drivetrain
    ///
    /// A phase different from the active one is entered first, within this
    /// same tick, so nothing started in the old phase survives the switch.
    pub fn on_tick(
        &mut self,
        phase: Phase,
        dt: f64,
        pad: &GamepadState,
        telemetry: &TargetTelemetry,
    ) -> Result<VelocityCommand, ActuatorError> {
        if phase != self.phase {
            // The drive command below replaces the drivetrain stop
            self.enter(phase)?;
        }
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        let cmd = match phase {
            Phase::Disabled => VelocityCommand::zero(),
            Phase::Autonomous => self.sequencer.on_tick(dt),
            Phase::Teleop => return self.teleop_tick(dt, pad, telemetry),
        };
        self.drivetrain.drive_command(&cmd)?;
        Ok(cmd)
    }

    /// Best-effort stop of every output; reports the first failure
    pub fn stop_all(&mut self) -> Result<(), ActuatorError> {
        let results = [
            self.drivetrain.stop(),
            self.shooter.reset(),
            self.intake.stop(),
            self.lift.stop(),
        ];

        let mut first = None;
        for result in results {
            if let Err(e) = result {
                warn!("Failed to stop output: {}", e);
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    fn enter(&mut self, phase: Phase) -> Result<(), ActuatorError> {
        if phase != self.phase {
            info!("Phase {:?} -> {:?}", self.phase, phase);
        }
        self.phase = phase;

        match phase {
            Phase::Autonomous => self.sequencer.on_phase_enter(),
            Phase::Disabled | Phase::Teleop => self.sequencer.reset(),
        }
        self.shooter.reset()?;
        self.intake.stop()?;
        self.lift.stop()
    }

    fn teleop_tick(
        &mut self,
        dt: f64,
        pad: &GamepadState,
        telemetry: &TargetTelemetry,
    ) -> Result<VelocityCommand, ActuatorError> {
        let op = self.teleop.map(pad);

        let cmd = self.vision.command(op.assist, telemetry).unwrap_or(op.drive);
        self.drivetrain.drive_command(&cmd)?;

        self.intake.set(op.aux.intake)?;
        match op.aux.lift {
            // Lift motor is mounted inverted
            LiftCommand::Raise => self.lift.set(-self.lift_speed)?,
            LiftCommand::Lower => self.lift.set(self.lift_speed)?,
            LiftCommand::Stop => self.lift.stop()?,
        }
        self.shooter.tick(op.fire_trigger, op.aux.belt, dt)?;

        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::SequencerState;
    use crate::drive::WheelSpeeds;
    use crate::messages::ActuationFrame;

    const DT: f64 = 0.02;
    const EPS: f64 = 1e-9;

    fn robot() -> (Robot<FrameWheels, FrameMotor>, SharedFrame) {
        let config = RobotConfig::default();
        let frame = SharedFrame::new(&config.drive);
        (Robot::with_frame(&config, &frame), frame)
    }

    fn wheels(frame: &SharedFrame) -> [f64; 4] {
        let s = frame.snapshot().unwrap();
        [
            s.front_left.output,
            s.front_right.output,
            s.rear_left.output,
            s.rear_right.output,
        ]
    }

    fn fire_pad() -> GamepadState {
        GamepadState {
            right_trigger: 1.0,
            ..GamepadState::neutral()
        }
    }

    fn no_target() -> TargetTelemetry {
        TargetTelemetry::default()
    }

    #[test]
    fn test_teleop_drive_reaches_wheels() {
        let (mut robot, frame) = robot();
        let pad = GamepadState {
            left_y: -1.0,
            ..GamepadState::neutral()
        };
        let cmd = robot.on_tick(Phase::Teleop, DT, &pad, &no_target()).unwrap();

        assert_eq!(cmd, VelocityCommand::new(0.5, 0.0, 0.0));
        // Right side inverted by default
        assert_eq!(wheels(&frame), [0.5, -0.5, 0.5, -0.5]);
    }

    #[test]
    fn test_aim_overrides_operator_drive() {
        let (mut robot, frame) = robot();
        let pad = GamepadState {
            left_y: -1.0,
            b: true,
            ..GamepadState::neutral()
        };
        let target = TargetTelemetry {
            offset_x: 10.0,
            offset_y: 0.0,
            area: 2.0,
            visible: true,
        };
        let cmd = robot.on_tick(Phase::Teleop, DT, &pad, &target).unwrap();
        assert_eq!(cmd, VelocityCommand::new(0.0, 0.0, -1.0));
        assert_eq!(wheels(&frame), [1.0, 1.0, 1.0, 1.0]);

        // Releasing aim hands control back to the sticks
        let pad = GamepadState { b: false, ..pad };
        let cmd = robot.on_tick(Phase::Teleop, DT, &pad, &target).unwrap();
        assert_eq!(cmd, VelocityCommand::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_aim_searches_without_target() {
        let (mut robot, _frame) = robot();
        let pad = GamepadState {
            b: true,
            ..GamepadState::neutral()
        };
        let cmd = robot.on_tick(Phase::Teleop, DT, &pad, &no_target()).unwrap();
        assert_eq!(cmd, VelocityCommand::new(0.0, 0.0, 0.2));
    }

    #[test]
    fn test_mechanisms_follow_pad() {
        let (mut robot, frame) = robot();
        let pad = GamepadState {
            a: true,
            x: true,
            pov: 180,
            ..GamepadState::neutral()
        };
        robot.on_tick(Phase::Teleop, DT, &pad, &no_target()).unwrap();

        let snap = frame.snapshot().unwrap();
        assert_eq!(snap.intake, Some(0.3));
        assert_eq!(snap.belt, Some(0.5));
        assert_eq!(snap.lift, Some(0.25));
        assert_eq!(snap.shooter, None);

        robot
            .on_tick(Phase::Teleop, DT, &GamepadState::neutral(), &no_target())
            .unwrap();
        let snap = frame.snapshot().unwrap();
        assert_eq!(snap.intake, Some(0.0));
        assert_eq!(snap.belt, Some(0.0));
        assert_eq!(snap.lift, None);
    }

    #[test]
    fn test_dpad_up_raises_lift() {
        let (mut robot, frame) = robot();
        let pad = GamepadState {
            pov: 0,
            ..GamepadState::neutral()
        };
        robot.on_tick(Phase::Teleop, DT, &pad, &no_target()).unwrap();
        assert_eq!(frame.snapshot().unwrap().lift, Some(-0.25));
    }

    #[test]
    fn test_range_overrides_operator_drive() {
        let (mut robot, frame) = robot();
        let pad = GamepadState {
            y: true,
            left_y: -1.0,
            left_x: 1.0,
            ..GamepadState::neutral()
        };
        let target = TargetTelemetry {
            offset_y: 4.0,
            visible: true,
            ..TargetTelemetry::default()
        };
        let cmd = robot.on_tick(Phase::Teleop, DT, &pad, &target).unwrap();

        assert!((cmd.forward - -0.4).abs() < EPS);
        assert_eq!(cmd.strafe, 0.0);
        assert_eq!(cmd.rotate, 0.0);
        for w in wheels(&frame) {
            assert!((w.abs() - 0.4).abs() < EPS);
        }
    }

    #[test]
    fn test_fire_runs_while_aiming() {
        let (mut robot, frame) = robot();
        let pad = GamepadState {
            b: true,
            ..fire_pad()
        };
        for _ in 0..125 {
            robot.on_tick(Phase::Teleop, DT, &pad, &no_target()).unwrap();
        }
        let snap = frame.snapshot().unwrap();
        assert_eq!(snap.shooter, Some(-1.0));
        assert_eq!(snap.belt, Some(0.7));
    }

    #[test]
    fn test_switch_to_autonomous_mid_fire_stops_shooter() {
        let (mut robot, frame) = robot();
        for _ in 0..125 {
            robot.on_tick(Phase::Teleop, DT, &fire_pad(), &no_target()).unwrap();
        }
        assert_eq!(frame.snapshot().unwrap().belt, Some(0.7));

        let cmd = robot
            .on_tick(Phase::Autonomous, DT, &fire_pad(), &no_target())
            .unwrap();
        let snap = frame.snapshot().unwrap();
        assert_eq!(snap.shooter, None);
        assert_eq!(snap.belt, Some(0.0));
        assert_eq!(robot.fire_state(), FireState::default());
        assert_eq!(robot.phase(), Phase::Autonomous);
        assert_eq!(cmd, VelocityCommand::new(-0.5, 0.0, 0.0));
    }

    #[test]
    fn test_autonomous_script_through_dispatcher() {
        let (mut robot, frame) = robot();
        robot.on_phase_enter(Phase::Autonomous).unwrap();

        let mut cmd = VelocityCommand::zero();
        for _ in 0..175 {
            cmd = robot
                .on_tick(Phase::Autonomous, DT, &GamepadState::neutral(), &no_target())
                .unwrap();
        }
        assert_eq!(cmd, VelocityCommand::new(0.0, 0.5, 0.1));

        for _ in 0..300 {
            cmd = robot
                .on_tick(Phase::Autonomous, DT, &GamepadState::neutral(), &no_target())
                .unwrap();
        }
        assert!(cmd.is_zero());
        assert_eq!(robot.sequencer().state(), SequencerState::Done);
        assert_eq!(wheels(&frame).iter().map(|w| w.abs()).sum::<f64>(), 0.0);
    }

    #[test]
    fn test_autonomous_ignores_gamepad() {
        let (mut robot, frame) = robot();
        let pad = GamepadState {
            a: true,
            pov: 0,
            ..fire_pad()
        };
        robot.on_tick(Phase::Autonomous, DT, &pad, &no_target()).unwrap();
        let snap = frame.snapshot().unwrap();
        assert_eq!(snap.shooter, None);
        assert_eq!(snap.intake, None);
        assert_eq!(snap.lift, None);
    }

    #[test]
    fn test_teleop_entry_resets_sequencer() {
        let (mut robot, _frame) = robot();
        robot.on_phase_enter(Phase::Autonomous).unwrap();
        for _ in 0..50 {
            robot
                .on_tick(Phase::Autonomous, DT, &GamepadState::neutral(), &no_target())
                .unwrap();
        }
        robot
            .on_tick(Phase::Teleop, DT, &GamepadState::neutral(), &no_target())
            .unwrap();
        assert_eq!(robot.sequencer().state(), SequencerState::Idle);
        assert_eq!(robot.sequencer().elapsed(), 0.0);
    }

    #[test]
    fn test_phase_enter_idempotent() {
        let (mut robot, frame) = robot();
        for _ in 0..60 {
            robot.on_tick(Phase::Teleop, DT, &fire_pad(), &no_target()).unwrap();
        }

        robot.on_phase_enter(Phase::Autonomous).unwrap();
        let once: (ActuationFrame, SequencerState, f64, FireState) = (
            frame.snapshot().unwrap(),
            robot.sequencer().state(),
            robot.sequencer().elapsed(),
            robot.fire_state(),
        );
        robot.on_phase_enter(Phase::Autonomous).unwrap();
        let twice = (
            frame.snapshot().unwrap(),
            robot.sequencer().state(),
            robot.sequencer().elapsed(),
            robot.fire_state(),
        );
        assert_eq!(once, twice);
        assert_eq!(once.1, SequencerState::Running(0));
    }

    #[test]
    fn test_disabled_sends_zero() {
        let (mut robot, frame) = robot();
        let pad = GamepadState {
            left_y: -1.0,
            ..fire_pad()
        };
        robot.on_tick(Phase::Teleop, DT, &pad, &no_target()).unwrap();
        let cmd = robot.on_tick(Phase::Disabled, DT, &pad, &no_target()).unwrap();

        assert!(cmd.is_zero());
        assert_eq!(wheels(&frame).iter().map(|w| w.abs()).sum::<f64>(), 0.0);
        assert_eq!(frame.snapshot().unwrap().shooter, None);
    }

    #[test]
    fn test_bad_dt_treated_as_zero() {
        let (mut robot, _frame) = robot();
        robot.on_tick(Phase::Teleop, f64::NAN, &fire_pad(), &no_target()).unwrap();
        robot.on_tick(Phase::Teleop, -1.0, &fire_pad(), &no_target()).unwrap();
        assert_eq!(robot.fire_state().elapsed, 0.0);
        robot.on_tick(Phase::Teleop, DT, &fire_pad(), &no_target()).unwrap();
        assert!((robot.fire_state().elapsed - DT).abs() < EPS);
    }

    /// Counts drive writes and can be told to fail
    #[derive(Default)]
    struct CountingWheels {
        writes: usize,
        fail: bool,
    }

    impl WheelOutput for &mut CountingWheels {
        fn set_wheels(&mut self, _speeds: WheelSpeeds) -> Result<(), ActuatorError> {
            if self.fail {
                return Err(ActuatorError::Unavailable("drive"));
            }
            self.writes += 1;
            Ok(())
        }
    }

    fn counting_robot<'a>(
        wheels: &'a mut CountingWheels,
        frame: &SharedFrame,
    ) -> Robot<&'a mut CountingWheels, FrameMotor> {
        Robot::new(
            &RobotConfig::default(),
            RobotOutputs {
                wheels,
                shooter: frame.motor(Mechanism::Shooter),
                belt: frame.motor(Mechanism::Belt),
                intake: frame.motor(Mechanism::Intake),
                lift: frame.motor(Mechanism::Lift),
            },
        )
    }

    #[test]
    fn test_one_drive_write_per_tick() {
        let frame = SharedFrame::new(&RobotConfig::default().drive);
        let mut wheels = CountingWheels::default();
        {
            let mut robot = counting_robot(&mut wheels, &frame);
            let pad = GamepadState {
                b: true,
                y: true,
                ..fire_pad()
            };
            robot.on_tick(Phase::Teleop, DT, &pad, &no_target()).unwrap();
            robot.on_tick(Phase::Autonomous, DT, &pad, &no_target()).unwrap();
            robot.on_tick(Phase::Autonomous, DT, &pad, &no_target()).unwrap();
            robot.on_tick(Phase::Disabled, DT, &pad, &no_target()).unwrap();
        }
        assert_eq!(wheels.writes, 4);
    }

    #[test]
    fn test_drive_failure_propagates() {
        let frame = SharedFrame::new(&RobotConfig::default().drive);
        let mut wheels = CountingWheels {
            writes: 0,
            fail: true,
        };
        let mut robot = counting_robot(&mut wheels, &frame);

        let err = robot.on_tick(Phase::Teleop, DT, &fire_pad(), &no_target());
        assert!(matches!(err, Err(ActuatorError::Unavailable("drive"))));

        // Mechanisms are still stopped even though the drive write failed
        assert!(robot.stop_all().is_err());
        let snap = frame.snapshot().unwrap();
        assert_eq!(snap.shooter, None);
        assert_eq!(snap.belt, Some(0.0));
    }
}
