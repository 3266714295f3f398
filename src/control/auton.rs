// Timed autonomous script player

use tracing::{info, warn};

use crate::config::AutonomousInstruction;
use crate::messages::VelocityCommand;

/// Slack for accumulated floating-point error at instruction boundaries
const TIME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// No autonomous period has started yet
    Idle,
    /// Playing the instruction at this index
    Running(usize),
    /// Script finished; zero command until the next phase entry
    Done,
}

/// Plays an ordered list of timed drive instructions
///
/// The sequencer keeps its own clock, advanced only by the `dt` passed to
/// [`Sequencer::on_tick`]. Time left over when an instruction expires carries
/// into the next one, so the active instruction depends only on total elapsed
/// time and not on how it was split into ticks.
pub struct Sequencer {
    instructions: Vec<AutonomousInstruction>,
    state: SequencerState,
    current_index: usize,
    elapsed: f64,
}

impl Sequencer {
    pub fn new(instructions: Vec<AutonomousInstruction>) -> Self {
        for (i, instr) in instructions.iter().enumerate() {
            if !(instr.duration > 0.0 && instr.duration.is_finite()) {
                warn!("Autonomous step {} has duration {}; it will be skipped", i, instr.duration);
            }
            let axes = [instr.forward, instr.strafe, instr.rotate];
            if axes.iter().any(|v| !(-1.0..=1.0).contains(v)) {
                warn!("Autonomous step {} has an axis outside [-1, 1]; it will be clamped", i);
            }
        }

        Self {
            instructions,
            state: SequencerState::Idle,
            current_index: 0,
            elapsed: 0.0,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Seconds spent in the current instruction
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn is_done(&self) -> bool {
        self.state == SequencerState::Done
    }

    /// Restart the script from the first instruction
    pub fn on_phase_enter(&mut self) {
        self.current_index = 0;
        self.elapsed = 0.0;
        self.state = if self.instructions.is_empty() {
            SequencerState::Done
        } else {
            SequencerState::Running(0)
        };
    }

    /// Return to Idle, clearing the clock
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.elapsed = 0.0;
        self.state = SequencerState::Idle;
    }

    /// Advance the clock by `dt` seconds and return the command for this tick
    pub fn on_tick(&mut self, dt: f64) -> VelocityCommand {
        if self.state != SequencerState::Running(self.current_index) {
            return VelocityCommand::zero();
        }

        self.elapsed += dt;
        while let Some(instr) = self.instructions.get(self.current_index) {
            if !expired(instr, self.elapsed) {
                break;
            }
            // Non-positive or NaN durations expire without consuming time
            let used = if instr.duration.is_finite() {
                instr.duration.max(0.0)
            } else {
                0.0
            };
            self.elapsed = (self.elapsed - used).max(0.0);
            self.current_index += 1;
            info!("Autonomous step {} complete", self.current_index - 1);
        }

        match self.instructions.get(self.current_index) {
            Some(instr) => {
                self.state = SequencerState::Running(self.current_index);
                VelocityCommand::new(instr.forward, instr.strafe, instr.rotate)
            }
            None => {
                info!("Autonomous script finished");
                self.state = SequencerState::Done;
                self.elapsed = 0.0;
                VelocityCommand::zero()
            }
        }
    }
}

fn expired(instr: &AutonomousInstruction, elapsed: f64) -> bool {
    !(instr.duration.is_finite() && instr.duration > 0.0)
        || elapsed >= instr.duration - TIME_EPSILON
}
