//! The run controller: owns one machine and drives it through its lifecycle.
//!
//! ```text
//!            start               halt (automatic)
//!   Idle ─────────────▶ Running ───────────────▶ Halted
//!     ▲     Paused ◀────┘  ▲ │ pause
//!     │        │   start   │ │
//!     │        └───────────┘ ▼
//!     └──────────── reset (from any status)
//! ```
//!
//! Automatic stepping uses a single deadline instead of a timer callback. A
//! frontend sleeps until [`RunController::next_tick`] and then calls
//! [`RunController::tick`], which performs at most one complete step against the
//! current state and re-arms the deadline. Pausing, resetting and loading clear
//! the deadline before touching the machine, so a stale tick never lands on a
//! replaced machine.

use crate::arithmetic::{self, Operator};
use crate::config::ControllerConfig;
use crate::generator::RuleGenerator;
use crate::history::{ExecutionLog, LogEntry};
use crate::machine::{self, MachineState};
use crate::outcome;
use crate::types::{MachineError, Outcome, Preset, Status, StepOutcome, TransitionRule};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How the current machine was loaded, which decides how its result is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Preset,
    Arithmetic(Operator),
}

/// Owns the machine, its rules, its log, and the pending step deadline.
#[derive(Debug)]
pub struct RunController {
    preset: Preset,
    origin: Origin,
    machine: MachineState,
    log: ExecutionLog,
    config: ControllerConfig,
    next_tick: Option<Instant>,
}

impl RunController {
    pub fn new(preset: Preset, config: ControllerConfig) -> Self {
        let machine = MachineState::new(&preset.initial_tape, &preset.initial_state);
        let log = ExecutionLog::with_capacity(config.log_capacity);

        Self {
            preset,
            origin: Origin::Preset,
            machine,
            log,
            config,
            next_tick: None,
        }
    }

    /// Replaces the machine with a fresh one built from `preset`.
    pub fn load(&mut self, preset: Preset) {
        self.replace(preset, Origin::Preset);
    }

    /// Loads a machine that computes `a <op> b` in unary.
    pub fn load_arithmetic(&mut self, a: i64, op: Operator, b: i64) -> Result<(), MachineError> {
        let preset = arithmetic::encode(a, op, b)?;
        self.replace(preset, Origin::Arithmetic(op));
        Ok(())
    }

    /// Asks `generator` for a preset and loads it.
    ///
    /// On failure the current machine is left exactly as it was.
    pub fn load_generated<G>(&mut self, generator: &G, prompt: &str) -> Result<(), MachineError>
    where
        G: RuleGenerator + ?Sized,
    {
        match generator.generate(prompt) {
            Ok(preset) => {
                self.load(preset);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "rule generation failed, keeping current machine");
                Err(e.into())
            }
        }
    }

    fn replace(&mut self, preset: Preset, origin: Origin) {
        self.next_tick = None;
        info!(name = %preset.name, rules = preset.rules.len(), "loaded preset");
        self.preset = preset;
        self.origin = origin;
        self.reset();
    }

    /// Reloads the initial tape and state, clears the log, and returns to `Idle`.
    pub fn reset(&mut self) {
        self.next_tick = None;
        self.machine = MachineState::new(&self.preset.initial_tape, &self.preset.initial_state);
        self.log.clear();
        info!("machine reset");
    }

    /// Moves from `Idle` or `Paused` to `Running`. The first step is due immediately.
    pub fn start(&mut self, now: Instant) -> Result<(), MachineError> {
        match self.machine.status {
            Status::Idle | Status::Paused => {
                self.machine.status = Status::Running;
                self.next_tick = Some(now);
                info!(steps = self.machine.step_count, "running");
                Ok(())
            }
            status => Err(invalid("start", status)),
        }
    }

    /// Moves from `Running` to `Paused`, cancelling the pending step.
    pub fn pause(&mut self) -> Result<(), MachineError> {
        match self.machine.status {
            Status::Running => {
                self.next_tick = None;
                self.machine.status = Status::Paused;
                info!(steps = self.machine.step_count, "paused");
                Ok(())
            }
            status => Err(invalid("pause", status)),
        }
    }

    /// Starts when stopped, pauses when running.
    pub fn toggle(&mut self, now: Instant) -> Result<(), MachineError> {
        if self.machine.status == Status::Running {
            self.pause()
        } else {
            self.start(now)
        }
    }

    /// Performs exactly one step by hand. Allowed from `Idle` or `Paused`.
    ///
    /// A manual step that applies a rule leaves the machine `Paused`.
    pub fn step(&mut self) -> Result<StepOutcome, MachineError> {
        match self.machine.status {
            Status::Idle | Status::Paused => {
                let outcome = self.advance();
                if outcome != StepOutcome::Halted {
                    self.machine.status = Status::Paused;
                }
                Ok(outcome)
            }
            status => Err(invalid("step", status)),
        }
    }

    /// Fires the pending step if the controller is running and the deadline has passed.
    ///
    /// Returns `None` when nothing was due.
    pub fn tick(&mut self, now: Instant) -> Option<StepOutcome> {
        if self.machine.status != Status::Running {
            return None;
        }
        match self.next_tick {
            Some(due) if due <= now => {}
            _ => return None,
        }

        let outcome = self.advance();
        self.next_tick = (self.machine.status == Status::Running).then(|| now + self.interval());
        Some(outcome)
    }

    /// Runs synchronously until the machine halts or the `max_steps` guard pauses it.
    ///
    /// Without a guard, a non-halting program never returns.
    pub fn run_to_halt(&mut self) -> Result<Status, MachineError> {
        match self.machine.status {
            Status::Idle | Status::Paused => self.machine.status = Status::Running,
            status => return Err(invalid("run", status)),
        }

        while self.machine.status == Status::Running {
            self.advance();
        }

        self.next_tick = None;
        Ok(self.machine.status)
    }

    /// One engine step, mirrored into the log and checked against the guard.
    fn advance(&mut self) -> StepOutcome {
        self.log.record(LogEntry {
            step: self.machine.step_count + 1,
            state: self.machine.state.clone(),
            head: self.machine.head,
            tape_snippet: self.machine.tape.to_string(),
        });

        let outcome = machine::step(&mut self.machine, &self.preset.rules);

        match outcome {
            StepOutcome::Halted => {
                self.next_tick = None;
                info!(
                    steps = self.machine.step_count,
                    state = %self.machine.state,
                    tape = %self.machine.tape,
                    "machine halted"
                );
            }
            StepOutcome::Applied(_) => {
                if let Some(limit) = self.config.step_limit() {
                    if self.machine.step_count >= limit && self.machine.status == Status::Running {
                        self.next_tick = None;
                        self.machine.status = Status::Paused;
                        warn!(limit, "step limit reached, pausing");
                    }
                }
            }
        }

        outcome
    }

    /// Changes the running speed. Takes effect when the next step is scheduled.
    pub fn set_interval(&mut self, interval: Duration) {
        self.config.interval_ms = interval.as_millis().try_into().unwrap_or(u64::MAX);
    }

    pub fn interval(&self) -> Duration {
        self.config.interval()
    }

    /// The instant the next automatic step is due, if one is scheduled.
    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Interprets the final tape once the machine has halted.
    ///
    /// Arithmetic loads decode the unary result; everything else uses the `Y`/`N` convention.
    pub fn outcome(&self) -> Option<Outcome> {
        if !self.machine.is_halted() {
            return None;
        }

        let tape = self.machine.tape.to_string();
        Some(match self.origin {
            Origin::Arithmetic(_) => arithmetic::decode(&tape),
            Origin::Preset => outcome::judge(&tape),
        })
    }

    /// The rule that would fire on the next step, if any.
    pub fn next_rule(&self) -> Option<usize> {
        machine::find_rule(&self.preset.rules, &self.machine.state, self.machine.symbol())
    }

    pub fn machine(&self) -> &MachineState {
        &self.machine
    }

    pub fn status(&self) -> Status {
        self.machine.status
    }

    pub fn rules(&self) -> &[TransitionRule] {
        &self.preset.rules
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

fn invalid(action: &'static str, status: Status) -> MachineError {
    MachineError::InvalidControl { action, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{parse_response, GenerationError};
    use crate::presets::PresetManager;
    use crate::types::{Direction, BLANK};

    fn controller(name: &str) -> RunController {
        RunController::new(
            PresetManager::get_by_name(name).unwrap(),
            ControllerConfig::default(),
        )
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_new_controller_is_idle() {
        let ctl = controller("Binary Increment");

        assert_eq!(ctl.status(), Status::Idle);
        assert_eq!(ctl.machine().step_count(), 0);
        assert_eq!(ctl.machine().tape().to_string(), "1011");
        assert!(ctl.log().is_empty());
        assert_eq!(ctl.next_tick(), None);
        assert_eq!(ctl.outcome(), None);
    }

    #[test]
    fn test_manual_step_moves_to_paused() {
        let mut ctl = controller("Binary Increment");

        assert_eq!(ctl.step().unwrap(), StepOutcome::Applied(1));
        assert_eq!(ctl.status(), Status::Paused);
        assert_eq!(ctl.machine().step_count(), 1);
        assert_eq!(ctl.log().len(), 1);
    }

    #[test]
    fn test_manual_step_rejected_while_running_or_halted() {
        let mut ctl = controller("Binary Increment");
        ctl.start(Instant::now()).unwrap();

        assert!(matches!(
            ctl.step(),
            Err(MachineError::InvalidControl { action: "step", status: Status::Running })
        ));

        ctl.pause().unwrap();
        while ctl.step().unwrap() != StepOutcome::Halted {}

        assert!(matches!(
            ctl.step(),
            Err(MachineError::InvalidControl { status: Status::Halted, .. })
        ));
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut ctl = controller("Oscillator");
        let now = Instant::now();

        ctl.start(now).unwrap();
        assert!(matches!(
            ctl.start(now),
            Err(MachineError::InvalidControl { action: "start", status: Status::Running })
        ));
    }

    #[test]
    fn test_pause_requires_running() {
        let mut ctl = controller("Oscillator");
        assert!(ctl.pause().is_err());
    }

    #[test]
    fn test_tick_fires_once_per_interval() {
        let mut ctl = controller("Oscillator");
        ctl.set_interval(ms(100));
        let t0 = Instant::now();

        assert_eq!(ctl.tick(t0), None, "idle controllers do not tick");

        ctl.start(t0).unwrap();
        assert_eq!(ctl.next_tick(), Some(t0));
        assert!(ctl.tick(t0).is_some());
        assert_eq!(ctl.next_tick(), Some(t0 + ms(100)));

        assert_eq!(ctl.tick(t0 + ms(50)), None);
        assert_eq!(ctl.machine().step_count(), 1);

        assert!(ctl.tick(t0 + ms(100)).is_some());
        assert_eq!(ctl.machine().step_count(), 2);
    }

    #[test]
    fn test_late_tick_runs_a_single_step() {
        let mut ctl = controller("Oscillator");
        ctl.set_interval(ms(10));
        let t0 = Instant::now();
        ctl.start(t0).unwrap();

        ctl.tick(t0 + ms(1000));
        assert_eq!(ctl.machine().step_count(), 1);
        assert_eq!(ctl.next_tick(), Some(t0 + ms(1010)));
    }

    #[test]
    fn test_pause_cancels_pending_tick() {
        let mut ctl = controller("Oscillator");
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        ctl.tick(t0);

        ctl.pause().unwrap();
        assert_eq!(ctl.next_tick(), None);
        assert_eq!(ctl.tick(t0 + ms(10_000)), None);
        assert_eq!(ctl.machine().step_count(), 1);

        ctl.start(t0 + ms(20_000)).unwrap();
        assert!(ctl.tick(t0 + ms(20_000)).is_some());
        assert_eq!(ctl.machine().step_count(), 2);
    }

    #[test]
    fn test_tick_reaches_halted_and_disarms() {
        let mut ctl = controller("Binary Increment");
        ctl.set_interval(ms(1));
        let mut now = Instant::now();
        ctl.start(now).unwrap();

        while ctl.status() == Status::Running {
            ctl.tick(now);
            now += ms(1);
        }

        assert_eq!(ctl.status(), Status::Halted);
        assert_eq!(ctl.next_tick(), None);
        assert_eq!(ctl.machine().tape().to_string(), "1100");
        assert_eq!(ctl.tick(now + ms(100)), None);
        assert!(ctl.start(now).is_err());
    }

    #[test]
    fn test_reset_restores_initial_machine() {
        let mut ctl = controller("Binary Increment");
        let t0 = Instant::now();
        ctl.run_to_halt().unwrap();
        assert_eq!(ctl.status(), Status::Halted);

        ctl.reset();
        assert_eq!(ctl.status(), Status::Idle);
        assert_eq!(ctl.machine().step_count(), 0);
        assert_eq!(ctl.machine().tape().to_string(), "1011");
        assert_eq!(ctl.machine().head(), 0);
        assert_eq!(ctl.machine().state(), "start");
        assert!(ctl.log().is_empty());

        ctl.start(t0).unwrap();
        ctl.reset();
        assert_eq!(ctl.next_tick(), None);
        assert_eq!(ctl.tick(t0), None);
    }

    #[test]
    fn test_log_snapshots_precede_the_write() {
        let mut ctl = controller("Binary Increment");
        ctl.run_to_halt().unwrap();

        let entries: Vec<&LogEntry> = ctl.log().iter().collect();
        // 4 applied steps to the right end, 1 turn, 3 carries, then the halting attempt
        assert_eq!(entries.len(), 9);
        assert_eq!(entries[0].step, 1);
        assert_eq!(entries[0].state, "start");
        assert_eq!(entries[0].tape_snippet, "1011");

        // The first carry step reads '1' at position 3 before writing '0'
        assert_eq!(entries[5].state, "carry");
        assert_eq!(entries[5].head, 3);
        assert_eq!(entries[5].tape_snippet, "1011");
        assert_eq!(entries[6].tape_snippet, "1010");

        let last = ctl.log().latest().unwrap();
        assert_eq!(last.step, 9);
        assert_eq!(last.state, "done");
        assert_eq!(last.tape_snippet, "1100");
        assert_eq!(ctl.machine().step_count(), 8);
    }

    #[test]
    fn test_max_steps_guard_pauses() {
        let preset = PresetManager::get_by_name("Oscillator").unwrap();
        let config = ControllerConfig {
            max_steps: Some(25),
            ..ControllerConfig::default()
        };
        let mut ctl = RunController::new(preset, config);

        assert_eq!(ctl.run_to_halt().unwrap(), Status::Paused);
        assert_eq!(ctl.machine().step_count(), 25);
        assert_eq!(ctl.next_tick(), None);
    }

    #[test]
    fn test_zero_max_steps_means_no_limit() {
        let preset = PresetManager::get_by_name("Binary Increment").unwrap();
        let config = ControllerConfig {
            max_steps: Some(0),
            ..ControllerConfig::default()
        };
        let mut ctl = RunController::new(preset, config);

        assert_eq!(ctl.run_to_halt().unwrap(), Status::Halted);
        assert_eq!(ctl.machine().step_count(), 8);
        assert_eq!(ctl.machine().tape().to_string(), "1100");
    }

    #[test]
    fn test_oversized_arithmetic_keeps_current_machine() {
        let mut ctl = controller("Binary Increment");
        ctl.step().unwrap();
        let before = ctl.machine().clone();

        assert!(matches!(
            ctl.load_arithmetic(i64::MAX, Operator::Add, 1),
            Err(MachineError::ValidationError(_))
        ));
        assert_eq!(ctl.machine(), &before);
        assert_eq!(ctl.origin(), Origin::Preset);
        assert_eq!(ctl.preset().name, "Binary Increment");
    }

    #[test]
    fn test_log_is_bounded() {
        let preset = PresetManager::get_by_name("Oscillator").unwrap();
        let config = ControllerConfig {
            log_capacity: 16,
            max_steps: Some(500),
            ..ControllerConfig::default()
        };
        let mut ctl = RunController::new(preset, config);
        ctl.run_to_halt().unwrap();

        assert_eq!(ctl.log().len(), 16);
        assert_eq!(ctl.log().recorded(), 500);
        assert_eq!(ctl.log().iter().next().map(|e| e.step), Some(485));
    }

    #[test]
    fn test_arithmetic_outcome_is_decoded() {
        let mut ctl = controller("Binary Increment");
        ctl.load_arithmetic(4, Operator::Add, 3).unwrap();

        assert_eq!(ctl.origin(), Origin::Arithmetic(Operator::Add));
        assert_eq!(ctl.machine().tape().to_string(), "1111+111");
        ctl.run_to_halt().unwrap();
        assert_eq!(ctl.outcome(), Some(Outcome::Value(7)));

        ctl.reset();
        assert_eq!(ctl.origin(), Origin::Arithmetic(Operator::Add));
    }

    #[test]
    fn test_standard_outcome_uses_markers() {
        let mut ctl = controller("Palindrome Checker");
        ctl.run_to_halt().unwrap();
        assert_eq!(ctl.outcome(), Some(Outcome::Accepted));

        let mut ctl = controller("Binary Increment");
        ctl.run_to_halt().unwrap();
        assert_eq!(ctl.outcome(), Some(Outcome::Raw("1100".into())));
    }

    #[test]
    fn test_load_replaces_everything() {
        let mut ctl = controller("Oscillator");
        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        ctl.tick(t0);

        ctl.load(PresetManager::get_by_name("Binary Increment").unwrap());
        assert_eq!(ctl.status(), Status::Idle);
        assert_eq!(ctl.next_tick(), None);
        assert_eq!(ctl.machine().step_count(), 0);
        assert!(ctl.log().is_empty());
        assert_eq!(ctl.origin(), Origin::Preset);
        assert_eq!(ctl.tick(t0 + ms(10_000)), None);
    }

    #[test]
    fn test_failed_generation_leaves_machine_unchanged() {
        let mut ctl = controller("Binary Increment");
        ctl.step().unwrap();
        let before = ctl.machine().clone();

        let failing = |_: &str| -> Result<Preset, GenerationError> { parse_response("no json here") };
        assert!(matches!(
            ctl.load_generated(&failing, "add one"),
            Err(MachineError::Generation(_))
        ));

        assert_eq!(ctl.machine(), &before);
        assert_eq!(ctl.log().len(), 1);
        assert_eq!(ctl.preset().name, "Binary Increment");
    }

    #[test]
    fn test_generated_preset_without_rules_halts_on_first_step() {
        let mut ctl = controller("Binary Increment");
        let empty = |_: &str| -> Result<Preset, GenerationError> {
            parse_response(r#"{"rules": [], "initialTape": "1", "initialState": "q0"}"#)
        };

        ctl.load_generated(&empty, "anything").unwrap();
        assert_eq!(ctl.step().unwrap(), StepOutcome::Halted);
        assert_eq!(ctl.status(), Status::Halted);
        assert_eq!(ctl.machine().step_count(), 0);
        assert_eq!(ctl.log().len(), 1);
    }

    #[test]
    fn test_next_rule_tracks_head() {
        let preset = Preset {
            name: "one".into(),
            description: String::new(),
            rules: vec![
                TransitionRule::new("q0", '1', '1', Direction::Right, "q0"),
                TransitionRule::new("q0", BLANK, BLANK, Direction::Stay, "done"),
            ],
            initial_tape: "1".into(),
            initial_state: "q0".into(),
        };
        let mut ctl = RunController::new(preset, ControllerConfig::default());

        assert_eq!(ctl.next_rule(), Some(0));
        ctl.step().unwrap();
        assert_eq!(ctl.next_rule(), Some(1));
        ctl.step().unwrap();
        assert_eq!(ctl.next_rule(), None);
    }
}
