use proptest::prelude::*;
use std::time::{Duration, Instant};
use turing_sim::{
    step, ControllerConfig, GenerationError, MachineError, MachineState, Operator, Outcome,
    Preset, PresetManager, RunController, Status, StepOutcome,
};

fn preset(name: &str) -> Preset {
    PresetManager::get_by_name(name).unwrap()
}

fn run(preset: Preset) -> RunController {
    let config = ControllerConfig {
        max_steps: Some(100_000),
        ..ControllerConfig::default()
    };
    let mut controller = RunController::new(preset, config);
    controller.run_to_halt().unwrap();
    controller
}

fn arithmetic(a: i64, op: Operator, b: i64) -> Option<Outcome> {
    let mut controller = RunController::new(preset("Binary Increment"), ControllerConfig::default());
    controller.load_arithmetic(a, op, b).unwrap();
    controller.run_to_halt().unwrap();
    controller.outcome()
}

#[test]
fn binary_increment_carries() {
    let controller = run(preset("Binary Increment"));

    assert_eq!(controller.status(), Status::Halted);
    assert_eq!(controller.machine().tape().to_string(), "1100");
    assert_eq!(controller.machine().state(), "done");
}

#[test]
fn binary_increment_grows_on_overflow() {
    let controller = run(preset("Binary Increment").with_tape("111"));
    assert_eq!(controller.machine().tape().to_string(), "1000");
    assert_eq!(controller.machine().head(), -1);
}

#[test]
fn unary_addition() {
    assert_eq!(arithmetic(3, Operator::Add, 2), Some(Outcome::Value(5)));
    assert_eq!(arithmetic(0, Operator::Add, 0), Some(Outcome::Value(0)));
}

#[test]
fn unary_subtraction_truncates() {
    assert_eq!(arithmetic(3, Operator::Subtract, 2), Some(Outcome::Value(1)));
    assert_eq!(arithmetic(2, Operator::Subtract, 5), Some(Outcome::Value(0)));
    assert_eq!(arithmetic(4, Operator::Subtract, 0), Some(Outcome::Value(4)));
}

#[test]
fn negative_operands_clamp_to_zero() {
    assert_eq!(arithmetic(-3, Operator::Add, 2), Some(Outcome::Value(2)));
}

#[test]
fn palindrome_accepts_and_rejects() {
    let accepted = run(preset("Palindrome Checker"));
    assert!(accepted.machine().tape().to_string().contains('Y'));
    assert_eq!(accepted.outcome(), Some(Outcome::Accepted));

    for tape in ["10", "1101", "100"] {
        let rejected = run(preset("Palindrome Checker").with_tape(tape));
        assert!(!rejected.machine().tape().to_string().contains('Y'), "{tape}");
        assert_eq!(rejected.outcome(), Some(Outcome::Rejected), "{tape}");
    }

    for tape in ["", "0", "101", "0110"] {
        let accepted = run(preset("Palindrome Checker").with_tape(tape));
        assert_eq!(accepted.outcome(), Some(Outcome::Accepted), "{tape}");
    }
}

#[test]
fn busy_beaver_halts_after_six_steps() {
    let controller = run(preset("Busy Beaver (2-state)"));

    assert_eq!(controller.machine().step_count(), 6);
    assert_eq!(controller.machine().tape().to_string(), "1111");
}

#[test]
fn oscillator_never_halts() {
    let config = ControllerConfig {
        max_steps: Some(10_000),
        ..ControllerConfig::default()
    };
    let mut controller = RunController::new(preset("Oscillator"), config);

    assert_eq!(controller.run_to_halt().unwrap(), Status::Paused);
    assert_eq!(controller.machine().step_count(), 10_000);
    assert_ne!(controller.status(), Status::Halted);
    assert_eq!(controller.outcome(), None);
}

#[test]
fn halting_step_is_not_counted() {
    let preset = preset("Binary Increment");
    let mut machine = MachineState::new(&preset.initial_tape, &preset.initial_state);

    let mut applied = 0;
    while let StepOutcome::Applied(_) = step(&mut machine, &preset.rules) {
        applied += 1;
        assert_eq!(machine.step_count(), applied);
    }

    assert_eq!(machine.step_count(), applied);
    assert!(machine.is_halted());

    // Stepping a halted machine changes nothing
    let before = machine.clone();
    assert_eq!(step(&mut machine, &preset.rules), StepOutcome::Halted);
    assert_eq!(machine, before);
}

#[test]
fn timed_run_matches_synchronous_run() {
    let synchronous = run(preset("Palindrome Checker"));

    let mut timed = RunController::new(preset("Palindrome Checker"), ControllerConfig::default());
    timed.set_interval(Duration::from_millis(20));
    let mut now = Instant::now();
    timed.start(now).unwrap();

    let mut paused_once = false;
    while timed.status() != Status::Halted {
        if let Some(due) = timed.next_tick() {
            now = due;
        }
        timed.tick(now);

        if !paused_once && timed.machine().step_count() == 3 {
            timed.pause().unwrap();
            timed.start(now).unwrap();
            paused_once = true;
        }
    }

    assert_eq!(timed.machine(), synchronous.machine());
    assert_eq!(
        timed.log().iter().collect::<Vec<_>>(),
        synchronous.log().iter().collect::<Vec<_>>()
    );
}

#[test]
fn failed_generation_keeps_running_machine() {
    let mut controller = RunController::new(preset("Oscillator"), ControllerConfig::default());
    let now = Instant::now();
    controller.start(now).unwrap();
    controller.tick(now);

    let failing = |_: &str| -> Result<Preset, GenerationError> { Err(GenerationError::Empty) };
    let error = controller.load_generated(&failing, "something").unwrap_err();

    assert!(matches!(error, MachineError::Generation(GenerationError::Empty)));
    assert_eq!(controller.status(), Status::Running);
    assert_eq!(controller.machine().step_count(), 1);
    assert_eq!(controller.preset().name, "Oscillator");
    assert!(controller.next_tick().is_some());
}

proptest! {
    #[test]
    fn runs_are_deterministic(tape in "[01]{0,10}") {
        let first = run(preset("Palindrome Checker").with_tape(tape.clone()));
        let second = run(preset("Palindrome Checker").with_tape(tape));

        prop_assert_eq!(first.machine(), second.machine());
        prop_assert_eq!(
            first.log().iter().collect::<Vec<_>>(),
            second.log().iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn binary_increment_adds_one(tape in "[01]{0,12}") {
        let controller = run(preset("Binary Increment").with_tape(tape.clone()));
        let before = if tape.is_empty() { 0 } else { u64::from_str_radix(&tape, 2).unwrap() };
        let after = u64::from_str_radix(&controller.machine().tape().to_string(), 2).unwrap();

        prop_assert_eq!(after, before + 1);
    }

    #[test]
    fn unary_arithmetic_matches_integers(a in -3i64..15, b in -3i64..15) {
        for op in [Operator::Add, Operator::Subtract] {
            let expected = op.apply(a, b) as usize;
            prop_assert_eq!(arithmetic(a, op, b), Some(Outcome::Value(expected)));
        }
        prop_assert_eq!(Operator::Add.apply(a, b), (a.max(0) + b.max(0)) as u64);
        prop_assert_eq!(Operator::Subtract.apply(a, b), (a.max(0) - b.max(0)).max(0) as u64);
    }

    #[test]
    fn step_count_never_decreases(tape in "[01]{0,8}", steps in 0usize..200) {
        let preset = preset("Palindrome Checker").with_tape(tape);
        let mut machine = MachineState::new(&preset.initial_tape, &preset.initial_state);

        for _ in 0..steps {
            let before = machine.step_count();
            match step(&mut machine, &preset.rules) {
                StepOutcome::Applied(_) => prop_assert_eq!(machine.step_count(), before + 1),
                StepOutcome::Halted => prop_assert_eq!(machine.step_count(), before),
            }
        }
    }
}
