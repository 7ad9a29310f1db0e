//! This module defines `MachineState` and the transition engine that advances it.
//!
//! The engine is a pure function of the rule list and the machine state: it reads
//! the symbol under the head, finds the first matching rule, and applies it in
//! full, or reports a halt. No randomness, no clock.

use crate::tape::Tape;
use crate::types::{Status, StepOutcome, Symbol, TransitionRule};
use tracing::debug;

/// The complete run-time configuration of a single-tape machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    pub(crate) tape: Tape,
    pub(crate) head: i64,
    pub(crate) state: String,
    pub(crate) status: Status,
    pub(crate) step_count: u64,
}

impl MachineState {
    /// Creates an idle machine with the head at position 0.
    pub fn new(initial_tape: &str, initial_state: impl Into<String>) -> Self {
        Self {
            tape: Tape::parse(initial_tape),
            head: 0,
            state: initial_state.into(),
            status: Status::Idle,
            step_count: 0,
        }
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn head(&self) -> i64 {
        self.head
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of rules applied since the last load or reset.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// The symbol currently under the head.
    pub fn symbol(&self) -> Symbol {
        self.tape.read(self.head)
    }

    pub fn is_halted(&self) -> bool {
        self.status == Status::Halted
    }
}

/// Finds the index of the first rule matching `state` and `symbol`.
///
/// Conflicting rules for the same pair are resolved by list order.
pub fn find_rule(rules: &[TransitionRule], state: &str, symbol: Symbol) -> Option<usize> {
    rules.iter().position(|rule| rule.matches(state, symbol))
}

/// Executes a single step of the machine.
///
/// # Returns
///
/// * `StepOutcome::Applied(index)` if the rule at `index` was written, moved, and transitioned.
/// * `StepOutcome::Halted` if no rule matches. The status becomes `Halted` and nothing else changes.
pub fn step(machine: &mut MachineState, rules: &[TransitionRule]) -> StepOutcome {
    let symbol = machine.symbol();

    let Some(index) = find_rule(rules, &machine.state, symbol) else {
        machine.status = Status::Halted;
        debug!(state = %machine.state, %symbol, steps = machine.step_count, "no matching rule");
        return StepOutcome::Halted;
    };

    let rule = &rules[index];
    machine.tape.write(machine.head, rule.write_symbol);
    machine.state.clone_from(&rule.next_state);
    machine.head += rule.direction.offset();
    machine.step_count += 1;

    debug!(step = machine.step_count, rule = index, head = machine.head, state = %machine.state, "applied rule");
    StepOutcome::Applied(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, BLANK};

    fn flip_rules() -> Vec<TransitionRule> {
        vec![
            TransitionRule::new("start", 'a', 'b', Direction::Right, "start"),
            TransitionRule::new("start", 'b', 'a', Direction::Right, "start"),
            TransitionRule::new("start", BLANK, BLANK, Direction::Left, "back"),
            TransitionRule::new("back", 'a', 'a', Direction::Left, "back"),
            TransitionRule::new("back", 'b', 'b', Direction::Left, "back"),
        ]
    }

    #[test]
    fn test_machine_creation() {
        let machine = MachineState::new("ab", "start");

        assert_eq!(machine.state(), "start");
        assert_eq!(machine.tape().to_string(), "ab");
        assert_eq!(machine.head(), 0);
        assert_eq!(machine.status(), Status::Idle);
        assert_eq!(machine.step_count(), 0);
        assert_eq!(machine.symbol(), 'a');
    }

    #[test]
    fn test_single_step_applies_rule() {
        let rules = flip_rules();
        let mut machine = MachineState::new("ab", "start");

        assert_eq!(step(&mut machine, &rules), StepOutcome::Applied(0));
        assert_eq!(machine.tape().to_string(), "bb");
        assert_eq!(machine.head(), 1);
        assert_eq!(machine.state(), "start");
        assert_eq!(machine.step_count(), 1);
    }

    #[test]
    fn test_head_moves_left_past_origin() {
        let rules = flip_rules();
        let mut machine = MachineState::new("ab", "start");

        let mut outcome = StepOutcome::Applied(0);
        while outcome != StepOutcome::Halted {
            outcome = step(&mut machine, &rules);
        }

        // flip a, flip b, turn around, walk back over two cells, halt on blank at -1
        assert_eq!(machine.head(), -1);
        assert_eq!(machine.state(), "back");
        assert_eq!(machine.tape().to_string(), "ba");
        assert_eq!(machine.step_count(), 5);
        assert!(machine.is_halted());
    }

    #[test]
    fn test_halt_does_not_count_or_mutate() {
        let rules = vec![TransitionRule::new("q0", 'x', 'y', Direction::Stay, "q0")];
        let mut machine = MachineState::new("a", "q0");
        let before = machine.clone();

        assert_eq!(step(&mut machine, &rules), StepOutcome::Halted);
        assert_eq!(machine.step_count(), 0);
        assert_eq!(machine.tape(), before.tape());
        assert_eq!(machine.head(), before.head());
        assert_eq!(machine.state(), before.state());
        assert_eq!(machine.status(), Status::Halted);
    }

    #[test]
    fn test_empty_rules_halt_immediately() {
        let mut machine = MachineState::new("1011", "start");
        assert_eq!(step(&mut machine, &[]), StepOutcome::Halted);
    }

    #[test]
    fn test_first_match_wins_on_conflict() {
        let rules = vec![
            TransitionRule::new("q0", '1', 'A', Direction::Stay, "first"),
            TransitionRule::new("q0", '1', 'B', Direction::Stay, "second"),
        ];
        let mut machine = MachineState::new("1", "q0");

        assert_eq!(find_rule(&rules, "q0", '1'), Some(0));
        assert_eq!(step(&mut machine, &rules), StepOutcome::Applied(0));
        assert_eq!(machine.tape().to_string(), "A");
        assert_eq!(machine.state(), "first");
    }

    #[test]
    fn test_writing_blank_erases_cell() {
        let rules = vec![TransitionRule::new("q0", '1', BLANK, Direction::Right, "q0")];
        let mut machine = MachineState::new("11", "q0");

        step(&mut machine, &rules);
        step(&mut machine, &rules);

        assert!(machine.tape().is_empty());
        assert_eq!(machine.step_count(), 2);
    }

    #[test]
    fn test_rule_reading_blank_matches_empty_cell() {
        let rules = vec![TransitionRule::new("q0", BLANK, '1', Direction::Stay, "done")];
        let mut machine = MachineState::new("", "q0");

        assert_eq!(step(&mut machine, &rules), StepOutcome::Applied(0));
        assert_eq!(machine.tape().to_string(), "1");
    }
}
