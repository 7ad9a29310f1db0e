//! This module defines the core data structures and types used throughout the Turing Machine
//! simulator, including rule representation, presets, run status, step outcomes, and error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::generator::GenerationError;
use crate::Rule;

/// A single tape cell value.
pub type Symbol = char;

/// The reserved blank symbol. Blank cells are never stored on the tape.
pub const BLANK: Symbol = '_';
/// The maximum allowed size for a preset source in bytes.
pub const MAX_PRESET_SIZE: usize = 65536; // 64KB
/// Default number of milliseconds between two automatic steps.
pub const DEFAULT_INTERVAL_MS: u64 = 500;
/// Default number of entries kept by the execution log.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;
/// Default step guard used by headless runners.
pub const MAX_EXECUTION_STEPS: u64 = 10000;

/// Represents the possible directions the head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    #[serde(rename = "L", alias = "Left")]
    Left,
    /// Move the head one position to the right.
    #[serde(rename = "R", alias = "Right")]
    Right,
    /// Keep the head in the same position.
    #[serde(rename = "N", alias = "S", alias = "Stay")]
    Stay,
}

impl Direction {
    /// The head offset applied by this move.
    pub fn offset(self) -> i64 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Stay => 'N',
        };
        write!(f, "{c}")
    }
}

/// A single transition rule: `(current_state, read_symbol) -> (write_symbol, direction, next_state)`.
///
/// Rules are kept in an ordered list. When more than one rule matches the same
/// `(state, symbol)` pair, the first one in authoring order wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRule {
    /// The state this rule applies to.
    pub current_state: String,
    /// The symbol that must be under the head.
    pub read_symbol: Symbol,
    /// The symbol written under the head.
    pub write_symbol: Symbol,
    /// Where the head moves after writing.
    #[serde(rename = "moveDirection")]
    pub direction: Direction,
    /// The state the machine transitions to.
    pub next_state: String,
}

impl TransitionRule {
    pub fn new(
        current_state: impl Into<String>,
        read_symbol: Symbol,
        write_symbol: Symbol,
        direction: Direction,
        next_state: impl Into<String>,
    ) -> Self {
        Self {
            current_state: current_state.into(),
            read_symbol,
            write_symbol,
            direction,
            next_state: next_state.into(),
        }
    }

    /// Checks whether this rule fires for the given state and symbol.
    pub fn matches(&self, state: &str, symbol: Symbol) -> bool {
        self.current_state == state && self.read_symbol == symbol
    }
}

impl fmt::Display for TransitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} -> {}, {}, {}",
            self.current_state, self.read_symbol, self.write_symbol, self.direction, self.next_state
        )
    }
}

/// A loadable machine definition: a rule set plus the initial tape and state.
///
/// This is the shape consumed from the built-in registry, from `.tm`/`.json` files,
/// and from the rule-generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rules: Vec<TransitionRule>,
    pub initial_tape: String,
    pub initial_state: String,
}

impl Preset {
    /// Returns a copy of this preset with a different initial tape.
    pub fn with_tape(&self, tape: impl Into<String>) -> Self {
        Self {
            initial_tape: tape.into(),
            ..self.clone()
        }
    }

    /// Returns the distinct states named by the rules, in first-seen order.
    pub fn states(&self) -> Vec<&str> {
        let mut states: Vec<&str> = Vec::new();
        for rule in &self.rules {
            for state in [rule.current_state.as_str(), rule.next_state.as_str()] {
                if !states.contains(&state) {
                    states.push(state);
                }
            }
        }
        states
    }
}

/// Lifecycle status of a machine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Freshly loaded or reset.
    #[default]
    Idle,
    /// Actively stepping on a timer.
    Running,
    /// Stopped mid-run, resumable.
    Paused,
    /// Terminal: no rule matched the current state and symbol.
    Halted,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "IDLE",
            Status::Running => "RUNNING",
            Status::Paused => "PAUSED",
            Status::Halted => "HALTED",
        };
        f.write_str(s)
    }
}

/// Represents the outcome of a single engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The rule at this index was applied.
    Applied(usize),
    /// No rule matched; the machine has halted.
    Halted,
}

/// Interpretation of a halted machine's final tape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The tape contains a `Y`.
    Accepted,
    /// The tape contains an `N` and no `Y`.
    Rejected,
    /// A decoded unary result.
    Value(usize),
    /// No interpretation applies; the raw final tape.
    Raw(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Accepted => f.write_str("Accepted"),
            Outcome::Rejected => f.write_str("Rejected"),
            Outcome::Value(n) => write!(f, "{n}"),
            Outcome::Raw(tape) => write!(f, "\"{tape}\""),
        }
    }
}

/// Represents various errors that can occur while loading or controlling a machine.
#[derive(Debug, Error)]
pub enum MachineError {
    /// Indicates an error during the parsing of a `.tm` preset.
    #[error("Preset parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates a structural or logical problem with a preset.
    #[error("Preset validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
    /// A control action was requested from a status that does not allow it.
    #[error("Cannot {action} while {status}")]
    InvalidControl { action: &'static str, status: Status },
    /// The rule-generation collaborator failed or returned an unusable response.
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}
