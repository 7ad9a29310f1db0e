//! Unary arithmetic on the tape.
//!
//! Operands are written as runs of `1` around the operator character and run by
//! the matching built-in preset. After the machine halts, the count of `1`s on
//! the final tape is the result.

use crate::presets::{PresetManager, ADDITION_PRESET, SUBTRACTION_PRESET};
use crate::types::{MachineError, Outcome, Preset, BLANK, MAX_PRESET_SIZE};
use std::fmt;
use std::str::FromStr;

/// The unary digit.
pub const UNARY_DIGIT: char = '1';

/// A supported arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    /// Truncated subtraction: the result never goes below zero.
    Subtract,
}

impl Operator {
    /// The character written on the tape between the operands.
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
        }
    }

    fn preset_name(self) -> &'static str {
        match self {
            Operator::Add => ADDITION_PRESET,
            Operator::Subtract => SUBTRACTION_PRESET,
        }
    }

    /// The exact integer answer the machine is expected to produce.
    pub fn apply(self, a: i64, b: i64) -> u64 {
        let (a, b) = (clamp(a) as u64, clamp(b) as u64);
        match self {
            Operator::Add => a + b,
            Operator::Subtract => a.saturating_sub(b),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl TryFrom<char> for Operator {
    type Error = MachineError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            '+' => Ok(Operator::Add),
            '-' | '−' => Ok(Operator::Subtract),
            other => Err(MachineError::ValidationError(format!(
                "Unsupported operator: {other}"
            ))),
        }
    }
}

impl FromStr for Operator {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Operator::try_from(c),
            _ => Err(MachineError::ValidationError(format!(
                "Unsupported operator: {s}"
            ))),
        }
    }
}

/// A parsed `a <op> b` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expression {
    pub left: i64,
    pub operator: Operator,
    pub right: i64,
}

impl FromStr for Expression {
    type Err = MachineError;

    /// Parses expressions such as `3+2` or `7 - 4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MachineError::ValidationError(format!("Invalid expression: {s}"));
        let s = s.trim();

        // Skip the first character so a leading sign stays with the left operand
        let (split, op) = s
            .char_indices()
            .skip(1)
            .find_map(|(i, c)| Operator::try_from(c).ok().map(|op| (i, op)))
            .ok_or_else(invalid)?;

        let left = s[..split].trim().parse().map_err(|_| invalid())?;
        let right = s[split + op_len(s, split)..]
            .trim()
            .parse()
            .map_err(|_| invalid())?;

        Ok(Expression {
            left,
            operator: op,
            right,
        })
    }
}

fn op_len(s: &str, at: usize) -> usize {
    s[at..].chars().next().map_or(1, char::len_utf8)
}

fn clamp(n: i64) -> usize {
    usize::try_from(n.max(0)).unwrap_or(usize::MAX)
}

/// Builds the initial tape for `a <op> b`. Negative operands become empty runs.
///
/// Fails when the tape would be longer than `MAX_PRESET_SIZE` cells.
pub fn encode_tape(a: i64, op: Operator, b: i64) -> Result<String, MachineError> {
    let (ones_a, ones_b) = (clamp(a), clamp(b));
    let len = ones_a
        .checked_add(ones_b)
        .and_then(|n| n.checked_add(1))
        .filter(|&n| n <= MAX_PRESET_SIZE)
        .ok_or_else(|| {
            MachineError::ValidationError(format!(
                "Operands of {} {} {} exceed the {} cell tape limit",
                a.max(0),
                op,
                b.max(0),
                MAX_PRESET_SIZE
            ))
        })?;

    let mut tape = String::with_capacity(len);
    tape.extend(std::iter::repeat(UNARY_DIGIT).take(ones_a));
    tape.push(op.symbol());
    tape.extend(std::iter::repeat(UNARY_DIGIT).take(ones_b));
    Ok(tape)
}

/// Builds a ready-to-load preset computing `a <op> b`.
pub fn encode(a: i64, op: Operator, b: i64) -> Result<Preset, MachineError> {
    let tape = encode_tape(a, op, b)?;
    let base = PresetManager::get_by_name(op.preset_name())?;
    let mut preset = base.with_tape(tape);
    preset.name = format!("{} {} {}", a.max(0), op, b.max(0));
    Ok(preset)
}

/// Decodes a serialized final tape.
///
/// A tape of only `1`s and blanks decodes to the number of `1`s. Anything else
/// is returned as `Outcome::Raw`.
pub fn decode(tape: &str) -> Outcome {
    if tape.chars().all(|c| c == UNARY_DIGIT || c == BLANK) {
        Outcome::Value(tape.chars().filter(|&c| c == UNARY_DIGIT).count())
    } else {
        Outcome::Raw(tape.to_string())
    }
}
