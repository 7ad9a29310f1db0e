//! This module provides an optional validation pass over presets. It reports conflicting rules,
//! a start state without rules, unreachable states, and unhandled tape symbols.
//!
//! The engine never consults these findings: a preset with conflicts still runs, and the first
//! rule in authoring order wins. Callers that want strict loading run [`validate`] first.

use crate::tape::Tape;
use crate::types::{MachineError, Preset, Symbol};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Two or more rules share the same `(state, symbol)` pair.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RuleConflict {
    pub state: String,
    pub symbol: Symbol,
    /// Rule indices in authoring order. The first one is the rule that fires.
    pub indices: Vec<usize>,
}

/// Represents the findings of the analysis of a preset.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisError {
    /// Rules that can never fire because an earlier rule shadows them.
    ConflictingRules(Vec<RuleConflict>),
    /// The initial state has no rules, so the machine halts on its first step.
    InvalidStartState(String),
    /// States that have rules but cannot be reached from the initial state.
    UnreachableStates(Vec<String>),
    /// Symbols on the initial tape that no rule reads.
    InvalidTapeSymbols(Vec<Symbol>),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::ConflictingRules(conflicts) => {
                let list = conflicts
                    .iter()
                    .map(|c| format!("({}, {}) at rules {:?}", c.state, c.symbol, c.indices))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Conflicting rules, first match wins: {list}")
            }
            AnalysisError::InvalidStartState(state) => {
                write!(f, "Invalid start state: {state} has no rules")
            }
            AnalysisError::UnreachableStates(states) => {
                write!(f, "Unreachable states detected: {states:?}")
            }
            AnalysisError::InvalidTapeSymbols(symbols) => write!(
                f,
                "Initial tape contains symbols not handled by any rule: {symbols:?}"
            ),
        }
    }
}

impl From<AnalysisError> for MachineError {
    /// Converts an `AnalysisError` into a `MachineError::ValidationError`.
    fn from(error: AnalysisError) -> Self {
        MachineError::ValidationError(error.to_string())
    }
}

/// Runs every check and returns all findings. An empty list means the preset is clean.
pub fn analyze(preset: &Preset) -> Vec<AnalysisError> {
    [
        check_conflicts,
        check_valid_start_state,
        check_unreachable_states,
        check_tape_symbols,
    ]
    .iter()
    .filter_map(|f| f(preset).err())
    .collect()
}

/// Strict pre-load check: fails with the first finding.
pub fn validate(preset: &Preset) -> Result<(), MachineError> {
    match analyze(preset).into_iter().next() {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// Lists every `(state, symbol)` pair claimed by more than one rule.
pub fn conflicts(preset: &Preset) -> Vec<RuleConflict> {
    let mut seen: HashMap<(&str, Symbol), Vec<usize>> = HashMap::new();
    let mut order = Vec::new();

    for (i, rule) in preset.rules.iter().enumerate() {
        let key = (rule.current_state.as_str(), rule.read_symbol);
        let indices = seen.entry(key).or_default();
        if indices.is_empty() {
            order.push(key);
        }
        indices.push(i);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let indices = seen.remove(&key)?;
            (indices.len() > 1).then(|| RuleConflict {
                state: key.0.to_string(),
                symbol: key.1,
                indices,
            })
        })
        .collect()
}

fn check_conflicts(preset: &Preset) -> Result<(), AnalysisError> {
    let conflicts = conflicts(preset);
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::ConflictingRules(conflicts))
    }
}

/// Checks whether the initial state has at least one rule.
fn check_valid_start_state(preset: &Preset) -> Result<(), AnalysisError> {
    if !preset
        .rules
        .iter()
        .any(|rule| rule.current_state == preset.initial_state)
    {
        return Err(AnalysisError::InvalidStartState(
            preset.initial_state.clone(),
        ));
    }

    Ok(())
}

/// Checks for unreachable states by a depth-first traversal from the initial state.
///
/// Only states that own rules are reported; states that are pure targets are where
/// the machine halts.
fn check_unreachable_states(preset: &Preset) -> Result<(), AnalysisError> {
    let mut visited = HashSet::new();
    let mut queue = vec![preset.initial_state.as_str()];

    while let Some(state) = queue.pop() {
        if !visited.insert(state) {
            continue;
        }

        for rule in preset.rules.iter().filter(|r| r.current_state == state) {
            if !visited.contains(rule.next_state.as_str()) {
                queue.push(rule.next_state.as_str());
            }
        }
    }

    let mut unreachable: Vec<String> = preset
        .rules
        .iter()
        .map(|rule| rule.current_state.as_str())
        .filter(|state| !visited.contains(state))
        .map(str::to_string)
        .collect();

    if !unreachable.is_empty() {
        unreachable.sort(); // Sort for deterministic output
        unreachable.dedup();
        return Err(AnalysisError::UnreachableStates(unreachable));
    }

    Ok(())
}

/// Checks that every symbol on the initial tape is read by at least one rule.
fn check_tape_symbols(preset: &Preset) -> Result<(), AnalysisError> {
    let handled: HashSet<Symbol> = preset.rules.iter().map(|rule| rule.read_symbol).collect();

    let mut unhandled: Vec<Symbol> = Tape::parse(&preset.initial_tape)
        .cells()
        .map(|(_, symbol)| symbol)
        .filter(|symbol| !handled.contains(symbol))
        .collect();

    if !unhandled.is_empty() {
        unhandled.sort();
        unhandled.dedup();
        return Err(AnalysisError::InvalidTapeSymbols(unhandled));
    }

    Ok(())
}
