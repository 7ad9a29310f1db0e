//! This crate provides the core logic for a deterministic single-tape Turing machine.
//! It includes the tape and transition engine, a run controller with pause/resume and a
//! bounded execution log, unary arithmetic, a preset library with a text format, and an
//! optional validation pass.

pub mod analyzer;
pub mod arithmetic;
pub mod config;
pub mod controller;
pub mod generator;
pub mod history;
pub mod loader;
pub mod machine;
pub mod outcome;
pub mod parser;
pub mod presets;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the validation pass.
pub use analyzer::{analyze, validate, AnalysisError, RuleConflict};
/// Re-exports unary arithmetic helpers.
pub use arithmetic::{Expression, Operator};
pub use config::ControllerConfig;
/// Re-exports the `RunController` and how its machine was loaded.
pub use controller::{Origin, RunController};
pub use generator::{CommandGenerator, GenerationError, RuleGenerator};
pub use history::{ExecutionLog, LogEntry};
/// Re-exports the `PresetLoader` struct from the loader module.
pub use loader::PresetLoader;
/// Re-exports the engine.
pub use machine::{find_rule, step, MachineState};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `PresetInfo`, `PresetManager`, and `PRESETS` from the presets module.
pub use presets::{PresetInfo, PresetManager, PRESETS};
pub use tape::Tape;
/// Re-exports the data model.
pub use types::{
    Direction, MachineError, Outcome, Preset, Status, StepOutcome, Symbol, TransitionRule, BLANK,
    MAX_EXECUTION_STEPS, MAX_PRESET_SIZE,
};
