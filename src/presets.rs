use crate::types::{MachineError, Preset};
use tracing::error;

/// Name of the preset used to evaluate `a + b`.
pub const ADDITION_PRESET: &str = "Unary Addition";
/// Name of the preset used to evaluate `a - b`.
pub const SUBTRACTION_PRESET: &str = "Unary Subtraction";

// Default embedded presets
const PRESET_TEXTS: [&str; 6] = [
    include_str!("../presets/binary-increment.tm"),
    include_str!("../presets/unary-addition.tm"),
    include_str!("../presets/unary-subtraction.tm"),
    include_str!("../presets/palindrome.tm"),
    include_str!("../presets/busy-beaver-2.tm"),
    include_str!("../presets/oscillator.tm"),
];

lazy_static::lazy_static! {
    /// Built-in presets, parsed once. Texts that fail to parse are skipped.
    pub static ref PRESETS: Vec<Preset> = PRESET_TEXTS
        .iter()
        .filter_map(|text| match crate::parser::parse(text) {
            Ok(preset) => Some(preset),
            Err(e) => {
                error!("Failed to parse built-in preset: {e}");
                None
            }
        })
        .collect();
}

pub struct PresetManager;

impl PresetManager {
    /// Get the number of available presets
    pub fn count() -> usize {
        PRESETS.len()
    }

    /// Get a preset by its index
    pub fn get_by_index(index: usize) -> Result<Preset, MachineError> {
        PRESETS
            .get(index)
            .cloned()
            .ok_or_else(|| {
                MachineError::ValidationError(format!("Preset index {} out of range", index))
            })
    }

    /// Get a preset by its name, ignoring case
    pub fn get_by_name(name: &str) -> Result<Preset, MachineError> {
        PRESETS
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| {
                MachineError::ValidationError(format!(
                    "Preset '{}' not found. Available presets: {}",
                    name,
                    Self::list_names().join(", ")
                ))
            })
    }

    /// List all preset names
    pub fn list_names() -> Vec<String> {
        PRESETS
            .iter()
            .map(|preset| preset.name.clone())
            .collect()
    }

    /// Get summary information about a preset by its index
    pub fn get_info(index: usize) -> Result<PresetInfo, MachineError> {
        let preset = Self::get_by_index(index)?;

        Ok(PresetInfo {
            index,
            state_count: preset.states().len(),
            rule_count: preset.rules.len(),
            name: preset.name,
            description: preset.description,
            initial_state: preset.initial_state,
            initial_tape: preset.initial_tape,
        })
    }

    /// Indices of presets whose name or description contains `query`, ignoring case
    pub fn search(query: &str) -> Vec<usize> {
        let query = query.to_lowercase();
        PRESETS
            .iter()
            .enumerate()
            .filter(|(_, preset)| {
                preset.name.to_lowercase().contains(&query)
                    || preset.description.to_lowercase().contains(&query)
            })
            .map(|(index, _)| index)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PresetInfo {
    pub index: usize,
    pub name: String,
    pub description: String,
    pub initial_state: String,
    pub initial_tape: String,
    pub state_count: usize,
    pub rule_count: usize,
}
