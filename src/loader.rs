//! This module provides the `PresetLoader` struct, responsible for loading presets
//! from various sources, including files and strings.

use crate::parser::parse;
use crate::types::{MachineError, Preset};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions recognized as preset files.
const PRESET_EXTENSIONS: [&str; 2] = ["tm", "json"];

/// `PresetLoader` is a utility struct for loading presets.
/// It reads `.tm` text files and `.json` files in the preset shape, and can
/// discover and load every preset within a directory.
pub struct PresetLoader;

impl PresetLoader {
    /// Loads a single preset from the specified file path.
    ///
    /// Files ending in `.json` are read as JSON presets; anything else is parsed
    /// as the `.tm` text format.
    ///
    /// # Returns
    ///
    /// * `Ok(Preset)` if the file is successfully read and parsed.
    /// * `Err(MachineError::FileError)` if the file cannot be read.
    /// * `Err(MachineError::ParseError)` or `Err(MachineError::ValidationError)` if the content is invalid.
    pub fn load_preset(path: &Path) -> Result<Preset, MachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            MachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::load_preset_from_json(&content)
        } else {
            Self::load_preset_from_string(&content)
        }
    }

    /// Loads a single preset from `.tm` text content.
    pub fn load_preset_from_string(content: &str) -> Result<Preset, MachineError> {
        parse(content)
    }

    /// Loads a single preset from JSON content.
    pub fn load_preset_from_json(content: &str) -> Result<Preset, MachineError> {
        serde_json::from_str(content)
            .map_err(|e| MachineError::ValidationError(format!("Invalid preset JSON: {}", e)))
    }

    /// Loads all preset files (`.tm` or `.json`) from a given directory.
    ///
    /// Directories and files with other extensions are skipped. Each element of the
    /// result is either the path and its preset, or the error for that file.
    pub fn load_presets(directory: &Path) -> Vec<Result<(PathBuf, Preset), MachineError>> {
        if !directory.exists() {
            return vec![Err(MachineError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(MachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results: Vec<_> = entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(MachineError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                let recognized = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| PRESET_EXTENSIONS.contains(&ext));
                if path.is_dir() || !recognized {
                    return None;
                }

                match Self::load_preset(&path) {
                    Ok(preset) => Some(Ok((path, preset))),
                    Err(e) => Some(Err(MachineError::FileError(format!(
                        "Failed to load preset from {}: {}",
                        path.display(),
                        e
                    )))),
                }
            })
            .collect();

        // Directory order is platform dependent
        results.sort_by_key(|r| r.as_ref().ok().map(|(path, _)| path.clone()));
        results
    }
}
