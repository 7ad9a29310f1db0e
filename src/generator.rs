//! Boundary to the external rule-generation collaborator.
//!
//! A generator turns a free-text task description into a [`Preset`]. Its output
//! is untrusted: only the documented shape is checked, never the semantics. A
//! structurally valid preset with no applicable rules simply halts on its first
//! step.

use crate::types::Preset;
use regex::Regex;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;

lazy_static::lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("fenced block pattern is valid");
}

/// Errors reported by a rule generator. All of them are recoverable.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The collaborator itself could not be reached or failed.
    #[error("generator command failed: {0}")]
    Command(String),
    /// The response did not contain a preset of the expected shape.
    #[error("malformed generator response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The response was empty.
    #[error("generator returned an empty response")]
    Empty,
}

/// Produces a preset from a task description.
pub trait RuleGenerator {
    fn generate(&self, prompt: &str) -> Result<Preset, GenerationError>;
}

impl<F> RuleGenerator for F
where
    F: Fn(&str) -> Result<Preset, GenerationError>,
{
    fn generate(&self, prompt: &str) -> Result<Preset, GenerationError> {
        self(prompt)
    }
}

/// Parses a raw generator response into a preset.
///
/// The response may be bare JSON, JSON inside a fenced code block, or JSON
/// surrounded by prose.
pub fn parse_response(response: &str) -> Result<Preset, GenerationError> {
    let response = response.trim();
    if response.is_empty() {
        return Err(GenerationError::Empty);
    }

    let json = FENCED_BLOCK
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .or_else(|| outermost_object(response))
        .unwrap_or(response);

    Ok(serde_json::from_str(json)?)
}

/// The slice from the first `{` to the last `}`.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Runs an external command as the generator.
///
/// The prompt is written to the command's stdin from a separate thread while
/// the response is read from its stdout, so a command that echoes a large
/// prompt cannot stall on a full pipe.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl RuleGenerator for CommandGenerator {
    fn generate(&self, prompt: &str) -> Result<Preset, GenerationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GenerationError::Command(format!("{}: {}", self.program, e)))?;

        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|scope| {
            let writer = stdin.map(|mut stdin| {
                // Dropping stdin at the end of the thread closes the pipe
                scope.spawn(move || stdin.write_all(prompt.as_bytes()))
            });
            // Always reaps the child, even when the write fails
            let output = child.wait_with_output();
            let written = match writer {
                Some(handle) => handle.join().unwrap_or_else(|_| {
                    Err(io::Error::new(io::ErrorKind::Other, "prompt writer panicked"))
                }),
                None => Ok(()),
            };
            (output, written)
        });

        let output = output.map_err(|e| GenerationError::Command(e.to_string()))?;

        if !output.status.success() {
            return Err(GenerationError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // A command may answer without reading the whole prompt
        match written {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                return Err(GenerationError::Command(format!(
                    "failed to write prompt to {}: {}",
                    self.program, e
                )));
            }
            _ => {}
        }

        parse_response(&String::from_utf8_lossy(&output.stdout))
    }
}
