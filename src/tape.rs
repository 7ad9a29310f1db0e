//! Sparse, unbounded, bidirectional tape storage.
//!
//! Only non-blank cells are stored. Writing [`BLANK`] removes the cell, so the
//! smallest and largest stored positions always hold real symbols.

use crate::types::{Symbol, BLANK};
use std::collections::BTreeMap;
use std::fmt;

/// A Turing machine tape addressed by signed positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tape {
    cells: BTreeMap<i64, Symbol>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tape from text, assigning positions `0..n` to the characters in order.
    ///
    /// Blank characters advance the position without storing anything.
    pub fn parse(text: &str) -> Self {
        let cells = text
            .chars()
            .enumerate()
            .filter(|&(_, c)| c != BLANK)
            .map(|(i, c)| (i as i64, c))
            .collect();

        Self { cells }
    }

    /// Returns the symbol at `pos`, or [`BLANK`] if nothing is written there.
    pub fn read(&self, pos: i64) -> Symbol {
        self.cells.get(&pos).copied().unwrap_or(BLANK)
    }

    /// Writes `symbol` at `pos`. Writing [`BLANK`] erases the cell.
    pub fn write(&mut self, pos: i64, symbol: Symbol) {
        if symbol == BLANK {
            self.cells.remove(&pos);
        } else {
            self.cells.insert(pos, symbol);
        }
    }

    /// The leftmost and rightmost written positions, if any.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        let (&min, _) = self.cells.first_key_value()?;
        let (&max, _) = self.cells.last_key_value()?;
        Some((min, max))
    }

    /// Number of non-blank cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over the written cells in position order.
    pub fn cells(&self) -> impl Iterator<Item = (i64, Symbol)> + '_ {
        self.cells.iter().map(|(&pos, &symbol)| (pos, symbol))
    }

    /// Renders the inclusive range `from..=to`, blanks included, without trimming.
    pub fn window(&self, from: i64, to: i64) -> String {
        if from > to {
            return String::new();
        }
        (from..=to).map(|pos| self.read(pos)).collect()
    }
}

impl From<&str> for Tape {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl fmt::Display for Tape {
    /// Renders `[min, max]` with blank-filled gaps, trimmed of blank runs at both ends.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bounds() {
            Some((min, max)) => f.write_str(self.window(min, max).trim_matches(BLANK)),
            None => Ok(()),
        }
    }
}
