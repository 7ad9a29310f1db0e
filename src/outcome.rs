//! Acceptance convention for standard (non-arithmetic) runs.
//!
//! A program that wants an interpreted result writes `Y` or `N` before halting.

use crate::types::Outcome;

/// Marker written by accepting programs.
pub const ACCEPT_SYMBOL: char = 'Y';
/// Marker written by rejecting programs.
pub const REJECT_SYMBOL: char = 'N';

/// Interprets a serialized final tape. `Y` wins over `N`.
pub fn judge(tape: &str) -> Outcome {
    if tape.contains(ACCEPT_SYMBOL) {
        Outcome::Accepted
    } else if tape.contains(REJECT_SYMBOL) {
        Outcome::Rejected
    } else {
        Outcome::Raw(tape.to_string())
    }
}
