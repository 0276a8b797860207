//! Parse error types.

use thiserror::Error;

/// Errors produced by the time-expression grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input did not match the grammar at position 0.
    #[error("no time expression at the start of the input")]
    NoMatch,

    /// The expression matched but names an invalid calendar time.
    #[error("time of day out of bounds: {hours}h {minutes}m {seconds}s")]
    OutOfBounds {
        hours: u64,
        minutes: u64,
        seconds: u64,
    },
}
