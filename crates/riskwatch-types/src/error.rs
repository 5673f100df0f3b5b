//! Common error types

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::BatchState;

/// Errors raised while building domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// The requested range is empty or inverted
    #[error("end time {end} must be after start time {start}")]
    EmptyRange {
        /// Range start
        start: NaiveDateTime,
        /// Range end
        end: NaiveDateTime,
    },

    /// Window span must be positive
    #[error("window span must be positive")]
    InvalidSpan,

    /// A time string did not match `yyyy-MM-dd HH:mm:ss`
    #[error("unparsable time: {0}")]
    UnparsableTime(String),

    /// Login type outside the values accepted by the appliance
    #[error("invalid login type: {0} (expected 0 or 1)")]
    InvalidLoginType(u8),

    /// Illegal batch state transition
    #[error("illegal batch transition: {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: BatchState,
        /// Requested state
        to: BatchState,
    },
}
