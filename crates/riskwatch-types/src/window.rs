//! Time windows and range partitioning
//!
//! A requested range `[start, end)` is split into contiguous windows no
//! longer than a fixed span. Each window becomes one risk query.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::TypesError;

/// Wire format for window boundaries (`yyyy-MM-dd HH:mm:ss`)
pub const WIRE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default maximum window length
pub fn default_window_span() -> Duration {
    Duration::hours(1)
}

/// A bounded sub-interval of a requested range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive start
    pub start: NaiveDateTime,
    /// Exclusive end
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Window length
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// `begin` value sent to the appliance, truncated to whole seconds
    pub fn begin_wire(&self) -> String {
        self.start.format(WIRE_TIME_FORMAT).to_string()
    }

    /// `end` value sent to the appliance, truncated to whole seconds
    pub fn end_wire(&self) -> String {
        self.end.format(WIRE_TIME_FORMAT).to_string()
    }

    /// Whether both boundaries render to the same wire second
    pub fn is_degenerate(&self) -> bool {
        self.begin_wire() == self.end_wire()
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ~ {}", self.begin_wire(), self.end_wire())
    }
}

/// Split `[start, end)` into windows of at most one hour.
pub fn partition(start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<TimeWindow>, TypesError> {
    partition_with_span(start, end, default_window_span())
}

/// Split `[start, end)` into windows of at most `span`.
///
/// Windows are contiguous, chronologically ordered, and the last one is
/// clamped to `end`. An empty or inverted range is rejected.
pub fn partition_with_span(
    start: NaiveDateTime,
    end: NaiveDateTime,
    span: Duration,
) -> Result<Vec<TimeWindow>, TypesError> {
    if span <= Duration::zero() {
        return Err(TypesError::InvalidSpan);
    }
    if end <= start {
        return Err(TypesError::EmptyRange { start, end });
    }

    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = cursor
            .checked_add_signed(span)
            .map_or(end, |candidate| candidate.min(end));
        windows.push(TimeWindow {
            start: cursor,
            end: next,
        });
        cursor = next;
    }
    Ok(windows)
}

/// Parse a `yyyy-MM-dd HH:mm:ss` timestamp.
///
/// A bare `yyyy-MM-dd` date is accepted and means midnight.
pub fn parse_wire_time(input: &str) -> Result<NaiveDateTime, TypesError> {
    let trimmed = input.trim();
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, WIRE_TIME_FORMAT) {
        return Ok(parsed);
    }
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TypesError::UnparsableTime(trimmed.to_string()))
}
