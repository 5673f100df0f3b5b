//! Property-based tests for range partitioning
//!
//! These tests verify:
//! - Windows cover the requested range exactly, with no gaps or overlaps
//! - Every window respects the maximum span
//! - Empty and inverted ranges are always rejected

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use riskwatch_types::{partition, partition_with_span, TypesError};

// ============================================================================
// Strategies
// ============================================================================

/// Instants within a few years, with millisecond precision
fn arb_instant() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..(3 * 365 * 24 * 3600), 0i64..1000).prop_map(|(secs, millis)| {
        let base = NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        base + Duration::seconds(secs) + Duration::milliseconds(millis)
    })
}

/// Range lengths from one millisecond up to three days
fn arb_length() -> impl Strategy<Value = Duration> {
    (1i64..(3 * 24 * 3600 * 1000)).prop_map(Duration::milliseconds)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn windows_cover_range_exactly(start in arb_instant(), len in arb_length()) {
        let end = start + len;
        let windows = partition(start, end).unwrap();

        prop_assert!(!windows.is_empty());
        prop_assert_eq!(windows.first().unwrap().start, start);
        prop_assert_eq!(windows.last().unwrap().end, end);

        for pair in windows.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }
        for w in &windows {
            prop_assert!(w.start < w.end);
            prop_assert!(w.duration() <= Duration::hours(1));
        }
    }

    #[test]
    fn only_last_window_is_short(start in arb_instant(), len in arb_length()) {
        let windows = partition(start, start + len).unwrap();
        let (_, full) = windows.split_last().unwrap();
        for w in full {
            prop_assert_eq!(w.duration(), Duration::hours(1));
        }
    }

    #[test]
    fn custom_span_is_respected(
        start in arb_instant(),
        len in arb_length(),
        minutes in 1i64..180,
    ) {
        let span = Duration::minutes(minutes);
        let windows = partition_with_span(start, start + len, span).unwrap();
        for w in &windows {
            prop_assert!(w.duration() <= span);
        }
    }

    #[test]
    fn inverted_ranges_are_rejected(start in arb_instant(), len in arb_length()) {
        let earlier = start - len;
        prop_assert_eq!(
            partition(start, earlier),
            Err(TypesError::EmptyRange { start, end: earlier })
        );
        prop_assert!(partition(start, start).is_err());
    }
}
