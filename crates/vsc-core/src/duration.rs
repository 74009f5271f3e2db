//! Playing duration reconstruction.
//!
//! Start and end events are recorded as they arrive, in any order. The total
//! is only computed at summary time: entries are stably sorted by timestamp and
//! paired in a single forward scan with one open-start slot.

use chrono::NaiveDateTime;

use crate::event_type::MediaEventType;
use crate::timestamp::seconds_between;

/// One start or end entry in the duration ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationEvent {
    pub event_type: MediaEventType,
    pub timestamp: NaiveDateTime,
}

/// Unordered start/end entries for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationLedger {
    entries: Vec<DurationEvent>,
}

impl DurationLedger {
    /// Records the entry if `event_type` starts or ends playback.
    pub fn record(&mut self, event_type: MediaEventType, timestamp: NaiveDateTime) {
        if event_type.starts_playback() || event_type.ends_playback() {
            self.entries.push(DurationEvent {
                event_type,
                timestamp,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total playing time in seconds, or `None` when it sums to zero.
    ///
    /// Nested starts and unmatched ends are ignored. A trailing start with no
    /// end contributes nothing.
    pub fn total_seconds(&self) -> Option<f64> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|entry| entry.timestamp);

        let mut total = 0.0;
        let mut open: Option<NaiveDateTime> = None;
        for entry in &sorted {
            if entry.event_type.starts_playback() {
                open.get_or_insert(entry.timestamp);
            } else if let Some(start) = open.take() {
                total += seconds_between(start, entry.timestamp);
            }
        }

        // Sorting keeps every closed interval non-negative.
        if total > 0.0 { Some(total) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::parse_timestamp;

    use MediaEventType::{MediaCompleted, MediaEnded, MediaInitialBufferStart, MediaStarted};

    fn ledger(entries: &[(MediaEventType, &str)]) -> DurationLedger {
        let mut ledger = DurationLedger::default();
        for (kind, ts) in entries {
            ledger.record(*kind, parse_timestamp(ts).unwrap());
        }
        ledger
    }

    #[test]
    fn test_single_pair() {
        let ledger = ledger(&[
            (MediaStarted, "2024-01-01 00:00:00"),
            (MediaEnded, "2024-01-01 00:01:00"),
        ]);
        assert_eq!(ledger.total_seconds(), Some(60.0));
    }

    #[test]
    fn test_reverse_arrival_order() {
        let ledger = ledger(&[
            (MediaEnded, "2024-01-01 02:00:00"),
            (MediaStarted, "2024-01-01 00:00:00"),
        ]);
        assert_eq!(ledger.total_seconds(), Some(7200.0));
    }

    #[test]
    fn test_multiple_pairs_sum() {
        let ledger = ledger(&[
            (MediaStarted, "2024-01-01 00:00:00"),
            (MediaEnded, "2024-01-01 00:10:00"),
            (MediaStarted, "2024-01-01 00:20:00"),
            (MediaEnded, "2024-01-01 00:30:00"),
            (MediaStarted, "2024-01-01 00:40:00"),
            (MediaCompleted, "2024-01-01 00:50:00"),
        ]);
        assert_eq!(ledger.total_seconds(), Some(1800.0));
    }

    #[test]
    fn test_trailing_start_contributes_nothing() {
        let ledger = ledger(&[
            (MediaStarted, "2024-01-01 00:00:00"),
            (MediaEnded, "2024-01-01 00:10:00"),
            (MediaStarted, "2024-01-01 00:20:00"),
        ]);
        assert_eq!(ledger.total_seconds(), Some(600.0));
    }

    #[test]
    fn test_nested_start_keeps_first_open() {
        let ledger = ledger(&[
            (MediaInitialBufferStart, "2024-01-01 00:00:00"),
            (MediaStarted, "2024-01-01 00:00:05"),
            (MediaEnded, "2024-01-01 00:01:00"),
            (MediaEnded, "2024-01-01 00:02:00"),
        ]);
        assert_eq!(ledger.total_seconds(), Some(60.0));
    }

    #[test]
    fn test_only_starts_or_only_ends_is_none() {
        let starts = ledger(&[
            (MediaStarted, "2024-01-01 00:00:00"),
            (MediaStarted, "2024-01-01 00:01:00"),
        ]);
        assert_eq!(starts.total_seconds(), None);

        let ends = ledger(&[
            (MediaEnded, "2024-01-01 00:00:00"),
            (MediaEnded, "2024-01-01 00:01:00"),
        ]);
        assert_eq!(ends.total_seconds(), None);
    }

    #[test]
    fn test_zero_length_pair_reports_none() {
        // Zero duration and no closed pair are indistinguishable downstream.
        let ledger = ledger(&[
            (MediaStarted, "2024-01-01 00:00:00"),
            (MediaEnded, "2024-01-01 00:00:00"),
        ]);
        assert_eq!(ledger.total_seconds(), None);
    }

    #[test]
    fn test_subsecond_precision() {
        let ledger = ledger(&[
            (MediaStarted, "2024-01-01 00:00:00,500"),
            (MediaEnded, "2024-01-01 00:00:02,250"),
        ]);
        assert_eq!(ledger.total_seconds(), Some(1.75));
    }

    #[test]
    fn test_non_playback_types_not_recorded() {
        let mut ledger = DurationLedger::default();
        let ts = parse_timestamp("2024-01-01 00:00:00").unwrap();
        ledger.record(MediaEventType::MediaBufferingStart, ts);
        ledger.record(MediaEventType::MediaScrub, ts);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_total_does_not_reorder_ledger() {
        let ledger = ledger(&[
            (MediaEnded, "2024-01-01 00:01:00"),
            (MediaStarted, "2024-01-01 00:00:00"),
        ]);
        let before = ledger.clone();
        let _ = ledger.total_seconds();
        assert_eq!(ledger, before);
    }
}
