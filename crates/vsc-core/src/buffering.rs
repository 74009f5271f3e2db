//! Buffering state machine.
//!
//! Buffer start and end events are paired in arrival order. Any anomaly moves
//! the machine into [`BufferingState::Invalid`], which absorbs every later
//! event: the session's buffering length and positions are then reported as
//! null. Raw event counters live on the session and are unaffected.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::timestamp::seconds_between;

/// Why a session's buffering metric was invalidated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferingAnomaly {
    #[error("buffering start without a parsable timestamp")]
    UnparsableStart,
    #[error("buffering start while already buffering")]
    DuplicateStart,
    #[error("buffering end without a matching start")]
    DuplicateEnd,
    #[error("video location changed during buffering")]
    ScrubbedDuringBuffering,
    #[error("buffering end without a parsable timestamp")]
    UnparsableEnd,
    #[error("buffering end earlier than its start")]
    EndBeforeStart,
}

/// State of the buffering machine for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BufferingState {
    #[default]
    Idle,
    Buffering {
        started_at: NaiveDateTime,
        location: Option<String>,
    },
    Invalid(BufferingAnomaly),
}

/// A buffering interval closed by a valid end event.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedBuffer {
    pub seconds: f64,
    pub location: Option<String>,
}

impl BufferingState {
    pub const fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }

    pub const fn is_buffering(&self) -> bool {
        matches!(self, Self::Buffering { .. })
    }

    /// Transition on a buffer start event.
    #[must_use]
    pub fn on_start(self, at: Option<NaiveDateTime>, location: Option<&str>) -> Self {
        match self {
            Self::Idle => match at {
                Some(started_at) => Self::Buffering {
                    started_at,
                    location: location.map(str::to_string),
                },
                None => Self::Invalid(BufferingAnomaly::UnparsableStart),
            },
            Self::Buffering { .. } => Self::Invalid(BufferingAnomaly::DuplicateStart),
            invalid @ Self::Invalid(_) => invalid,
        }
    }

    /// Transition on a buffer end event that is subject to pairing.
    ///
    /// Returns the closed interval when the end matches the open start.
    #[must_use]
    pub fn on_end(
        self,
        at: Option<NaiveDateTime>,
        location: Option<&str>,
    ) -> (Self, Option<ClosedBuffer>) {
        match self {
            Self::Idle => (Self::Invalid(BufferingAnomaly::DuplicateEnd), None),
            Self::Buffering {
                started_at,
                location: start_location,
            } => {
                if start_location.as_deref() != location {
                    return (
                        Self::Invalid(BufferingAnomaly::ScrubbedDuringBuffering),
                        None,
                    );
                }
                let Some(ended_at) = at else {
                    return (Self::Invalid(BufferingAnomaly::UnparsableEnd), None);
                };
                if ended_at < started_at {
                    return (Self::Invalid(BufferingAnomaly::EndBeforeStart), None);
                }
                let closed = ClosedBuffer {
                    seconds: seconds_between(started_at, ended_at),
                    location: start_location,
                };
                (Self::Idle, Some(closed))
            }
            invalid @ Self::Invalid(_) => (invalid, None),
        }
    }
}

/// Buffering sub-state of a session: the machine plus its running totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferingTracker {
    state: BufferingState,
    /// `None` until the first interval closes.
    total_seconds: Option<f64>,
    positions: Vec<String>,
    initial_length: i64,
}

impl BufferingTracker {
    pub const fn state(&self) -> &BufferingState {
        &self.state
    }

    pub fn record_start(&mut self, at: Option<NaiveDateTime>, location: Option<&str>) {
        let was_valid = self.state.is_valid();
        let state = std::mem::take(&mut self.state);
        self.state = state.on_start(at, location);
        self.report_invalidation(was_valid);
    }

    /// Pair a buffer end event.
    ///
    /// `after_seek == Some(false)` marks a stall not caused by seeking; those
    /// ends leave the machine untouched.
    pub fn record_end(
        &mut self,
        at: Option<NaiveDateTime>,
        location: Option<&str>,
        after_seek: Option<bool>,
    ) {
        if after_seek == Some(false) {
            return;
        }
        let was_valid = self.state.is_valid();
        let state = std::mem::take(&mut self.state);
        let (next, closed) = state.on_end(at, location);
        self.state = next;
        if let Some(closed) = closed {
            *self.total_seconds.get_or_insert(0.0) += closed.seconds;
            if let Some(location) = closed.location {
                self.positions.push(location);
            }
        }
        self.report_invalidation(was_valid);
    }

    /// Add a declared initial buffering length; the total saturates at `i64::MAX`.
    pub fn record_initial_buffer(&mut self, length: i64) {
        self.initial_length = self.initial_length.saturating_add(length);
    }

    /// Total buffering seconds; `None` if invalid or nothing closed.
    pub const fn buffering_length(&self) -> Option<f64> {
        if self.state.is_valid() {
            self.total_seconds
        } else {
            None
        }
    }

    /// Locations of closed buffering intervals; `None` if invalid.
    pub fn buffering_positions(&self) -> Option<&[String]> {
        self.state.is_valid().then_some(self.positions.as_slice())
    }

    pub const fn initial_buffering_length(&self) -> i64 {
        self.initial_length
    }

    fn report_invalidation(&self, was_valid: bool) {
        if let (true, BufferingState::Invalid(anomaly)) = (was_valid, &self.state) {
            tracing::warn!(%anomaly, "buffering metric invalidated for session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::parse_timestamp;

    fn at(s: &str) -> Option<NaiveDateTime> {
        parse_timestamp(s)
    }

    #[test]
    fn test_idle_start_opens_interval() {
        let state = BufferingState::Idle.on_start(at("2024-01-01 00:00:00"), Some("A"));
        assert!(state.is_buffering());
    }

    #[test]
    fn test_start_without_timestamp_invalidates() {
        let state = BufferingState::Idle.on_start(None, Some("A"));
        assert_eq!(state, BufferingState::Invalid(BufferingAnomaly::UnparsableStart));
    }

    #[test]
    fn test_duplicate_start_invalidates() {
        let state = BufferingState::Idle
            .on_start(at("2024-01-01 00:00:00"), Some("A"))
            .on_start(at("2024-01-01 00:00:01"), Some("A"));
        assert_eq!(state, BufferingState::Invalid(BufferingAnomaly::DuplicateStart));
    }

    #[test]
    fn test_end_while_idle_invalidates() {
        let (state, closed) = BufferingState::Idle.on_end(at("2024-01-01 00:00:00"), None);
        assert_eq!(state, BufferingState::Invalid(BufferingAnomaly::DuplicateEnd));
        assert!(closed.is_none());
    }

    #[test]
    fn test_matching_end_closes_interval() {
        let (state, closed) = BufferingState::Idle
            .on_start(at("2024-01-01 00:00:00"), Some("A"))
            .on_end(at("2024-01-01 00:00:05"), Some("A"));
        assert_eq!(state, BufferingState::Idle);
        assert_eq!(
            closed,
            Some(ClosedBuffer {
                seconds: 5.0,
                location: Some("A".to_string()),
            })
        );
    }

    #[test]
    fn test_missing_locations_still_match() {
        let (state, closed) = BufferingState::Idle
            .on_start(at("2024-01-01 00:00:00"), None)
            .on_end(at("2024-01-01 00:00:02"), None);
        assert_eq!(state, BufferingState::Idle);
        assert_eq!(closed.map(|c| c.seconds), Some(2.0));
    }

    #[test]
    fn test_location_mismatch_invalidates() {
        let (state, _) = BufferingState::Idle
            .on_start(at("2024-01-01 00:00:00"), Some("A"))
            .on_end(at("2024-01-01 00:00:05"), Some("B"));
        assert_eq!(
            state,
            BufferingState::Invalid(BufferingAnomaly::ScrubbedDuringBuffering)
        );
    }

    #[test]
    fn test_end_before_start_invalidates() {
        let (state, _) = BufferingState::Idle
            .on_start(at("2024-01-01 00:00:05"), Some("A"))
            .on_end(at("2024-01-01 00:00:00"), Some("A"));
        assert_eq!(state, BufferingState::Invalid(BufferingAnomaly::EndBeforeStart));
    }

    #[test]
    fn test_end_without_timestamp_invalidates() {
        let (state, _) = BufferingState::Idle
            .on_start(at("2024-01-01 00:00:05"), Some("A"))
            .on_end(None, Some("A"));
        assert_eq!(state, BufferingState::Invalid(BufferingAnomaly::UnparsableEnd));
    }

    #[test]
    fn test_invalid_is_absorbing() {
        let invalid = BufferingState::Invalid(BufferingAnomaly::DuplicateEnd);
        let state = invalid.clone().on_start(at("2024-01-01 00:00:00"), Some("A"));
        assert_eq!(state, invalid);
        let (state, closed) = state.on_end(at("2024-01-01 00:00:01"), Some("A"));
        assert_eq!(state, invalid);
        assert!(closed.is_none());
    }

    #[test]
    fn test_tracker_accumulates_intervals() {
        let mut tracker = BufferingTracker::default();
        assert_eq!(tracker.buffering_length(), None);
        assert_eq!(tracker.buffering_positions(), Some(&[][..]));

        tracker.record_start(at("2024-01-01 00:00:00"), Some("10"));
        tracker.record_end(at("2024-01-01 00:00:03"), Some("10"), None);
        tracker.record_start(at("2024-01-01 00:05:00"), Some("20"));
        tracker.record_end(at("2024-01-01 00:05:02"), Some("20"), Some(true));

        assert_eq!(tracker.buffering_length(), Some(5.0));
        assert_eq!(
            tracker.buffering_positions(),
            Some(&["10".to_string(), "20".to_string()][..])
        );
    }

    #[test]
    fn test_tracker_ignores_ends_not_after_seek() {
        let mut tracker = BufferingTracker::default();
        tracker.record_end(at("2024-01-01 00:00:03"), Some("10"), Some(false));
        assert_eq!(tracker.state(), &BufferingState::Idle);

        tracker.record_start(at("2024-01-01 00:00:00"), Some("10"));
        tracker.record_end(at("2024-01-01 00:00:01"), Some("99"), Some(false));
        assert!(tracker.state().is_buffering());
    }

    #[test]
    fn test_tracker_invalid_hides_totals() {
        let mut tracker = BufferingTracker::default();
        tracker.record_start(at("2024-01-01 00:00:00"), Some("10"));
        tracker.record_end(at("2024-01-01 00:00:03"), Some("10"), None);
        tracker.record_end(at("2024-01-01 00:00:04"), Some("10"), None);

        assert_eq!(tracker.buffering_length(), None);
        assert_eq!(tracker.buffering_positions(), None);
    }

    #[test]
    fn test_zero_length_interval_is_reported() {
        let mut tracker = BufferingTracker::default();
        tracker.record_start(at("2024-01-01 00:00:00"), Some("10"));
        tracker.record_end(at("2024-01-01 00:00:00"), Some("10"), None);
        assert_eq!(tracker.buffering_length(), Some(0.0));
    }

    #[test]
    fn test_initial_buffer_total() {
        let mut tracker = BufferingTracker::default();
        tracker.record_initial_buffer(3);
        tracker.record_initial_buffer(4);
        assert_eq!(tracker.initial_buffering_length(), 7);
    }

    #[test]
    fn test_initial_buffer_total_saturates() {
        let mut tracker = BufferingTracker::default();
        tracker.record_initial_buffer(i64::MAX);
        tracker.record_initial_buffer(i64::MAX);
        assert_eq!(tracker.initial_buffering_length(), i64::MAX);
    }
}
