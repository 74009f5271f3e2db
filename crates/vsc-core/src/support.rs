//! Field coverage report for one player source.
//!
//! Answers "which player events and custom fields does this source actually
//! send?" by counting them over raw log lines.

use std::collections::BTreeMap;

use crate::event::{Event, fields};
use crate::parser::parse_line;

/// Player event types reported on, including ones the aggregator ignores.
pub const TRACKED_EVENTS: [&str; 12] = [
    "MediaStarted",
    "MediaEnded",
    "MediaCompleted",
    "MediaFailed",
    "MediaQualityChange",
    "MediaQualityChangeAuto",
    "MediaQualityChangeProgramatically",
    "MediaInitialBufferStart",
    "MediaInitialBufferEnd",
    "MediaBufferingStart",
    "MediaBufferingEnd",
    "MediaScrub",
];

/// Custom `x_*` fields reported on.
pub const TRACKED_FIELDS: [&str; 20] = [
    "x_useragent",
    "x_tpmid",
    "x_episode_title",
    "x_program_title",
    "x_producer",
    "x_video_length",
    "x_client_id",
    "x_session_id",
    "x_tracking_id",
    "x_video_location",
    "x_stream_size",
    "x_flash_player",
    "x_buffering_length",
    "x_encoding_name",
    "x_auto",
    "x_bandwidth",
    "x_after_seek",
    "x_start_time",
    "x_previous_quality",
    "x_new_quality",
];

/// Occurrence counts of tracked events and fields for one `source_tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportReport {
    source_tag: String,
    events: BTreeMap<&'static str, u64>,
    fields: BTreeMap<&'static str, u64>,
    matched_lines: u64,
}

impl SupportReport {
    pub fn new(source_tag: impl Into<String>) -> Self {
        Self {
            source_tag: source_tag.into(),
            events: TRACKED_EVENTS.iter().map(|name| (*name, 0)).collect(),
            fields: TRACKED_FIELDS.iter().map(|name| (*name, 0)).collect(),
            matched_lines: 0,
        }
    }

    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }

    /// Parses a raw line and records it. Unparsable lines are skipped.
    pub fn record_line(&mut self, line: &str) {
        if let Some(event) = parse_line(line) {
            self.record(&event);
        }
    }

    /// Records one event if it belongs to the tracked source.
    pub fn record(&mut self, event: &Event) {
        if event.text(fields::SOURCE_TAG).as_deref() != Some(self.source_tag.as_str()) {
            return;
        }
        self.matched_lines += 1;

        if let Some(name) = event.event_type_name() {
            if let Some(count) = self.events.get_mut(name.as_ref()) {
                *count += 1;
            }
        }
        for key in event.keys() {
            if let Some(count) = self.fields.get_mut(key) {
                *count += 1;
            }
        }
    }

    /// Event counts sorted by event name.
    pub fn events(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.events.iter().map(|(name, n)| (*name, *n))
    }

    /// Field counts sorted by field name.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.fields.iter().map(|(name, n)| (*name, *n))
    }

    pub const fn matched_lines(&self) -> u64 {
        self.matched_lines
    }
}
