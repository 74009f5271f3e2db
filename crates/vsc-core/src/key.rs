//! Session key derivation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::counters::MapCounters;
use crate::event::Event;
use crate::parser::parse_line;

/// Tracking ids at least this long are assumed globally unique.
pub const UNIQUE_TRACKING_ID_LEN: usize = 30;

/// Grouping key identifying one playback session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

/// Derive the session key of an event, or `None` if it is keyless.
///
/// Short tracking ids get the media id appended since players reuse them.
pub fn derive_key(event: &Event) -> Option<SessionKey> {
    let tracking_id = event.tracking_id()?;
    let media_id = event.media_id()?;

    if tracking_id.chars().count() >= UNIQUE_TRACKING_ID_LEN {
        Some(SessionKey(tracking_id.into_owned()))
    } else {
        Some(SessionKey(format!("{tracking_id}-{media_id}")))
    }
}

/// Map-side driver: parses raw lines, keys them, and counts the outcome.
#[derive(Debug, Default)]
pub struct KeyDeriver {
    counters: MapCounters,
}

impl KeyDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and key one raw line.
    pub fn map_line(&mut self, line: &str) -> Option<(SessionKey, Event)> {
        self.counters.total_events += 1;
        let Some(event) = parse_line(line) else {
            self.counters.unparsable_events += 1;
            return None;
        };
        self.key_event(event)
    }

    fn key_event(&mut self, event: Event) -> Option<(SessionKey, Event)> {
        if let Some(key) = derive_key(&event) {
            self.counters.valid_events += 1;
            Some((key, event))
        } else {
            tracing::debug!(?event, "unable to generate tracking key");
            self.counters.keyless_events += 1;
            None
        }
    }

    pub const fn counters(&self) -> &MapCounters {
        &self.counters
    }

    pub fn into_counters(self) -> MapCounters {
        self.counters
    }
}
