//! Parsed player log events.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event_type::MediaEventType;
use crate::timestamp::{format_timestamp, parse_timestamp};

/// Well-known field names carried by player log events.
pub mod fields {
    /// Normalized event timestamp written by the line parser.
    pub const EVENT_DATE: &str = "event_date";
    pub const EVENT_TYPE: &str = "event_type";
    pub const TRACKING_ID: &str = "x_tracking_id";
    pub const MEDIA_ID: &str = "x_tpmid";
    pub const SESSION_ID: &str = "x_session_id";
    /// Client address, used for enrichment lookups.
    pub const CLIENT_ID: &str = "client_id";
    pub const USER_AGENT: &str = "x_user_agent";
    pub const SOURCE_TAG: &str = "source_tag";
    pub const COMPONENT: &str = "component";
    pub const EPISODE_TITLE: &str = "x_episode_title";
    pub const VIDEO_LENGTH: &str = "x_video_length";
    pub const VIDEO_LOCATION: &str = "x_video_location";
    /// Buffering length declared by the player, in whole units.
    pub const BUFFERING_LENGTH: &str = "x_buffering_length";
    pub const AUTO: &str = "x_auto";
    pub const AFTER_SEEK: &str = "x_after_seek";
    /// Raw timestamp field of JSON formatted lines.
    pub const TIME: &str = "time";
}

/// A single player event: a flat mapping of field name to scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: BTreeMap<String, Value>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an event from string pairs. Mostly useful for fixtures.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style [`Event::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn fields_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.fields
    }

    /// Returns a field rendered as text.
    ///
    /// Strings are borrowed; numbers and booleans are rendered. Null, empty
    /// strings and nested values count as absent.
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.fields.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Returns a field as an owned string, see [`Event::text`].
    pub fn text_owned(&self, key: &str) -> Option<String> {
        self.text(key).map(Cow::into_owned)
    }

    /// The raw `event_type` value, known or not.
    pub fn event_type_name(&self) -> Option<Cow<'_, str>> {
        self.text(fields::EVENT_TYPE)
    }

    /// The event type if it is one the aggregator handles.
    pub fn event_type(&self) -> Option<MediaEventType> {
        self.event_type_name()?.parse().ok()
    }

    /// The normalized timestamp, if present and parsable.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.text(fields::EVENT_DATE)?)
    }

    pub fn set_timestamp(&mut self, ts: NaiveDateTime) {
        self.insert(fields::EVENT_DATE, format_timestamp(ts));
    }

    pub fn media_id(&self) -> Option<Cow<'_, str>> {
        self.text(fields::MEDIA_ID)
    }

    pub fn tracking_id(&self) -> Option<Cow<'_, str>> {
        self.text(fields::TRACKING_ID)
    }

    pub fn video_location(&self) -> Option<Cow<'_, str>> {
        self.text(fields::VIDEO_LOCATION)
    }
}

impl FromIterator<(String, Value)> for Event {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
