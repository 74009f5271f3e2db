//! Log line parsing.
//!
//! Two wire formats are accepted:
//!
//! - Pipe-tagged text: `<date> <time> <prefix>] key=value key="quoted value" ...`
//! - JSON: one object per line with a `time` field.
//!
//! Both produce an [`Event`] whose `event_date` field holds the normalized
//! timestamp. Parsing never fails loudly: callers use [`parse_line`] and count
//! `None` as an unparsable line.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::event::{Event, fields};
use crate::timestamp::{parse_datetime, parse_timestamp};

/// Marker separating the free-text prefix from the key/value body.
const BODY_MARKER: &str = "] ";

/// Pre-compiled tokenizer for the key/value body.
///
/// A token is `key="quoted value"` (backslash escapes allowed inside the
/// quotes) or `key=token` where the token holds no whitespace.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z0-9_-]+)=("(?:[^"\\]|\\.)*"|\S+)"#).unwrap()
});

/// Reasons a log line could not be turned into an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line is empty")]
    Empty,
    #[error("line has no date/time prefix")]
    MissingTimestamp,
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("line has no `] ` body marker")]
    MissingBody,
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("JSON line is not an object")]
    NotAnObject,
    #[error("JSON line has no `time` field")]
    MissingTime,
}

/// Parse one raw log line, returning `None` when it is unparsable.
pub fn parse_line(line: &str) -> Option<Event> {
    match try_parse_line(line) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::trace!(error = %e, line, "unable to parse line");
            None
        }
    }
}

/// Parse one raw log line, reporting why it was rejected.
pub fn try_parse_line(line: &str) -> Result<Event, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut event = if trimmed.starts_with('{') {
        parse_json_line(trimmed)?
    } else {
        parse_tagged_line(line)?
    };

    lowercase_session_id(&mut event);
    Ok(event)
}

fn parse_tagged_line(line: &str) -> Result<Event, ParseError> {
    let (date, rest) = next_token(line).ok_or(ParseError::MissingTimestamp)?;
    let (time, rest) = next_token(rest).ok_or(ParseError::MissingTimestamp)?;

    let raw_ts = format!("{date} {time}");
    let ts = parse_datetime(&raw_ts).ok_or(ParseError::InvalidTimestamp(raw_ts))?;

    let (_, body) = rest.split_once(BODY_MARKER).ok_or(ParseError::MissingBody)?;

    let mut event: Event = TOKEN_RE
        .captures_iter(body)
        .map(|caps| {
            let escaped = caps[2].replace('|', "\\|");
            (caps[1].to_string(), Value::String(strip_quotes(&escaped).to_string()))
        })
        .collect();
    event.set_timestamp(ts);
    Ok(event)
}

/// Split off the first whitespace-delimited token and return it with the remainder.
fn next_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    Some(text.split_once(char::is_whitespace).unwrap_or((text, "")))
}

fn parse_json_line(line: &str) -> Result<Event, ParseError> {
    let value: Value = serde_json::from_str(line).map_err(|e| ParseError::Json(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(ParseError::NotAnObject);
    };

    let raw_ts = match object.get(fields::TIME) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => return Err(ParseError::InvalidTimestamp(other.to_string())),
        None => return Err(ParseError::MissingTime),
    };
    let ts = parse_timestamp(&raw_ts).ok_or(ParseError::InvalidTimestamp(raw_ts))?;

    let mut event = strip_object_quotes(object);
    event.set_timestamp(ts);
    Ok(event)
}

fn strip_object_quotes(object: Map<String, Value>) -> Event {
    object
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => {
                let stripped = strip_quotes(&s).to_string();
                (key, Value::String(stripped))
            }
            other => (key, other),
        })
        .collect()
}

/// Remove one pair of surrounding double quotes, if present.
fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn lowercase_session_id(event: &mut Event) {
    if let Some(Value::String(session_id)) = event.fields_mut().get_mut(fields::SESSION_ID) {
        *session_id = session_id.to_lowercase();
    }
}
