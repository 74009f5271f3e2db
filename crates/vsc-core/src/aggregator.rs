//! Per-session aggregation.
//!
//! A [`SessionState`] folds the events of one session key in whatever order
//! they arrive. Each event is validated first, then its identity fields and
//! timestamp extremes are captured, and finally it is dispatched to the
//! handler for its [`MediaEventType`]. [`SessionState::summary`] derives the
//! output record without touching the state.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use serde_json::Value;
use thiserror::Error;

use crate::buffering::BufferingTracker;
use crate::duration::DurationLedger;
use crate::enrich::{Enricher, NoopEnricher, geo_or_none, organization_or_none};
use crate::event::{Event, fields};
use crate::event_type::MediaEventType;
use crate::summary::SessionSummary;
use crate::timestamp::format_timestamp;

/// Why a single event was dropped from its session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("event has no media id")]
    MissingMediaId,
    #[error("declared buffering length is not an integer: {0}")]
    InvalidBufferingLength(String),
    #[error("declared buffering length is negative: {0}")]
    NegativeBufferingLength(i64),
}

/// A validated event on its way to a handler.
struct Incoming<'a> {
    event: &'a Event,
    timestamp: Option<NaiveDateTime>,
    declared_length: Option<i64>,
}

type Handler = fn(&mut SessionState, &Incoming<'_>);

/// Event type to handler table.
const fn handler(kind: MediaEventType) -> Handler {
    match kind {
        MediaEventType::MediaStarted => on_started,
        MediaEventType::MediaEnded => on_ended,
        MediaEventType::MediaCompleted => on_completed,
        MediaEventType::MediaBufferingStart => on_buffering_start,
        MediaEventType::MediaBufferingEnd => on_buffering_end,
        MediaEventType::MediaInitialBufferEnd => on_initial_buffer_end,
        MediaEventType::MediaQualityChangeAuto => on_quality_change_auto,
        MediaEventType::MediaQualityChange => on_quality_change,
        MediaEventType::MediaInitialBufferStart
        | MediaEventType::MediaQualityChangedProgrammatically
        | MediaEventType::MediaScrub => ignore,
    }
}

/// Mutable aggregate for one session key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    tracking_id: Option<String>,
    media_id: Option<String>,
    source: Option<String>,
    component: Option<String>,
    client_id: Option<String>,
    title: Option<String>,
    session_id: Option<String>,
    user_agent: Option<String>,
    video_length: Option<String>,

    earliest: Option<NaiveDateTime>,
    latest: Option<NaiveDateTime>,
    first_event_type: Option<String>,
    last_event_type: Option<String>,

    incomplete_stream: Option<bool>,
    finished_playback: bool,
    auto_bitrate: Option<bool>,

    buffer_start_events: u64,
    buffering_events: u64,
    auto_bitrate_events: u64,
    user_bitrate_events: u64,

    position_earliest_play: Option<String>,
    position_latest_play: Option<String>,

    ledger: DurationLedger,
    buffering: BufferingTracker,

    rejected_events: u64,
    media_id_mismatches: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a sequence of events into a fresh state, skipping rejected ones.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        events.into_iter().fold(Self::new(), Self::with_event)
    }

    /// Builder-style [`SessionState::add_event`] that drops rejections.
    #[must_use]
    pub fn with_event(mut self, event: &Event) -> Self {
        let _ = self.add_event(event);
        self
    }

    /// Applies one event. A rejected event leaves the state untouched apart
    /// from the reject tally.
    pub fn add_event(&mut self, event: &Event) -> Result<(), RejectReason> {
        let declared_length = match validate(event) {
            Ok(length) => length,
            Err(reason) => {
                tracing::debug!(%reason, "rejected event");
                self.rejected_events += 1;
                return Err(reason);
            }
        };

        self.capture_identity(event);

        let timestamp = event.timestamp();
        if let Some(ts) = timestamp {
            self.track_extremes(ts, event.event_type_name());
        }

        if let Some(kind) = event.event_type() {
            let incoming = Incoming {
                event,
                timestamp,
                declared_length,
            };
            handler(kind)(self, &incoming);

            if let Some(ts) = timestamp {
                self.ledger.record(kind, ts);
            }
        }

        Ok(())
    }

    fn capture_identity(&mut self, event: &Event) {
        let slots = [
            (&mut self.source, fields::SOURCE_TAG),
            (&mut self.component, fields::COMPONENT),
            (&mut self.client_id, fields::CLIENT_ID),
            (&mut self.title, fields::EPISODE_TITLE),
            (&mut self.session_id, fields::SESSION_ID),
            (&mut self.user_agent, fields::USER_AGENT),
            (&mut self.video_length, fields::VIDEO_LENGTH),
            (&mut self.tracking_id, fields::TRACKING_ID),
        ];
        for (slot, field) in slots {
            if slot.is_none() {
                *slot = event.text_owned(field);
            }
        }

        let Some(media_id) = event.media_id() else {
            return;
        };
        let Some(current) = &self.media_id else {
            self.media_id = Some(media_id.into_owned());
            return;
        };
        if *current != media_id {
            tracing::warn!(
                current = %current,
                received = %media_id,
                "media id mismatch within session"
            );
            self.media_id_mismatches += 1;
        }
    }

    fn track_extremes(&mut self, ts: NaiveDateTime, event_type: Option<Cow<'_, str>>) {
        let event_type = event_type.map(Cow::into_owned);
        if self.earliest.is_none_or(|earliest| ts < earliest) {
            self.earliest = Some(ts);
            self.first_event_type.clone_from(&event_type);
        }
        if self.latest.is_none_or(|latest| ts > latest) {
            self.latest = Some(ts);
            self.last_event_type = event_type;
        }
    }

    /// Builds the output record. Does not modify the state.
    pub fn summary(&self, enricher: &dyn Enricher) -> SessionSummary {
        let mut summary = SessionSummary {
            tracking_id: self.tracking_id.clone(),
            media_id: self.media_id.clone(),
            earliest_time: self.earliest.map(format_timestamp),
            latest_time: self.latest.map(format_timestamp),
            incomplete_stream: self.incomplete_stream,
            finished_playback: self.finished_playback,
            first_event_type: self.first_event_type.clone(),
            last_event_type: self.last_event_type.clone(),
            buffer_start_events: self.buffer_start_events,
            playing_duration: self.ledger.total_seconds(),
            source: self.source.clone(),
            component: self.component.clone(),
            auto_bitrate: self.auto_bitrate,
            client_id: self.client_id.clone(),
            title: self.title.clone(),
            session_id: self.session_id.clone(),
            user_agent: self.user_agent.clone(),
            video_length: self.video_length.clone(),
            position_earliest_play: self.position_earliest_play.clone(),
            position_latest_play: self.position_latest_play.clone(),
            buffering_events: self.buffering_events,
            buffering_length: self.buffering.buffering_length(),
            buffering_positions: self.buffering.buffering_positions().map(<[String]>::to_vec),
            initial_buffering_length: self.buffering.initial_buffering_length(),
            auto_bitrate_events: self.auto_bitrate_events,
            user_bitrate_events: self.user_bitrate_events,
            ..SessionSummary::default()
        };

        if let Some(address) = self.client_id.as_deref() {
            summary.isp_name = organization_or_none(enricher, address);
            if let Some(geo) = geo_or_none(enricher, address) {
                summary.apply_geo(geo);
            }
        }

        summary
    }

    pub const fn rejected_events(&self) -> u64 {
        self.rejected_events
    }

    pub const fn media_id_mismatches(&self) -> u64 {
        self.media_id_mismatches
    }
}

/// Checks an event before it may touch session state.
///
/// Returns the declared buffering length when the event carries one.
fn validate(event: &Event) -> Result<Option<i64>, RejectReason> {
    if event.media_id().is_none() {
        return Err(RejectReason::MissingMediaId);
    }

    let Some(raw) = event.get(fields::BUFFERING_LENGTH) else {
        return Ok(None);
    };
    let length = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match length {
        Some(n) if n < 0 => Err(RejectReason::NegativeBufferingLength(n)),
        Some(n) => Ok(Some(n)),
        None => Err(RejectReason::InvalidBufferingLength(render(raw))),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `x_after_seek`: `Some(false)` only for an explicit false marker.
fn after_seek(event: &Event) -> Option<bool> {
    match event.get(fields::AFTER_SEEK)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        _ => None,
    }
}

fn on_started(state: &mut SessionState, incoming: &Incoming<'_>) {
    state.incomplete_stream.get_or_insert(true);
    if let Some(location) = incoming.event.video_location() {
        let earlier = state
            .position_earliest_play
            .as_deref()
            .is_none_or(|current| location.as_ref() < current);
        if earlier {
            state.position_earliest_play = Some(location.into_owned());
        }
    }
}

fn on_ended(state: &mut SessionState, incoming: &Incoming<'_>) {
    state.incomplete_stream = Some(false);
    if let Some(location) = incoming.event.video_location() {
        let later = state
            .position_latest_play
            .as_deref()
            .is_none_or(|current| location.as_ref() > current);
        if later {
            state.position_latest_play = Some(location.into_owned());
        }
    }
}

fn on_completed(state: &mut SessionState, incoming: &Incoming<'_>) {
    on_ended(state, incoming);
    state.finished_playback = true;
}

fn on_buffering_start(state: &mut SessionState, incoming: &Incoming<'_>) {
    state.buffer_start_events += 1;
    let location = incoming.event.video_location();
    state
        .buffering
        .record_start(incoming.timestamp, location.as_deref());
}

fn on_buffering_end(state: &mut SessionState, incoming: &Incoming<'_>) {
    state.buffering_events += 1;
    if incoming.event.text(fields::AUTO).as_deref() == Some("true") {
        state.auto_bitrate = Some(true);
    }
    let location = incoming.event.video_location();
    state.buffering.record_end(
        incoming.timestamp,
        location.as_deref(),
        after_seek(incoming.event),
    );
}

fn on_initial_buffer_end(state: &mut SessionState, incoming: &Incoming<'_>) {
    state
        .buffering
        .record_initial_buffer(incoming.declared_length.unwrap_or(0));
}

fn on_quality_change_auto(state: &mut SessionState, _incoming: &Incoming<'_>) {
    state.auto_bitrate_events += 1;
}

fn on_quality_change(state: &mut SessionState, _incoming: &Incoming<'_>) {
    state.user_bitrate_events += 1;
}

fn ignore(_state: &mut SessionState, _incoming: &Incoming<'_>) {}

/// A [`SessionState`] bound to the enricher used for its summary.
pub struct SessionAggregator<'e> {
    state: SessionState,
    enricher: &'e dyn Enricher,
}

impl SessionAggregator<'static> {
    /// Aggregator without enrichment.
    pub fn new() -> Self {
        Self::with_enricher(&NoopEnricher)
    }
}

impl Default for SessionAggregator<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'e> SessionAggregator<'e> {
    pub fn with_enricher(enricher: &'e dyn Enricher) -> Self {
        Self {
            state: SessionState::new(),
            enricher,
        }
    }

    pub fn add_event(&mut self, event: &Event) -> Result<(), RejectReason> {
        self.state.add_event(event)
    }

    pub fn summary(&self) -> SessionSummary {
        self.state.summary(self.enricher)
    }

    pub const fn state(&self) -> &SessionState {
        &self.state
    }
}

impl std::fmt::Debug for SessionAggregator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAggregator")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
