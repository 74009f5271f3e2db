//! Core log parsing and session aggregation for video stream condense.
//!
//! This crate turns raw player log lines into one summary per playback
//! session:
//! - Parsing: pipe-tagged and JSON log lines into [`Event`]s
//! - Keying: grouping events by tracking id and media id
//! - Aggregation: per-session state folded from events in any order
//! - Job: a local parallel map/reduce over input splits

pub mod aggregator;
pub mod buffering;
pub mod counters;
pub mod duration;
pub mod enrich;
pub mod event;
pub mod event_type;
pub mod job;
pub mod key;
pub mod parser;
pub mod summary;
pub mod support;
pub mod timestamp;

pub use aggregator::{RejectReason, SessionAggregator, SessionState};
pub use buffering::{BufferingAnomaly, BufferingState, BufferingTracker};
pub use counters::{Counters, MapCounters, ReduceCounters};
pub use duration::{DurationEvent, DurationLedger};
pub use enrich::{EnrichError, Enricher, GeoInfo, NoopEnricher};
pub use event::Event;
pub use event_type::{MediaEventType, UnknownEventType};
pub use job::{JobOutput, run};
pub use key::{KeyDeriver, SessionKey, derive_key};
pub use parser::{ParseError, parse_line, try_parse_line};
pub use summary::SessionSummary;
pub use support::SupportReport;
