//! Job observability counters.
//!
//! Every worker keeps its own [`Counters`]; the host merges them by plain
//! addition, so merge order never matters.

use std::collections::BTreeMap;

use serde::Serialize;

/// Counters produced by the map phase (line parsing and key derivation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MapCounters {
    pub total_events: u64,
    pub unparsable_events: u64,
    pub keyless_events: u64,
    pub valid_events: u64,
}

impl MapCounters {
    pub fn merge(&mut self, other: &Self) {
        self.total_events += other.total_events;
        self.unparsable_events += other.unparsable_events;
        self.keyless_events += other.keyless_events;
        self.valid_events += other.valid_events;
    }
}

/// Counters produced by the reduce phase (one increment per stream).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReduceCounters {
    pub total_streams: u64,
    pub valid_duration: u64,
    /// Events dropped by per-event validation inside a session.
    pub rejected_events: u64,
    pub first_event_types: BTreeMap<String, u64>,
    pub last_event_types: BTreeMap<String, u64>,
}

impl ReduceCounters {
    pub fn merge(&mut self, other: &Self) {
        self.total_streams += other.total_streams;
        self.valid_duration += other.valid_duration;
        self.rejected_events += other.rejected_events;
        merge_tallies(&mut self.first_event_types, &other.first_event_types);
        merge_tallies(&mut self.last_event_types, &other.last_event_types);
    }
}

/// All counters of one job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub map: MapCounters,
    pub reduce: ReduceCounters,
}

impl Counters {
    pub fn merge(&mut self, other: &Self) {
        self.map.merge(&other.map);
        self.reduce.merge(&other.reduce);
    }

    /// Flattens the counters into `(group, name, value)` triples in a stable order.
    pub fn entries(&self) -> Vec<(&'static str, String, u64)> {
        let mut entries = vec![
            ("job-metrics", "total-events".to_string(), self.map.total_events),
            ("job-metrics", "unparsable-events".to_string(), self.map.unparsable_events),
            ("job-metrics", "keyless-events".to_string(), self.map.keyless_events),
            ("job-metrics", "valid-events".to_string(), self.map.valid_events),
            ("event-metrics", "total-streams".to_string(), self.reduce.total_streams),
            ("event-metrics", "valid-duration".to_string(), self.reduce.valid_duration),
            ("event-metrics", "rejected-events".to_string(), self.reduce.rejected_events),
        ];
        entries.extend(
            self.reduce
                .first_event_types
                .iter()
                .map(|(name, n)| ("first-event-type-metrics", name.clone(), *n)),
        );
        entries.extend(
            self.reduce
                .last_event_types
                .iter()
                .map(|(name, n)| ("last-event-type-metrics", name.clone(), *n)),
        );
        entries
    }
}

fn merge_tallies(into: &mut BTreeMap<String, u64>, from: &BTreeMap<String, u64>) {
    for (name, n) in from {
        *into.entry(name.clone()).or_insert(0) += n;
    }
}
