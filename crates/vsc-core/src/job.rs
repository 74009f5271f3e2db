//! Local map/reduce runner.
//!
//! The map phase parses and keys every split in parallel, each split owning
//! its own counters. Keyed events are grouped by [`SessionKey`] and every
//! group is folded through one [`SessionAggregator`], again in parallel.
//! Events inside a group keep their input order but nothing downstream relies
//! on it.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::aggregator::SessionAggregator;
use crate::counters::{Counters, MapCounters, ReduceCounters};
use crate::enrich::Enricher;
use crate::event::Event;
use crate::key::{KeyDeriver, SessionKey};
use crate::summary::SessionSummary;

/// Everything one job run produces.
#[derive(Debug, Default)]
pub struct JobOutput {
    /// Summaries sorted by session key.
    pub summaries: Vec<(SessionKey, SessionSummary)>,
    pub counters: Counters,
}

/// Parses and keys the lines of one split.
pub fn map_split<S: AsRef<str>>(lines: &[S]) -> (MapCounters, Vec<(SessionKey, Event)>) {
    let mut deriver = KeyDeriver::new();
    let keyed = lines
        .iter()
        .filter_map(|line| deriver.map_line(line.as_ref()))
        .collect();
    (deriver.into_counters(), keyed)
}

/// Folds the events of one session and tallies the reduce counters.
pub fn reduce(events: &[Event], enricher: &dyn Enricher) -> (SessionSummary, ReduceCounters) {
    let mut aggregator = SessionAggregator::with_enricher(enricher);
    for event in events {
        // Rejections are tallied on the state and logged there.
        let _ = aggregator.add_event(event);
    }
    let summary = aggregator.summary();

    let mut counters = ReduceCounters {
        total_streams: 1,
        valid_duration: u64::from(summary.has_duration()),
        rejected_events: aggregator.state().rejected_events(),
        ..ReduceCounters::default()
    };
    if let Some(first) = &summary.first_event_type {
        counters.first_event_types.insert(first.clone(), 1);
    }
    if let Some(last) = &summary.last_event_type {
        counters.last_event_types.insert(last.clone(), 1);
    }

    (summary, counters)
}

/// Runs the whole job over in-memory splits.
pub fn run<S>(splits: &[Vec<S>], enricher: &dyn Enricher) -> JobOutput
where
    S: AsRef<str> + Sync,
{
    let mapped: Vec<_> = splits.par_iter().map(|split| map_split(split)).collect();

    let mut counters = Counters::default();
    let mut groups: BTreeMap<SessionKey, Vec<Event>> = BTreeMap::new();
    for (split_counters, keyed) in mapped {
        counters.map.merge(&split_counters);
        for (key, event) in keyed {
            groups.entry(key).or_default().push(event);
        }
    }
    tracing::info!(
        events = counters.map.total_events,
        sessions = groups.len(),
        "map phase finished"
    );

    let groups: Vec<_> = groups.into_iter().collect();
    let reduced: Vec<_> = groups
        .par_iter()
        .map(|(key, events)| {
            let (summary, reduce_counters) = reduce(events, enricher);
            (key.clone(), summary, reduce_counters)
        })
        .collect();

    let mut summaries = Vec::with_capacity(reduced.len());
    for (key, summary, reduce_counters) in reduced {
        counters.reduce.merge(&reduce_counters);
        summaries.push((key, summary));
    }
    tracing::info!(
        streams = counters.reduce.total_streams,
        valid_duration = counters.reduce.valid_duration,
        "reduce phase finished"
    );

    JobOutput {
        summaries,
        counters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::NoopEnricher;

    fn lines(raw: &str) -> Vec<String> {
        raw.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_map_split_counts_lines() {
        let split = lines(
            "2013-05-02 12:00:01 a] x_tracking_id=t1 x_tpmid=m event_type=MediaStarted\n\
             not a log line\n\
             2013-05-02 12:00:02 a] x_tpmid=m event_type=MediaEnded",
        );
        let (counters, keyed) = map_split(&split);
        assert_eq!(counters.total_events, 3);
        assert_eq!(counters.unparsable_events, 1);
        assert_eq!(counters.keyless_events, 1);
        assert_eq!(counters.valid_events, 1);
        assert_eq!(keyed[0].0.as_str(), "t1-m");
    }

    #[test]
    fn test_reduce_tallies_stream() {
        let events = [
            Event::from_pairs([
                ("x_tpmid", "m"),
                ("event_type", "MediaStarted"),
                ("event_date", "2013-05-02 12:00:00"),
            ]),
            Event::from_pairs([
                ("x_tpmid", "m"),
                ("event_type", "MediaEnded"),
                ("event_date", "2013-05-02 12:00:30"),
            ]),
            Event::from_pairs([("event_type", "MediaEnded")]),
        ];
        let (summary, counters) = reduce(&events, &NoopEnricher);
        assert_eq!(summary.playing_duration, Some(30.0));
        assert_eq!(counters.total_streams, 1);
        assert_eq!(counters.valid_duration, 1);
        assert_eq!(counters.rejected_events, 1);
        assert_eq!(counters.first_event_types["MediaStarted"], 1);
        assert_eq!(counters.last_event_types["MediaEnded"], 1);
    }

    #[test]
    fn test_run_groups_across_splits() {
        let splits = vec![
            lines(
                "2013-05-02 12:00:00 a] x_tracking_id=t1 x_tpmid=m event_type=MediaStarted\n\
                 2013-05-02 12:00:00 a] x_tracking_id=t2 x_tpmid=m event_type=MediaStarted",
            ),
            lines(
                "2013-05-02 12:01:00 a] x_tracking_id=t1 x_tpmid=m event_type=MediaEnded\n\
                 garbage",
            ),
        ];

        let output = run(&splits, &NoopEnricher);

        let keys: Vec<_> = output.summaries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["t1-m", "t2-m"]);
        assert_eq!(output.summaries[0].1.playing_duration, Some(60.0));
        assert_eq!(output.summaries[1].1.playing_duration, None);
        assert_eq!(output.counters.map.total_events, 4);
        assert_eq!(output.counters.map.unparsable_events, 1);
        assert_eq!(output.counters.reduce.total_streams, 2);
        assert_eq!(output.counters.reduce.valid_duration, 1);
        assert_eq!(output.counters.reduce.first_event_types["MediaStarted"], 2);
    }

    #[test]
    fn test_run_on_nothing() {
        let splits: Vec<Vec<String>> = Vec::new();
        let output = run(&splits, &NoopEnricher);
        assert!(output.summaries.is_empty());
        assert_eq!(output.counters, Counters::default());
    }
}
