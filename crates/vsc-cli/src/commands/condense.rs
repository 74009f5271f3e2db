//! Condense command: raw player logs in, one summary line per session out.

use std::io::Write;

use anyhow::{Context, Result};
use rayon::prelude::*;

use vsc_core::{Counters, Enricher, JobOutput};

use crate::input::Input;

/// Runs the job over `inputs` and writes one line per session.
///
/// Each input is one split. Returns the job counters.
pub fn run<W: Write>(writer: &mut W, inputs: &[Input], enricher: &dyn Enricher) -> Result<Counters> {
    let splits = inputs
        .par_iter()
        .map(Input::read_lines)
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(inputs = splits.len(), "inputs loaded");

    let output = vsc_core::run(&splits, enricher);
    write_summaries(writer, &output)?;
    Ok(output.counters)
}

/// Writes `<json key>\t<json summary>` lines.
pub fn write_summaries<W: Write>(writer: &mut W, output: &JobOutput) -> Result<()> {
    for (key, summary) in &output.summaries {
        let key = serde_json::to_string(key)?;
        let summary = serde_json::to_string(summary)
            .with_context(|| format!("failed to serialize summary for {key}"))?;
        writeln!(writer, "{key}\t{summary}")?;
    }
    Ok(())
}

/// Writes counters as `group: name=value` lines.
pub fn write_counters<W: Write>(writer: &mut W, counters: &Counters) -> Result<()> {
    for (group, name, value) in counters.entries() {
        writeln!(writer, "{group}: {name}={value}")?;
    }
    Ok(())
}
