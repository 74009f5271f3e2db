//! Support command: which events and custom fields a player source sends.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use vsc_core::SupportReport;

use crate::input::Input;

/// Scans `paths` for lines tagged with `source_tag` and prints the report.
///
/// Unreadable files are logged and skipped.
pub fn run<W: Write>(writer: &mut W, source_tag: &str, paths: &[PathBuf]) -> Result<()> {
    let mut report = SupportReport::new(source_tag);
    for path in paths {
        let input = Input::from_path(path);
        match input.read_lines() {
            Ok(lines) => {
                tracing::info!(input = %input, lines = lines.len(), "processing file");
                for line in &lines {
                    report.record_line(line);
                }
            }
            Err(e) => tracing::warn!(input = %input, error = %format!("{e:#}"), "skipping input"),
        }
    }
    write_report(writer, &report)
}

pub fn write_report<W: Write>(writer: &mut W, report: &SupportReport) -> Result<()> {
    writeln!(writer, "SOURCE: {}", report.source_tag())?;
    writeln!(writer, "============================")?;
    for (name, count) in report.events() {
        writeln!(writer, "{name:<40}: {count}")?;
    }
    writeln!(writer)?;
    for (name, count) in report.fields() {
        writeln!(writer, "{name:<40}: {count}")?;
    }
    Ok(())
}
