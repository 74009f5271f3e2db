//! End-to-end tests driving the `vsc` binary.
//!
//! Covers the full pipeline: raw logs → condense → summary lines + counters.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

fn vsc_binary() -> String {
    env!("CARGO_BIN_EXE_vsc").to_string()
}

/// A command isolated from the user's config directory and environment.
fn vsc(home: &Path) -> Command {
    let mut command = Command::new(vsc_binary());
    command
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("VSC_ISP_DATABASE")
        .env_remove("VSC_GEO_DATABASE")
        .env_remove("VSC_THREADS")
        .env_remove("RUST_LOG");
    command
}

const SESSION_A: &str = "\
2013-05-02 12:00:00 player] x_tracking_id=aaa x_tpmid=7 event_type=MediaStarted x_video_location=0
2013-05-02 12:00:20 player] x_tracking_id=aaa x_tpmid=7 event_type=MediaBufferingStart x_video_location=15
2013-05-02 12:00:24 player] x_tracking_id=aaa x_tpmid=7 event_type=MediaBufferingEnd x_video_location=15
";

const SESSION_A_END: &str = "\
2013-05-02 12:05:00 player] x_tracking_id=aaa x_tpmid=7 event_type=MediaCompleted x_video_location=300
";

const SESSION_B: &str = "\
{\"time\": \"2013-05-02T13:00:00\", \"x_tracking_id\": \"bbb\", \"x_tpmid\": \"8\", \"event_type\": \"MediaStarted\", \"x_session_id\": \"ABC\"}
not a log line
";

fn parse_output(stdout: &[u8]) -> Vec<(String, serde_json::Value)> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| {
            let (key, summary) = line.split_once('\t').expect("tab separated line");
            (
                serde_json::from_str::<String>(key).unwrap(),
                serde_json::from_str(summary).unwrap(),
            )
        })
        .collect()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "vsc should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Sessions split across plain and gzipped files are condensed together.
#[test]
fn test_condense_across_files() {
    let temp = TempDir::new().unwrap();
    let plain = temp.path().join("part-0.log");
    std::fs::write(&plain, format!("{SESSION_A}{SESSION_B}")).unwrap();

    let gz = temp.path().join("part-1.log.gz");
    let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
    encoder.write_all(SESSION_A_END.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let output = vsc(temp.path())
        .arg("condense")
        .arg(&plain)
        .arg(&gz)
        .output()
        .unwrap();
    assert_success(&output);

    let sessions = parse_output(&output.stdout);
    assert_eq!(sessions.len(), 2);

    let (key, a) = &sessions[0];
    assert_eq!(key, "aaa-7");
    assert_eq!(a["playing_duration"], 300.0);
    assert_eq!(a["buffering_length"], 4.0);
    assert_eq!(a["finished_playback"], true);
    assert_eq!(a["position_latest_play"], "300");
    assert_eq!(a["earliest_time"], "2013-05-02 12:00:00");

    let (key, b) = &sessions[1];
    assert_eq!(key, "bbb-8");
    assert_eq!(b["incomplete_stream"], true);
    assert_eq!(b["session_id"], "abc");
    assert_eq!(b["playing_duration"], serde_json::Value::Null);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("job-metrics: total-events=6"), "{stderr}");
    assert!(stderr.contains("job-metrics: unparsable-events=1"), "{stderr}");
    assert!(stderr.contains("event-metrics: total-streams=2"), "{stderr}");
    assert!(stderr.contains("event-metrics: valid-duration=1"), "{stderr}");
}

/// With no input files the job reads stdin.
#[test]
fn test_condense_from_stdin() {
    let temp = TempDir::new().unwrap();

    let mut child = vsc(temp.path())
        .arg("condense")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(format!("{SESSION_A}{SESSION_A_END}").as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert_success(&output);

    let sessions = parse_output(&output.stdout);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].1["playing_duration"], 300.0);
}

/// `--output` writes summaries to a file and keeps stdout empty.
#[test]
fn test_condense_to_output_file() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("events.log");
    std::fs::write(&input, SESSION_B).unwrap();
    let out = temp.path().join("summaries.tsv");

    let output = vsc(temp.path())
        .arg("condense")
        .arg(&input)
        .arg("--output")
        .arg(&out)
        .output()
        .unwrap();
    assert_success(&output);

    assert!(output.stdout.is_empty());
    let written = std::fs::read(&out).unwrap();
    let sessions = parse_output(&written);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].0, "bbb-8");
}

/// A missing input file fails the condense run.
#[test]
fn test_condense_missing_input_fails() {
    let temp = TempDir::new().unwrap();
    let output = vsc(temp.path())
        .arg("condense")
        .arg(temp.path().join("nope.log"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.log"));
}

/// A configured but missing GeoIP database is reported up front.
#[test]
fn test_condense_missing_geoip_database_fails() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("vsc.toml");
    std::fs::write(&config, "geo_database = \"/nonexistent/GeoLite2-City.mmdb\"\n").unwrap();

    let output = vsc(temp.path())
        .arg("--config")
        .arg(&config)
        .arg("condense")
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open GeoIP databases"), "{stderr}");
}

/// The support report counts fields for the requested source only.
#[test]
fn test_support_report() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("events.log");
    std::fs::write(
        &input,
        "2013-05-02 12:00:00 p] source_tag=web event_type=MediaStarted x_tpmid=1\n\
         2013-05-02 12:00:00 p] source_tag=tv event_type=MediaStarted x_tpmid=1\n",
    )
    .unwrap();

    let output = vsc(temp.path())
        .arg("support")
        .arg("--source-tag")
        .arg("web")
        .arg(&input)
        .arg(temp.path().join("missing.log"))
        .output()
        .unwrap();
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("SOURCE: web\n"));
    assert!(stdout.contains(&format!("{:<40}: 1", "MediaStarted")));
    assert!(stdout.contains(&format!("{:<40}: 1", "x_tpmid")));
}
