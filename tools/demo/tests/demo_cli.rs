//! End-to-end runs of the demonstration binary.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]

use assert_cmd::Command;
use checkmem::{JsonlReporter, Outcome};
use predicates::prelude::*;
use tempfile::TempDir;

fn demo() -> Command {
    let mut cmd = Command::cargo_bin("checkmem-demo").unwrap();
    cmd.env("RUST_LOG", "off");
    cmd
}

/// Pull `<N>` out of a `<prefix><N> bytes` line.
fn parse_bytes(stdout: &str, prefix: &str) -> i64 {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(prefix))
        .and_then(|rest| rest.strip_suffix(" bytes"))
        .map(str::trim)
        .and_then(|n| n.parse().ok())
        .unwrap_or_else(|| panic!("no '{prefix}' line in output:\n{stdout}"))
}

#[test]
fn default_run_reports_about_one_mebibyte() {
    let output = demo().assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();

    let delta = parse_bytes(&stdout, "Memory delta: ");
    let peak = parse_bytes(&stdout, "Peak usage: ");

    assert!(
        (1_048_576..=1_048_576 + 16_384).contains(&delta),
        "delta {delta} is not about 1 MiB"
    );
    assert!(peak >= delta, "peak {peak} below delta {delta}");
}

#[test]
fn thread_scope_zero_size_reports_nothing_retained() {
    demo()
        .args(["--size", "0", "--scope", "thread"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Memory delta: 0 bytes"))
        .stdout(predicate::str::contains("Peak usage: 0 bytes"));
}

#[test]
fn verbose_format_prints_before_and_after_blocks() {
    demo()
        .args(["--format", "verbose", "--size", "4096"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Before calling        : create_memory_leak"))
        .stdout(predicate::str::contains("After calling         : create_memory_leak"))
        .stdout(predicate::str::contains("Memory delta: "));
}

#[test]
fn json_output_is_written_to_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports.jsonl");

    demo()
        .args(["--format", "json", "--scope", "thread", "--size", "8192", "--chunk", "1024"])
        .arg("--output")
        .arg(&path)
        .assert()
        .success();

    let reports = JsonlReporter::new(path).read_reports().unwrap();
    assert_eq!(reports.len(), 1);
    let report = reports.first().unwrap();
    assert_eq!(report.label(), "create_memory_leak");
    assert_eq!(report.outcome(), Outcome::Returned);
    // Eight blocks plus the accumulator's own buffer.
    assert!(report.delta_bytes() >= 8192);
    assert!(report.allocations() >= 8);
}

#[test]
fn json_stdout_is_one_parsable_line() {
    let output = demo()
        .args(["--format", "json", "--size", "1024"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    let value: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(value["label"], "create_memory_leak");
    assert_eq!(value["scope"], "process");
}

#[test]
fn zero_chunk_is_rejected() {
    demo()
        .args(["--chunk", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("chunk must be greater than 0"));
}
