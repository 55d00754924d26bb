//! Integration tests for end-to-end sweeps.
//!
//! These tests launch real processes and verify the full pipeline:
//! Scenarios → Substitute → Launch → Analyze → Aggregate → Sinks
#![cfg(unix)]

use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;
use std::time::Duration;

use sweeprun_runtime::analyzers::{Anchor, PatternAnalyzer, RawOutputAnalyzer};
use sweeprun_runtime::sinks::TableSink;
use sweeprun_runtime::sources::{Combine, ScenarioList, ScenarioSource, TableScenarios};
use sweeprun_runtime::{scenario, Error, Execution, Stream, TextEncoding};
use sweeprun_tests::TestHarness;
use sweeprun_tools::plan::Plan;

/// Template running a shell script given as the `script` scenario key.
const SHELL: &str = "sh -c \"{script}\"";

fn marker(dir: &Path, name: &str) -> String {
    dir.join(name).display().to_string()
}

/// Test the canonical single-scenario run.
///
/// Verifies: id and command are seeded, stdout keeps its trailing newline,
/// and `error` is absent when stderr is empty.
#[test]
fn test_echo_single_scenario() {
    let harness = TestHarness::new("echo {x}")
        .with_scenarios(&[&[("x", "hi")]])
        .with_analyzer(RawOutputAnalyzer);

    let table = harness.run();

    assert_eq!(table.records.len(), 1);
    let record = &table.records[0];
    assert_eq!(record.id(), "0");
    assert_eq!(record.command(), "echo hi");
    assert_eq!(record.get("output"), Some("hi\n"));
    assert_eq!(record.get("error"), None);
    assert_eq!(table.fields.to_vec(), vec!["id", "command", "output"]);
    assert_eq!(harness.sink().last(), Some(table));
}

/// Test that stderr is captured separately from stdout.
#[test]
fn test_stderr_captured_separately() {
    let harness = TestHarness::new(SHELL)
        .with_scenarios(&[&[("script", "echo out; echo oops >&2")]])
        .with_analyzer(RawOutputAnalyzer);

    let table = harness.run();
    let record = &table.records[0];
    assert_eq!(record.get("output"), Some("out\n"));
    assert_eq!(record.get("error"), Some("oops\n"));
}

/// Test that ids follow launch order, not completion order.
#[test]
fn test_ids_follow_launch_order() {
    let harness = TestHarness::new(SHELL)
        .with_scenarios(&[
            &[("script", "sleep 0.3; echo slow")],
            &[("script", "echo fast")],
        ])
        .with_analyzer(RawOutputAnalyzer);

    assert_eq!(
        harness.column("output"),
        vec![Some("slow\n".to_string()), Some("fast\n".to_string())]
    );
    assert_eq!(
        harness.column("id"),
        vec![Some("0".to_string()), Some("1".to_string())]
    );
}

/// Test that serial mode launches each process after the previous exited.
#[test]
fn test_serial_launches_after_previous_exit() {
    let dir = tempfile::tempdir().unwrap();
    let done = marker(dir.path(), "first_done");

    let first = format!("sleep 0.3; touch {done}");
    let second = format!("test -e {done} && echo after || echo before");
    let harness = TestHarness::new(SHELL)
        .with_scenarios(&[&[("script", &first)], &[("script", &second)]])
        .with_analyzer(RawOutputAnalyzer)
        .with_execution(Execution::Serial);

    let outputs = harness.column("output");
    assert_eq!(outputs[1].as_deref(), Some("after\n"));
}

/// Test that parallel mode starts every process before any of them exits.
#[test]
fn test_parallel_starts_all_before_any_exit() {
    let dir = tempfile::tempdir().unwrap();
    let a = marker(dir.path(), "a_started");
    let b = marker(dir.path(), "b_started");

    let first = format!("touch {a}; sleep 0.5; test -e {b} && echo saw_peer || echo alone");
    let second = format!("touch {b}; sleep 0.5; test -e {a} && echo saw_peer || echo alone");
    let harness = TestHarness::new(SHELL)
        .with_scenarios(&[&[("script", &first)], &[("script", &second)]])
        .with_analyzer(RawOutputAnalyzer);

    assert_eq!(
        harness.column("output"),
        vec![Some("saw_peer\n".to_string()), Some("saw_peer\n".to_string())]
    );

    // The same scenarios run serially never overlap.
    std::fs::remove_file(&a).unwrap();
    std::fs::remove_file(&b).unwrap();
    let serial = harness.with_execution(Execution::Serial);
    assert_eq!(
        serial.column("output")[0].as_deref(),
        Some("alone\n"),
        "first serial process must not see its successor"
    );
}

/// Test that a bounded window holds back launches until the oldest exits.
#[test]
fn test_max_in_flight_bounds_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let started = dir.path().join("started");
    std::fs::create_dir(&started).unwrap();
    let started = started.display().to_string();

    let script = |i: usize| format!("touch {started}/{i}; sleep 0.4; ls {started} | wc -l");
    let scripts: Vec<String> = (0..3).map(script).collect();
    let harness = TestHarness::new(SHELL)
        .with_scenarios(&[
            &[("script", &scripts[0])],
            &[("script", &scripts[1])],
            &[("script", &scripts[2])],
        ])
        .with_analyzer(PatternAnalyzer::new(r"\s*(?P<seen>\d+)").unwrap())
        .map_sweep(|sweep| sweep.with_max_in_flight(NonZeroUsize::new(2).unwrap()));

    let seen = harness.column("seen");
    assert_eq!(seen[0].as_deref(), Some("2"), "third launch waits for the first exit");
    assert_eq!(seen[2].as_deref(), Some("3"));
}

/// Test the pattern analyzer's anchoring against live output.
#[test]
fn test_pattern_analyzer_on_process_output() {
    let harness = TestHarness::new("echo status {code} ok")
        .with_scenarios(&[&[("code", "42")], &[("code", "7")]])
        .with_analyzer(PatternAnalyzer::new(r"(?P<leading>\d+)").unwrap())
        .with_analyzer(PatternAnalyzer::new(r"status (?P<code>\d+)").unwrap())
        .with_analyzer(
            PatternAnalyzer::with_anchor(r"(?P<tail>ok)", Anchor::Anywhere).unwrap(),
        );

    let table = harness.run();
    assert_eq!(table.fields.to_vec(), vec!["id", "command", "code", "tail"]);
    assert_eq!(table.records[0].get("code"), Some("42"));
    assert_eq!(table.records[1].get("code"), Some("7"));
    assert_eq!(table.records[1].get("tail"), Some("ok"));
    assert!(!table.records[0].contains_key("leading"));
}

/// Test the field set invariant across heterogeneous records.
///
/// Keys appear in first-seen order after `id` and `command`, and records
/// missing a key leave it out.
#[test]
fn test_field_set_over_heterogeneous_records() {
    let harness = TestHarness::new(SHELL)
        .with_scenarios(&[
            &[("script", "echo beta=2")],
            &[("script", "echo alpha=1; echo id=9 >&2")],
        ])
        .with_analyzer(PatternAnalyzer::new(r"beta=(?P<beta>\d)").unwrap())
        .with_analyzer(PatternAnalyzer::new(r"alpha=(?P<alpha>\d)").unwrap())
        .with_analyzer(
            PatternAnalyzer::new(r"id=(?P<id>\d)")
                .unwrap()
                .in_stream(Stream::Stderr),
        );

    let table = harness.run();
    let fields = table.fields.to_vec();
    assert_eq!(fields, vec!["id", "command", "beta", "alpha"]);
    assert_eq!(fields.iter().filter(|f| *f == "id").count(), 1);
    assert_eq!(fields.iter().filter(|f| *f == "command").count(), 1);
    assert_eq!(table.records[1].id(), "1");
    assert!(!table.records[0].contains_key("alpha"));
}

/// Test that sources are concatenated and combined scenarios merge.
#[test]
fn test_concatenated_and_combined_sources() {
    let left: std::sync::Arc<dyn ScenarioSource> = std::sync::Arc::new(ScenarioList::new(vec![
        scenario([("a", "1")]),
        scenario([("a", "2")]),
    ]));
    let right: std::sync::Arc<dyn ScenarioSource> = std::sync::Arc::new(ScenarioList::new(vec![
        scenario([("b", "x")]),
        scenario([("b", "y")]),
    ]));

    let harness = TestHarness::new("echo {a}{b}")
        .with_source(Combine::product(vec![left.clone(), right.clone()]).unwrap())
        .with_source(Combine::zip(vec![left, right]).unwrap())
        .with_analyzer(RawOutputAnalyzer);

    let outputs: Vec<_> = harness.column("output").into_iter().flatten().collect();
    assert_eq!(
        outputs,
        vec!["1x\n", "1y\n", "2x\n", "2y\n", "1x\n", "2y\n"]
    );
}

/// Test a table-backed source feeding a table sink on disk.
#[test]
fn test_table_in_table_out() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("args.csv");
    let output = dir.path().join("results.csv");
    std::fs::write(&input, "word,count\nhello,1\n\"two words\",2\n").unwrap();

    let harness = TestHarness::new("printf \"%s:%s\" {count} \"{word}\"")
        .with_source(TableScenarios::new(&input))
        .with_analyzer(PatternAnalyzer::new(r"(?P<n>\d+):(?P<w>.+)").unwrap())
        .map_sweep(|sweep| sweep.with_sink(TableSink::to_path(&output)));

    harness.run();

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        "id,command,n,w\n\
         0,printf %s:%s 1 hello,1,hello\n\
         1,printf %s:%s 2 two words,2,two words\n"
    );
}

/// Test that a launch failure aborts the run and kills launched siblings.
#[test]
fn test_launch_failure_kills_siblings_and_emits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let survived = marker(dir.path(), "survived");

    let sleeper = format!("sh -c \"sleep 1; touch {survived}\"");
    let harness = TestHarness::new("{cmd}")
        .with_scenarios(&[
            &[("cmd", &sleeper)],
            &[("cmd", "/definitely/not/a/program --flag")],
        ])
        .with_analyzer(RawOutputAnalyzer);

    let result = harness.try_run();
    match result {
        Err(Error::Spawn { id, program, .. }) => {
            assert_eq!(id, 1);
            assert_eq!(program, "/definitely/not/a/program");
        }
        other => panic!("expected spawn failure, got {other:?}"),
    }
    assert!(harness.sink().tables().is_empty());

    thread::sleep(Duration::from_millis(1500));
    assert!(
        !Path::new(&survived).exists(),
        "sibling process should have been terminated"
    );
}

/// Test that undecodable output is fatal unless the encoding accepts it.
#[test]
fn test_decode_failure_is_fatal() {
    let harness = TestHarness::new("printf {bytes}")
        .with_scenarios(&[&[("bytes", "\\\\377")]])
        .with_analyzer(RawOutputAnalyzer);

    assert!(matches!(
        harness.try_run(),
        Err(Error::Decode {
            id: 0,
            stream: Stream::Stdout,
            encoding: TextEncoding::Utf8,
        })
    ));
    assert!(harness.sink().tables().is_empty());

    let latin = harness.map_sweep(|sweep| sweep.with_encoding(TextEncoding::Latin1));
    assert_eq!(latin.column("output"), vec![Some("\u{ff}".to_string())]);
}

/// Test that a run plan drives the same pipeline.
#[test]
fn test_plan_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let yaml = format!(
        r#"
command: "echo {{n}}"
options:
  execution: serial
sources:
  - list: [{{ n: 1 }}, {{ n: 2 }}]
analyzers:
  - pattern:
      pattern: "(?P<value>\\d+)"
outputs:
  - table:
      path: "{}"
"#,
        output.display()
    );

    let table = Plan::from_yaml(&yaml)
        .unwrap()
        .to_sweep()
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(table.records.len(), 2);

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written, "id,command,value\n0,echo 1,1\n1,echo 2,2\n");
}
