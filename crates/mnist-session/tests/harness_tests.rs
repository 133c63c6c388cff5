//! The full poll/dispatch cycle with scripted collaborators.

use std::time::Duration;

use mnist_protocol::{IngestConfig, Ingestor};
use mnist_session::{
    ClassifierError, ConsoleFormat, Harness, HarnessStats, Recovery, SessionError, StepOutcome,
};
use mnist_test_support::{record_line, ManualClock, MockClassifier, RecordingDisplay, ScriptedSource};

type TestHarness =
    Harness<ScriptedSource, ManualClock, MockClassifier, RecordingDisplay, Vec<u8>>;

fn boot(
    classifier: MockClassifier,
    source: ScriptedSource,
    clock: &ManualClock,
    format: ConsoleFormat,
) -> Result<TestHarness, SessionError> {
    let ingestor = Ingestor::new(source, clock.clone(), IngestConfig::default());
    Harness::boot(classifier, ingestor, RecordingDisplay::new(), Vec::new(), format)
}

fn console(h: &TestHarness) -> String {
    String::from_utf8_lossy(h.console()).into_owned()
}

/// Parse every console line as JSON; any plain-text line fails the test.
fn json_lines(out: &str) -> Vec<serde_json::Value> {
    out.lines()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON: {l:?} ({e})")))
        .collect()
}

/// Step until something other than idle/buffering happens.
fn next_outcome(h: &mut TestHarness) -> StepOutcome {
    for _ in 0..100_000 {
        match h.step() {
            StepOutcome::Idle | StepOutcome::Buffering => {}
            other => return other,
        }
    }
    panic!("no outcome within step budget");
}

#[test]
fn boot_shows_splash_then_ready() {
    let clock = ManualClock::new();
    let h = boot(MockClassifier::new(), ScriptedSource::new(), &clock, ConsoleFormat::Text)
        .unwrap();
    let frames = h.display().frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], ["MNIST CNN", "Probs mode %", "Starting..."]);
    assert_eq!(frames[1], ["READY", "Send CSV line:", "label,p1,...,p784"]);

    let out = console(&h);
    assert!(out.contains("Input: scale=0.003922, zero_point=-128"));
    assert!(out.contains("Arena used: 794 bytes"));
    assert!(out.contains("Waiting for data..."));
}

#[test]
fn failed_init_draws_error_screen_and_returns() {
    let clock = ManualClock::new();
    let mut display = RecordingDisplay::new();
    let mut out = Vec::new();
    let ingestor = Ingestor::new(ScriptedSource::new(), clock.clone(), IngestConfig::default());
    let err = Harness::boot(
        MockClassifier::new().failing_init(4),
        ingestor,
        &mut display,
        &mut out,
        ConsoleFormat::Text,
    )
    .err()
    .unwrap();

    assert_eq!(err, SessionError::Init(ClassifierError::Status(4)));
    assert_eq!(display.last_frame().unwrap(), ["ERROR!", "Init failed", "code 4"]);
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("ERROR: classifier init failed (4)"));
    assert!(!out.contains("Waiting for data"));
}

#[test]
fn record_is_reported_on_console_and_screen() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new().line(&record_line(0, 0)).then_close();
    let mut h = boot(MockClassifier::new(), source, &clock, ConsoleFormat::Text).unwrap();

    let report = match next_outcome(&mut h) {
        StepOutcome::Reported(report) => report,
        other => panic!("expected report, got {other:?}"),
    };
    assert_eq!(report.predicted, 0);
    assert!(report.correct);

    assert_eq!(
        h.display().last_frame().unwrap(),
        ["LABEL: 0", "1:0 100.0%", "2:1 0.0%", "3:2 0.0%", "PRED:0 OK!"]
    );
    let out = console(&h);
    assert!(out.contains("--- New inference ---\nLabel: 0\nFirst pixels: 0,0,0,0,0\n"));
    assert!(out.contains("Result: pred=0 label=0 OK (confidence: 100.0%)"));

    assert_eq!(next_outcome(&mut h), StepOutcome::Closed);
    assert_eq!(h.stats().inferences, 1);
    assert_eq!(h.stats().accuracy(), Some(1.0));
}

#[test]
fn json_mode_writes_one_object_per_inference() {
    let clock = ManualClock::new();
    let source =
        ScriptedSource::new().line(&record_line(0, 0)).line(&record_line(3, 0)).then_close();
    let mut h = boot(MockClassifier::new(), source, &clock, ConsoleFormat::Json).unwrap();
    let stats = h.run_until_closed();
    assert_eq!(stats.inferences, 2);
    assert_eq!(stats.correct, 1);

    let lines = json_lines(&console(&h));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "inference");
    assert_eq!(lines[0]["sequence"], 1);
    assert_eq!(lines[0]["predicted"], 0);
    assert_eq!(lines[1]["label"], 3);
    assert_eq!(lines[1]["correct"], false);
    assert_eq!(lines[1]["ranking"][0]["class_index"], 0);
}

#[test]
fn json_mode_reports_input_events_as_objects() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new()
        .line("hello")
        .bytes("1,2,3")
        .silence(2)
        .line(&record_line(0, 0))
        .line(&record_line(1, 0))
        .then_close();
    let mock = MockClassifier::new().fail_next_invoke(-2);
    let mut h = boot(mock, source, &clock, ConsoleFormat::Json).unwrap();

    assert_eq!(next_outcome(&mut h), StepOutcome::Recovered(Recovery::Malformed));
    for _ in 0..5 {
        h.step();
    }
    clock.advance(Duration::from_secs(4));
    assert_eq!(h.step(), StepOutcome::Recovered(Recovery::Timeout));
    let stats = h.run_until_closed();
    assert_eq!((stats.failures, stats.inferences), (1, 1));

    let lines = json_lines(&console(&h));
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        serde_json::json!({
            "event": "malformed",
            "len": 5,
            "error": "unexpected byte 0x68 at offset 0"
        })
    );
    assert_eq!(lines[1], serde_json::json!({ "event": "timeout", "discarded": 5 }));
    assert_eq!(lines[2]["event"], "inference_failed");
    assert_eq!(lines[2]["label"], 0);
    assert_eq!(lines[2]["code"], -2);
    assert_eq!(lines[3]["event"], "inference");
    assert_eq!(lines[3]["label"], 1);
}

#[test]
fn json_mode_boot_failure_is_one_object() {
    let clock = ManualClock::new();
    let mut out = Vec::new();
    let ingestor = Ingestor::new(ScriptedSource::new(), clock.clone(), IngestConfig::default());
    Harness::boot(
        MockClassifier::new().failing_init(4),
        ingestor,
        RecordingDisplay::new(),
        &mut out,
        ConsoleFormat::Json,
    )
    .err()
    .unwrap();

    let lines = json_lines(&String::from_utf8(out).unwrap());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["event"], "init_failed");
    assert_eq!(lines[0]["code"], 4);
}

#[test]
fn json_mode_boot_is_silent_on_console() {
    let clock = ManualClock::new();
    let h = boot(MockClassifier::new(), ScriptedSource::new(), &clock, ConsoleFormat::Json)
        .unwrap();
    assert!(console(&h).is_empty());
    assert_eq!(h.display().last_frame().unwrap()[0], "READY");
}

#[test]
fn input_errors_are_recovered_and_counted() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new()
        .line("hello")
        .line("# comment")
        .bytes("1,2,3")
        .silence(2)
        .line(&record_line(0, 0))
        .then_close();
    let mut h = boot(MockClassifier::new(), source, &clock, ConsoleFormat::Text).unwrap();

    assert_eq!(next_outcome(&mut h), StepOutcome::Recovered(Recovery::Malformed));
    assert_eq!(next_outcome(&mut h), StepOutcome::Ignored);

    for _ in 0..5 {
        h.step();
    }
    clock.advance(Duration::from_secs(4));
    assert_eq!(h.step(), StepOutcome::Recovered(Recovery::Timeout));

    assert!(matches!(next_outcome(&mut h), StepOutcome::Reported(_)));
    assert_eq!(next_outcome(&mut h), StepOutcome::Closed);

    assert_eq!(
        h.stats(),
        HarnessStats {
            inferences: 1,
            correct: 1,
            ignored: 1,
            malformed: 1,
            timeouts: 1,
            ..HarnessStats::default()
        }
    );
    let out = console(&h);
    assert!(out.contains("Received 5 chars\nParse failed (unexpected byte 0x68 at offset 0)"));
    assert!(out.contains("Timeout - resetting (5 chars)"));
}

#[test]
fn invoke_failure_keeps_the_loop_running() {
    let clock = ManualClock::new();
    let source =
        ScriptedSource::new().line(&record_line(0, 0)).line(&record_line(0, 0)).then_close();
    let mock = MockClassifier::new().fail_next_invoke(-2);
    let mut h = boot(mock, source, &clock, ConsoleFormat::Text).unwrap();

    assert_eq!(
        next_outcome(&mut h),
        StepOutcome::InferenceFailed(SessionError::Invoke(ClassifierError::Status(-2)))
    );
    assert!(console(&h).contains("ERROR invoke (-2)"));
    // The ready screen is still up after the failed record.
    assert_eq!(h.display().last_frame().unwrap()[0], "READY");

    assert!(matches!(next_outcome(&mut h), StepOutcome::Reported(_)));
    let stats = h.run_until_closed();
    assert_eq!((stats.failures, stats.inferences), (1, 1));
}

#[test]
fn overflow_is_reported_on_console() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new().bytes(vec![b'7'; 40]).then_close();
    let ingestor = Ingestor::new(
        source,
        clock.clone(),
        IngestConfig { capacity: 32, ..IngestConfig::default() },
    );
    let mut h = Harness::boot(
        MockClassifier::new(),
        ingestor,
        RecordingDisplay::new(),
        Vec::new(),
        ConsoleFormat::Text,
    )
    .unwrap();

    assert_eq!(next_outcome(&mut h), StepOutcome::Recovered(Recovery::Overflow));
    assert!(String::from_utf8_lossy(h.console()).contains("Buffer full! Resetting (32 chars)"));
    // The 7 bytes after the dropped one are flushed as a bad line on close.
    assert_eq!(next_outcome(&mut h), StepOutcome::Recovered(Recovery::Malformed));
    assert_eq!(next_outcome(&mut h), StepOutcome::Closed);
}
