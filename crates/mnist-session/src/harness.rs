//! The poll/dispatch cycle tying ingestion, inference and reporting together.

use std::fmt;
use std::io::Write;

use mnist_protocol::{ByteSource, Clock, IngestEvent, Ingestor, SampleRecord};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::classifier::Classifier;
use crate::display::{Screen, TextDisplay};
use crate::report::Report;
use crate::session::{ReadySession, Session, SessionError};

/// How inference results are written to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// Human-readable multi-line report.
    #[default]
    Text,
    /// One JSON object per line: inference reports and input events.
    Json,
}

impl std::str::FromStr for ConsoleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}'. Expected one of: text, json")),
        }
    }
}

impl fmt::Display for ConsoleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// A locally recovered input problem. Each one resets the line buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Malformed,
    Overflow,
    Timeout,
}

/// What one [`Harness::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Idle,
    Buffering,
    Ignored,
    Recovered(Recovery),
    Reported(Box<Report>),
    InferenceFailed(SessionError),
    Closed,
}

/// Running counters over the lifetime of a harness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HarnessStats {
    pub inferences: u64,
    pub correct: u64,
    pub ignored: u64,
    pub malformed: u64,
    pub overflows: u64,
    pub timeouts: u64,
    pub failures: u64,
}

impl HarnessStats {
    /// Fraction of successful inferences whose top class matched the label.
    pub fn accuracy(&self) -> Option<f64> {
        (self.inferences > 0).then(|| self.correct as f64 / self.inferences as f64)
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    event: &'static str,
    sequence: u64,
    #[serde(flatten)]
    report: &'a Report,
}

/// Non-report console lines in [`ConsoleFormat::Json`] mode.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ConsoleEvent {
    InitFailed {
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
        error: String,
    },
    Malformed {
        len: usize,
        error: String,
    },
    Overflow {
        discarded: usize,
    },
    Timeout {
        discarded: usize,
    },
    InferenceFailed {
        label: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
        error: String,
    },
}

/// Owns every piece of pipeline state for one transport.
///
/// Inference for a record completes, display included, before the next byte
/// is read.
pub struct Harness<S, K, C, D, W> {
    ingestor: Ingestor<S, K>,
    session: ReadySession<C>,
    display: D,
    console: W,
    format: ConsoleFormat,
    stats: HarnessStats,
}

impl<S, K, C, D, W> Harness<S, K, C, D, W>
where
    S: ByteSource,
    K: Clock,
    C: Classifier,
    D: TextDisplay,
    W: Write,
{
    /// Show the boot screen, open the classifier and show the ready screen.
    ///
    /// An initialization failure is drawn on the display and written to the
    /// console before being returned; no records can be processed after it.
    pub fn boot(
        classifier: C,
        ingestor: Ingestor<S, K>,
        mut display: D,
        mut console: W,
        format: ConsoleFormat,
    ) -> Result<Self, SessionError> {
        Screen::boot().render(&mut display);
        let text = format == ConsoleFormat::Text;
        if text {
            say(&mut console, format_args!("\nMNIST CNN INT8 inference harness\n"));
        }

        let session = match Session::new(classifier).open() {
            Ok(session) => session,
            Err(e) => {
                let code = e.code();
                error!(?code, error = %e, "classifier initialization failed");
                if text {
                    say(&mut console, format_args!("{}\n", init_failure_text(&e)));
                } else {
                    emit(&mut console, &ConsoleEvent::InitFailed { code, error: e.to_string() });
                }
                Screen::init_failed(code.unwrap_or(-1)).render(&mut display);
                return Err(e);
            }
        };

        if text {
            say(
                &mut console,
                format_args!(
                    "\nClassifier config:\n  Input: {}\n  Output: {}\n",
                    session.input_params(),
                    session.output_params()
                ),
            );
            if let Some(bytes) = session.classifier().arena_used_bytes() {
                say(&mut console, format_args!("  Arena used: {bytes} bytes\n"));
            }
            say(
                &mut console,
                format_args!(
                    "\nExpected format: label,pixel1,pixel2,...,pixel784\nWaiting for data...\n\n"
                ),
            );
        }
        Screen::ready().render(&mut display);
        info!(%format, "harness ready");

        Ok(Self { ingestor, session, display, console, format, stats: HarnessStats::default() })
    }

    pub fn stats(&self) -> HarnessStats {
        self.stats
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn session(&self) -> &ReadySession<C> {
        &self.session
    }

    /// One poll of the transport, plus whatever that byte completes.
    pub fn step(&mut self) -> StepOutcome {
        match self.ingestor.poll() {
            IngestEvent::Idle | IngestEvent::ControlByte(_) => StepOutcome::Idle,
            IngestEvent::Accepted { .. } => StepOutcome::Buffering,
            IngestEvent::Ignored => {
                self.stats.ignored += 1;
                StepOutcome::Ignored
            }
            IngestEvent::Record(record) => self.run_record(&record),
            IngestEvent::Malformed { error, len } => {
                self.stats.malformed += 1;
                warn!(len, %error, "discarding malformed record");
                match self.format {
                    ConsoleFormat::Text => say(
                        &mut self.console,
                        format_args!(
                            "Received {len} chars\nParse failed ({error}) - format: label,p1,p2,...,p784\n\n"
                        ),
                    ),
                    ConsoleFormat::Json => emit(
                        &mut self.console,
                        &ConsoleEvent::Malformed { len, error: error.to_string() },
                    ),
                }
                StepOutcome::Recovered(Recovery::Malformed)
            }
            IngestEvent::Overflow { discarded } => {
                self.stats.overflows += 1;
                warn!(discarded, "line buffer full, resetting");
                match self.format {
                    ConsoleFormat::Text => say(
                        &mut self.console,
                        format_args!("Buffer full! Resetting ({discarded} chars)\n"),
                    ),
                    ConsoleFormat::Json => {
                        emit(&mut self.console, &ConsoleEvent::Overflow { discarded })
                    }
                }
                StepOutcome::Recovered(Recovery::Overflow)
            }
            IngestEvent::Timeout { discarded } => {
                self.stats.timeouts += 1;
                warn!(discarded, "partial line timed out, resetting");
                match self.format {
                    ConsoleFormat::Text => say(
                        &mut self.console,
                        format_args!("Timeout - resetting ({discarded} chars)\n"),
                    ),
                    ConsoleFormat::Json => {
                        emit(&mut self.console, &ConsoleEvent::Timeout { discarded })
                    }
                }
                StepOutcome::Recovered(Recovery::Timeout)
            }
            IngestEvent::Closed => StepOutcome::Closed,
        }
    }

    /// Step until the transport closes, yielding between iterations.
    pub fn run_until_closed(&mut self) -> HarnessStats {
        while !matches!(self.step(), StepOutcome::Closed) {
            std::thread::yield_now();
        }
        info!(
            inferences = self.stats.inferences,
            correct = self.stats.correct,
            failures = self.stats.failures,
            "transport closed"
        );
        self.stats
    }

    fn run_record(&mut self, record: &SampleRecord) -> StepOutcome {
        if self.format == ConsoleFormat::Text {
            let preview: Vec<String> = record.preview(5).iter().map(u8::to_string).collect();
            say(
                &mut self.console,
                format_args!(
                    "--- New inference ---\nLabel: {}\nFirst pixels: {}\n",
                    record.label,
                    preview.join(",")
                ),
            );
        }

        let report = match self.session.process(record) {
            Ok(report) => report,
            Err(e) => {
                self.stats.failures += 1;
                let code = e.code();
                error!(?code, error = %e, label = record.label, "inference failed");
                match self.format {
                    ConsoleFormat::Text => {
                        say(&mut self.console, format_args!("{}\n\n", failure_text(&e)));
                    }
                    ConsoleFormat::Json => emit(
                        &mut self.console,
                        &ConsoleEvent::InferenceFailed {
                            label: record.label,
                            code,
                            error: e.to_string(),
                        },
                    ),
                }
                return StepOutcome::InferenceFailed(e);
            }
        };

        self.stats.inferences += 1;
        if report.correct {
            self.stats.correct += 1;
        }

        match self.format {
            ConsoleFormat::Text => {
                say(&mut self.console, format_args!("{}\n", report.console_text()));
            }
            ConsoleFormat::Json => emit(
                &mut self.console,
                &JsonLine { event: "inference", sequence: self.stats.inferences, report: &report },
            ),
        }
        report.screen().render(&mut self.display);

        StepOutcome::Reported(Box::new(report))
    }
}

/// Text-mode line for a failed session open. Only engine failures carry a
/// status code.
fn init_failure_text(e: &SessionError) -> String {
    match e.code() {
        Some(code) => format!("ERROR: classifier init failed ({code}): {e}"),
        None => format!("ERROR: classifier setup failed: {e}"),
    }
}

/// Text-mode line for a record that could not be classified.
fn failure_text(e: &SessionError) -> String {
    match e {
        SessionError::Invoke(inner) => format!("ERROR invoke ({}): {inner}", inner.code()),
        other => format!("ERROR inference failed: {other}"),
    }
}

/// Best-effort console write; a broken console must not stop the loop.
fn say<W: Write>(console: &mut W, args: fmt::Arguments<'_>) {
    if let Err(e) = console.write_fmt(args).and_then(|()| console.flush()) {
        warn!(error = %e, "console write failed");
    }
}

/// Write `event` as one JSON line.
fn emit<W: Write, T: Serialize>(console: &mut W, event: &T) {
    match serde_json::to_string(event) {
        Ok(json) => say(console, format_args!("{json}\n")),
        Err(e) => warn!(error = %e, "failed to serialize console event"),
    }
}
