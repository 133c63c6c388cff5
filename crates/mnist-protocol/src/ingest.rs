//! Cooperative ingestion loop: bytes in, records out.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::buffer::LineBuffer;
use crate::record::{parse_line, RecordError, SampleRecord};
use crate::transport::{ByteRead, ByteSource, Clock};

/// Default line capacity. A full-scale record is at most ~3.2 KB.
pub const DEFAULT_CAPACITY: usize = 8192;
/// A partial line older than this is abandoned.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(3);
/// Bound on each read attempt.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_micros(100);
/// Emit a progress event every this many buffered bytes.
pub const DEFAULT_PROGRESS_EVERY: usize = 500;

/// Tunables for [`Ingestor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub capacity: usize,
    pub idle_timeout: Duration,
    pub poll_timeout: Duration,
    /// `0` disables progress events.
    pub progress_every: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// What a single [`Ingestor::poll`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// No byte, or a terminator on an empty buffer.
    Idle,
    /// A byte was buffered; `len` is the new buffer length.
    Accepted { len: usize },
    /// A non-printable byte was dropped.
    ControlByte(u8),
    /// A complete, valid record.
    Record(Box<SampleRecord>),
    /// A blank or comment line.
    Ignored,
    /// A complete line that failed to parse. The buffer was reset.
    Malformed { error: RecordError, len: usize },
    /// The buffer was full before a terminator arrived and was discarded.
    Overflow { discarded: usize },
    /// A partial line sat idle too long and was discarded.
    Timeout { discarded: usize },
    /// The transport ended.
    Closed,
}

/// Accumulates transport bytes into lines and parses them.
///
/// Owns the only line buffer for its transport; there is never more than one
/// dispatcher per buffer.
pub struct Ingestor<S, C> {
    source: S,
    clock: C,
    config: IngestConfig,
    buffer: LineBuffer,
    last_activity: Instant,
    closed: bool,
}

impl<S: ByteSource, C: Clock> Ingestor<S, C> {
    pub fn new(source: S, clock: C, config: IngestConfig) -> Self {
        let last_activity = clock.now();
        let buffer = LineBuffer::new(config.capacity);
        Self { source, clock, config, buffer, last_activity, closed: false }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Bytes currently waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run one read attempt and react to it.
    pub fn poll(&mut self) -> IngestEvent {
        if self.closed {
            return IngestEvent::Closed;
        }
        match self.source.read_byte(self.config.poll_timeout) {
            ByteRead::Byte(byte) => {
                self.last_activity = self.clock.now();
                self.on_byte(byte)
            }
            ByteRead::Empty => self.check_idle(),
            ByteRead::Closed => {
                self.closed = true;
                if self.buffer.is_empty() {
                    IngestEvent::Closed
                } else {
                    debug!(len = self.buffer.len(), "transport closed with pending line");
                    self.dispatch()
                }
            }
        }
    }

    fn on_byte(&mut self, byte: u8) -> IngestEvent {
        if byte == b'\n' || byte == b'\r' {
            return if self.buffer.is_empty() { IngestEvent::Idle } else { self.dispatch() };
        }

        if self.buffer.is_full() {
            let discarded = self.buffer.len();
            self.buffer.reset();
            debug!(discarded, capacity = self.buffer.capacity(), "line buffer overflow");
            return IngestEvent::Overflow { discarded };
        }

        let stored = match byte {
            b'\t' => b' ',
            0x20..=0x7E => byte,
            _ => return IngestEvent::ControlByte(byte),
        };
        // Capacity was checked above.
        self.buffer.try_push(stored);

        let len = self.buffer.len();
        if self.config.progress_every > 0 && len % self.config.progress_every == 0 {
            debug!(len, "receiving record");
        }
        IngestEvent::Accepted { len }
    }

    fn check_idle(&mut self) -> IngestEvent {
        if self.buffer.is_empty() {
            return IngestEvent::Idle;
        }
        let idle = self.clock.now().saturating_duration_since(self.last_activity);
        if idle > self.config.idle_timeout {
            let discarded = self.buffer.len();
            self.buffer.reset();
            debug!(discarded, idle_ms = idle.as_millis() as u64, "abandoning idle partial line");
            return IngestEvent::Timeout { discarded };
        }
        IngestEvent::Idle
    }

    fn dispatch(&mut self) -> IngestEvent {
        let len = self.buffer.len();
        let parsed = parse_line(&String::from_utf8_lossy(self.buffer.as_bytes()));
        self.buffer.reset();
        debug!(len, "line complete");
        match parsed {
            Ok(Some(record)) => IngestEvent::Record(Box::new(record)),
            Ok(None) => IngestEvent::Ignored,
            Err(error) => IngestEvent::Malformed { error, len },
        }
    }
}
