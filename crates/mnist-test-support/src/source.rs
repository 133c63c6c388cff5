use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use mnist_protocol::{ByteRead, ByteSource, Clock};

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Rc::new(Cell::new(Instant::now())) }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Byte source that replays a fixed script.
///
/// Each `read_byte` consumes one scripted step. Once the script is exhausted
/// the source reports `Closed` if built with [`ScriptedSource::then_close`],
/// otherwise `Empty` forever.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<ByteRead>,
    close_at_end: bool,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.steps.extend(bytes.as_ref().iter().map(|&b| ByteRead::Byte(b)));
        self
    }

    pub fn line(self, text: &str) -> Self {
        self.bytes(text).bytes(b"\n")
    }

    /// `polls` consecutive reads that see no data.
    pub fn silence(mut self, polls: usize) -> Self {
        self.steps.extend(std::iter::repeat(ByteRead::Empty).take(polls));
        self
    }

    pub fn then_close(mut self) -> Self {
        self.close_at_end = true;
        self
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl ByteSource for ScriptedSource {
    fn read_byte(&mut self, _timeout: Duration) -> ByteRead {
        match self.steps.pop_front() {
            Some(step) => step,
            None if self.close_at_end => ByteRead::Closed,
            None => ByteRead::Empty,
        }
    }
}
