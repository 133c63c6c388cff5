//! Byte sources backed by blocking readers.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::Duration;

use mnist_protocol::{ByteRead, ByteSource};
use tracing::{debug, warn};

const CHUNK_SIZE: usize = 4096;
/// Chunks buffered between the reader thread and the pipeline.
const CHANNEL_DEPTH: usize = 16;

/// Feeds the pipeline from any blocking reader.
///
/// A background thread does the blocking reads and forwards chunks over a
/// bounded channel, so [`ByteSource::read_byte`] can honour its timeout.
/// End of input, or a read error, closes the source once buffered bytes are
/// drained.
pub struct ReaderSource {
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    closed: bool,
}

impl ReaderSource {
    pub fn spawn<R: Read + Send + 'static>(reader: R) -> io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel(CHANNEL_DEPTH);
        thread::Builder::new().name("mnist-reader".into()).spawn(move || pump(reader, tx))?;
        Ok(Self { rx, pending: VecDeque::new(), closed: false })
    }

    pub fn stdin() -> io::Result<Self> {
        Self::spawn(io::stdin())
    }

    pub fn file(path: &Path) -> io::Result<Self> {
        Self::spawn(File::open(path)?)
    }
}

fn pump<R: Read>(mut reader: R, tx: SyncSender<Vec<u8>>) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "input read failed");
                break;
            }
        }
    }
    debug!("input reader finished");
}

impl ByteSource for ReaderSource {
    fn read_byte(&mut self, timeout: Duration) -> ByteRead {
        if let Some(byte) = self.pending.pop_front() {
            return ByteRead::Byte(byte);
        }
        if self.closed {
            return ByteRead::Closed;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => {
                self.pending.extend(chunk);
                self.pending.pop_front().map_or(ByteRead::Empty, ByteRead::Byte)
            }
            Err(RecvTimeoutError::Timeout) => ByteRead::Empty,
            Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                ByteRead::Closed
            }
        }
    }
}
