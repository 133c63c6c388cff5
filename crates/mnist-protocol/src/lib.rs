//! Wire protocol and byte ingestion for the MNIST inference harness.
//!
//! Records arrive one per line as `label,pixel_1,...,pixel_784`. The
//! [`Ingestor`] accumulates bytes from a [`ByteSource`] into a bounded
//! [`LineBuffer`], and hands each completed line to [`parse_line`].
//!
//! Everything here is single-threaded: one [`Ingestor::poll`] call performs
//! exactly one bounded read attempt and returns promptly.

pub mod buffer;
pub mod ingest;
pub mod record;
pub mod transport;

pub use buffer::LineBuffer;
pub use ingest::{IngestConfig, IngestEvent, Ingestor};
pub use record::{parse_line, RecordError, SampleRecord};
pub use transport::{ByteRead, ByteSource, Clock, SystemClock};

/// Pixels in one 28x28 image.
pub const MNIST_PIXELS: usize = 28 * 28;

/// Fields in a complete record: one label plus every pixel.
pub const RECORD_FIELDS: usize = MNIST_PIXELS + 1;

/// Lines starting with this byte (after leading blanks) are comments.
pub const COMMENT_MARKER: u8 = b'#';
