//! Inference session and result presentation for the MNIST harness.
//!
//! A [`Session`] wraps an external [`Classifier`]. Opening it yields a
//! [`ReadySession`] that can process records; there is no way to run a
//! record against a classifier that has not been initialized.
//!
//! The [`Harness`] glues an [`mnist_protocol::Ingestor`] to a ready session,
//! a [`TextDisplay`] and a console writer, and runs the single-threaded
//! poll/dispatch cycle.

pub mod classifier;
pub mod display;
pub mod harness;
pub mod report;
pub mod session;

pub use classifier::{Classifier, ClassifierError, TensorRole};
pub use display::{NullDisplay, Screen, TextDisplay, SCREEN_COLUMNS, SCREEN_ROWS};
pub use harness::{ConsoleFormat, Harness, HarnessStats, Recovery, StepOutcome};
pub use report::Report;
pub use session::{ReadySession, Session, SessionError};

/// Number of output classes (digits 0-9).
pub const NUM_CLASSES: usize = 10;
