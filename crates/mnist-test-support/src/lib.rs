//! Test doubles for the mnist-harness workspace.
//!
//! Only integration tests (`tests/`) should depend on this crate: it links
//! the library crates it fakes, so using it from a crate's own unit tests
//! would pull in a second copy of that crate.

mod classifier;
mod display;
mod env_guard;
mod records;
mod source;

pub use classifier::MockClassifier;
pub use display::RecordingDisplay;
pub use env_guard::EnvGuard;
pub use records::{record_line, record_line_with};
pub use source::{ManualClock, ScriptedSource};
