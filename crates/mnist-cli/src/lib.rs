//! Host-side adapters for the MNIST inference harness.
//!
//! The `mnist-demo` binary wires these to the pipeline: records come from
//! stdin or a file, the device screen is drawn on the terminal, and a small
//! int8 dense layer stands in for the on-device classifier.

pub mod config;
pub mod engine;
pub mod exit;
pub mod terminal;
pub mod transport;
