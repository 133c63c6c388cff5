//! The external classifier capability.

use std::fmt;

use thiserror::Error;

/// Which tensor a quantization query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorRole {
    Input,
    Output,
}

impl fmt::Display for TensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Failure reported by a classifier engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier returned status {0}")]
    Status(i32),

    #[error("{0}")]
    Other(String),
}

impl ClassifierError {
    /// Numeric code for console output; `-1` when the engine gave none.
    pub fn code(&self) -> i32 {
        match self {
            Self::Status(code) => *code,
            Self::Other(_) => -1,
        }
    }
}

/// A quantized int8 classifier that owns its input and output tensors.
///
/// The pipeline writes the input buffer, calls [`Classifier::invoke`], and
/// reads the output buffer. Buffer lengths and quantization parameters must
/// not change after [`Classifier::initialize`] succeeds.
pub trait Classifier {
    /// Load the model and allocate tensors.
    fn initialize(&mut self) -> Result<(), ClassifierError>;

    fn input_buffer(&mut self) -> &mut [i8];

    fn output_buffer(&self) -> &[i8];

    /// Raw `(scale, zero_point)` of a tensor.
    fn quantization_params(&self, role: TensorRole) -> (f32, i32);

    /// Run the model synchronously on the current input buffer.
    fn invoke(&mut self) -> Result<(), ClassifierError>;

    /// Scratch memory in use, when the engine tracks it.
    fn arena_used_bytes(&self) -> Option<usize> {
        None
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn initialize(&mut self) -> Result<(), ClassifierError> {
        (**self).initialize()
    }

    fn input_buffer(&mut self) -> &mut [i8] {
        (**self).input_buffer()
    }

    fn output_buffer(&self) -> &[i8] {
        (**self).output_buffer()
    }

    fn quantization_params(&self, role: TensorRole) -> (f32, i32) {
        (**self).quantization_params(role)
    }

    fn invoke(&mut self) -> Result<(), ClassifierError> {
        (**self).invoke()
    }

    fn arena_used_bytes(&self) -> Option<usize> {
        (**self).arena_used_bytes()
    }
}
