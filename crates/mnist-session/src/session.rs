//! Two-phase inference session over an external classifier.

use mnist_logits::{probabilities_from_quantized, LogitsError};
use mnist_protocol::{SampleRecord, MNIST_PIXELS};
use mnist_quant::{quantize_pixels, QuantError, QuantParams};
use thiserror::Error;
use tracing::{debug, info};

use crate::classifier::{Classifier, ClassifierError, TensorRole};
use crate::report::Report;
use crate::NUM_CLASSES;

/// Errors raised while opening a session or processing a record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("classifier initialization failed: {0}")]
    Init(ClassifierError),

    #[error("{role} tensor has {actual} elements, expected {expected}")]
    TensorShape { role: TensorRole, expected: usize, actual: usize },

    #[error("invalid {role} quantization parameters: {source}")]
    InvalidParams { role: TensorRole, source: QuantError },

    #[error("classifier invocation failed: {0}")]
    Invoke(ClassifierError),

    #[error(transparent)]
    Quant(#[from] QuantError),

    #[error(transparent)]
    Logits(#[from] LogitsError),
}

impl SessionError {
    /// Status code for console output, when the failure came from the engine.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Init(e) | Self::Invoke(e) => Some(e.code()),
            _ => None,
        }
    }
}

/// A classifier that has not been initialized yet.
pub struct Session<C> {
    classifier: C,
}

impl<C: Classifier> Session<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// Initialize the classifier, check its tensors and cache the
    /// quantization parameters.
    ///
    /// Failure is final: the classifier is dropped with the error.
    pub fn open(mut self) -> Result<ReadySession<C>, SessionError> {
        self.classifier.initialize().map_err(SessionError::Init)?;

        check_len(TensorRole::Input, MNIST_PIXELS, self.classifier.input_buffer().len())?;
        check_len(TensorRole::Output, NUM_CLASSES, self.classifier.output_buffer().len())?;

        let input = fetch_params(&self.classifier, TensorRole::Input)?;
        let output = fetch_params(&self.classifier, TensorRole::Output)?;
        info!(
            %input,
            %output,
            arena_bytes = ?self.classifier.arena_used_bytes(),
            "classifier ready"
        );

        Ok(ReadySession { classifier: self.classifier, input, output })
    }
}

fn check_len(role: TensorRole, expected: usize, actual: usize) -> Result<(), SessionError> {
    if expected != actual {
        return Err(SessionError::TensorShape { role, expected, actual });
    }
    Ok(())
}

fn fetch_params<C: Classifier>(
    classifier: &C,
    role: TensorRole,
) -> Result<QuantParams, SessionError> {
    let (scale, zero_point) = classifier.quantization_params(role);
    QuantParams::new(scale, zero_point).map_err(|source| SessionError::InvalidParams { role, source })
}

/// An initialized classifier with its cached quantization parameters.
pub struct ReadySession<C> {
    classifier: C,
    input: QuantParams,
    output: QuantParams,
}

impl<C: Classifier> ReadySession<C> {
    pub fn input_params(&self) -> QuantParams {
        self.input
    }

    pub fn output_params(&self) -> QuantParams {
        self.output
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn into_inner(self) -> C {
        self.classifier
    }

    /// Run one record end to end.
    ///
    /// An invocation failure aborts only this record; the session stays
    /// usable for the next one.
    pub fn process(&mut self, record: &SampleRecord) -> Result<Report, SessionError> {
        quantize_pixels(&record.pixels, self.input, self.classifier.input_buffer())?;

        self.classifier.invoke().map_err(SessionError::Invoke)?;

        let probs = probabilities_from_quantized(self.classifier.output_buffer(), self.output)?;
        let report = Report::build(&probs, record.label)?;
        debug!(
            label = record.label,
            predicted = report.predicted,
            confidence = report.confidence,
            "inference complete"
        );
        Ok(report)
    }
}
