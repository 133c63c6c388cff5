//! Host stand-in for the on-device engine: one int8 dense layer read from a
//! JSON weights file.
//!
//! The layer computes, per class `j`,
//!
//! ```text
//! acc_j = bias_j + sum_i (x_i - input.zero_point) * w_ji
//! y_j   = quantize(acc_j * input.scale * weight_scale, output)
//! ```
//!
//! with symmetric (zero-point 0) weights.

use std::fs;
use std::path::{Path, PathBuf};

use mnist_protocol::MNIST_PIXELS;
use mnist_quant::{quantize, QuantParams};
use mnist_session::{Classifier, ClassifierError, TensorRole, NUM_CLASSES};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// `initialize` status: no model path was configured.
pub const STATUS_NO_MODEL: i32 = 1;
/// `initialize` status: the weights file could not be read.
pub const STATUS_UNREADABLE: i32 = 2;
/// `initialize` status: the weights file is not a valid dense model.
pub const STATUS_INVALID_MODEL: i32 = 3;

/// Why a parsed weights file cannot be used.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("expected {expected} weight rows, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("weight row {class} has {found} entries, expected {expected}")]
    RowLength { class: usize, expected: usize, found: usize },

    #[error("expected {expected} biases, found {found}")]
    BiasCount { expected: usize, found: usize },

    #[error("{name} must be positive and finite, got {scale}")]
    InvalidScale { name: &'static str, scale: f32 },

    #[error("{name} {zero_point} is outside the int8 range")]
    ZeroPointRange { name: &'static str, zero_point: i32 },
}

/// Quantization of one tensor as stored in the weights file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensorQuant {
    pub scale: f32,
    pub zero_point: i32,
}

/// Weights file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseModel {
    pub input: TensorQuant,
    pub output: TensorQuant,
    pub weight_scale: f32,
    /// One row of `MNIST_PIXELS` weights per class.
    pub weights: Vec<Vec<i8>>,
    /// In accumulator units (`input.scale * weight_scale`).
    pub bias: Vec<i32>,
}

impl DenseModel {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Check shapes and scales, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.weights.len() != NUM_CLASSES {
            return Err(ModelError::RowCount { expected: NUM_CLASSES, found: self.weights.len() });
        }
        if let Some((class, row)) =
            self.weights.iter().enumerate().find(|(_, row)| row.len() != MNIST_PIXELS)
        {
            return Err(ModelError::RowLength { class, expected: MNIST_PIXELS, found: row.len() });
        }
        if self.bias.len() != NUM_CLASSES {
            return Err(ModelError::BiasCount { expected: NUM_CLASSES, found: self.bias.len() });
        }
        for (name, scale) in [
            ("input.scale", self.input.scale),
            ("output.scale", self.output.scale),
            ("weight_scale", self.weight_scale),
        ] {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(ModelError::InvalidScale { name, scale });
            }
        }
        for (name, zero_point) in
            [("input.zero_point", self.input.zero_point), ("output.zero_point", self.output.zero_point)]
        {
            if !(i32::from(i8::MIN)..=i32::from(i8::MAX)).contains(&zero_point) {
                return Err(ModelError::ZeroPointRange { name, zero_point });
            }
        }
        Ok(())
    }

    fn weight_bytes(&self) -> usize {
        self.weights.iter().map(Vec::len).sum::<usize>() + self.bias.len() * 4
    }
}

struct Loaded {
    model: DenseModel,
    output: QuantParams,
    /// Real value of one accumulator unit.
    acc_scale: f32,
}

/// [`Classifier`] backed by a [`DenseModel`].
pub struct DenseClassifier {
    model_path: Option<PathBuf>,
    preloaded: Option<DenseModel>,
    loaded: Option<Loaded>,
    input: Vec<i8>,
    output: Vec<i8>,
}

impl DenseClassifier {
    /// Classifier that loads `model_path` on `initialize`. `None` makes
    /// initialization fail with [`STATUS_NO_MODEL`].
    pub fn new(model_path: Option<PathBuf>) -> Self {
        Self { model_path, preloaded: None, loaded: None, input: Vec::new(), output: Vec::new() }
    }

    /// Classifier over an in-memory model; still validated on `initialize`.
    pub fn from_model(model: DenseModel) -> Self {
        Self { preloaded: Some(model), ..Self::new(None) }
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    fn read_model(&mut self) -> Result<DenseModel, ClassifierError> {
        if let Some(model) = self.preloaded.take() {
            return Ok(model);
        }
        let path = self.model_path.as_deref().ok_or_else(|| {
            warn!("no model path configured");
            ClassifierError::Status(STATUS_NO_MODEL)
        })?;
        let text = fs::read_to_string(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "cannot read weights file");
            ClassifierError::Status(STATUS_UNREADABLE)
        })?;
        DenseModel::from_json(&text).map_err(|e| {
            warn!(path = %path.display(), error = %e, "cannot parse weights file");
            ClassifierError::Status(STATUS_INVALID_MODEL)
        })
    }
}

impl Classifier for DenseClassifier {
    fn initialize(&mut self) -> Result<(), ClassifierError> {
        let model = self.read_model()?;
        model.validate().map_err(|e| {
            warn!(error = %e, "rejecting weights file");
            ClassifierError::Status(STATUS_INVALID_MODEL)
        })?;
        let output = QuantParams::new(model.output.scale, model.output.zero_point)
            .map_err(|_| ClassifierError::Status(STATUS_INVALID_MODEL))?;

        let acc_scale = model.input.scale * model.weight_scale;
        self.input = vec![0; MNIST_PIXELS];
        self.output = vec![0; NUM_CLASSES];
        info!(
            path = ?self.model_path,
            weight_bytes = model.weight_bytes(),
            "dense classifier loaded"
        );
        self.loaded = Some(Loaded { model, output, acc_scale });
        Ok(())
    }

    fn input_buffer(&mut self) -> &mut [i8] {
        &mut self.input
    }

    fn output_buffer(&self) -> &[i8] {
        &self.output
    }

    fn quantization_params(&self, role: TensorRole) -> (f32, i32) {
        let Some(loaded) = &self.loaded else {
            return (0.0, 0);
        };
        let q = match role {
            TensorRole::Input => loaded.model.input,
            TensorRole::Output => loaded.model.output,
        };
        (q.scale, q.zero_point)
    }

    fn invoke(&mut self) -> Result<(), ClassifierError> {
        let loaded = self
            .loaded
            .as_ref()
            .ok_or_else(|| ClassifierError::Other("invoke before initialize".into()))?;
        let zp = i64::from(loaded.model.input.zero_point);

        for ((out, row), bias) in
            self.output.iter_mut().zip(&loaded.model.weights).zip(&loaded.model.bias)
        {
            let acc = row.iter().zip(&self.input).fold(i64::from(*bias), |acc, (&w, &x)| {
                acc + (i64::from(x) - zp) * i64::from(w)
            });
            *out = quantize(acc as f32 * loaded.acc_scale, loaded.output);
        }
        debug!(output = ?self.output, "dense layer evaluated");
        Ok(())
    }

    fn arena_used_bytes(&self) -> Option<usize> {
        let loaded = self.loaded.as_ref()?;
        Some(self.input.len() + self.output.len() + loaded.model.weight_bytes())
    }
}
