//! Logit post-processing for the MNIST classifier output.
//!
//! The classifier emits one int8 code per class. This crate turns those
//! codes into a percentage distribution and ranks the classes.
//!
//! ## Typical pipeline
//!
//! ```
//! use mnist_logits::{probabilities_from_quantized, rank};
//! use mnist_quant::QuantParams;
//!
//! let logits = [127i8, -128, 0, 0, 0, 0, 0, 0, 0, 0];
//! let params = QuantParams::new(1.0, 0).unwrap();
//!
//! let probs = probabilities_from_quantized(&logits, params).unwrap();
//! let ranked = rank(&probs);
//! assert_eq!(ranked[0].class_index, 0);
//! assert!(ranked[0].probability > 99.9);
//! ```

use std::cmp::Ordering;

use mnist_quant::{dequantize, QuantParams};
use serde::Serialize;
use thiserror::Error;

/// Total mass of a probability vector produced by this crate.
pub const PERCENT: f32 = 100.0;

/// Errors from logit post-processing.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LogitsError {
    #[error("cannot build a distribution from an empty logit vector")]
    Empty,
}

/// One class with its probability, as produced by [`rank`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub class_index: usize,
    pub probability: f32,
}

/// Dequantize `logits` and convert them to percentages that sum to 100.
///
/// Uses the max-subtracted softmax, so the largest logit always contributes
/// `exp(0) = 1` and nothing overflows.
pub fn probabilities_from_quantized(
    logits: &[i8],
    params: QuantParams,
) -> Result<Vec<f32>, LogitsError> {
    if logits.is_empty() {
        return Err(LogitsError::Empty);
    }
    let mut values: Vec<f32> = logits.iter().map(|&q| dequantize(q, params)).collect();
    softmax_percent_in_place(&mut values);
    Ok(values)
}

/// Softmax in place, scaled so the outputs sum to [`PERCENT`].
///
/// Falls back to a uniform distribution when every exponential underflows
/// to zero. An empty slice is left untouched.
///
/// ```
/// use mnist_logits::softmax_percent_in_place;
///
/// let mut v = vec![1.0f32, 1.0, 1.0, 1.0];
/// softmax_percent_in_place(&mut v);
/// assert!(v.iter().all(|p| (p - 25.0).abs() < 1e-4));
/// ```
pub fn softmax_percent_in_place(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for v in values.iter_mut() {
        let e = (*v - max).exp();
        *v = e;
        sum += e;
    }
    if sum > 0.0 && sum.is_finite() {
        let k = PERCENT / sum;
        for v in values.iter_mut() {
            *v *= k;
        }
    } else {
        #[allow(clippy::cast_precision_loss)]
        let uniform = PERCENT / values.len() as f32;
        for v in values.iter_mut() {
            *v = uniform;
        }
    }
}

/// Rank classes by descending probability.
///
/// The sort is stable: equal probabilities keep ascending class order.
/// Ranking an already-ranked vector therefore yields the same order.
pub fn rank(probs: &[f32]) -> Vec<Prediction> {
    let mut ranked: Vec<Prediction> = probs
        .iter()
        .enumerate()
        .map(|(class_index, &probability)| Prediction { class_index, probability })
        .collect();
    ranked.sort_by(|a, b| f32_descending(a.probability, b.probability));
    ranked
}

/// First `k` entries of a ranked list (fewer if the list is shorter).
pub fn top_k(ranked: &[Prediction], k: usize) -> &[Prediction] {
    &ranked[..k.min(ranked.len())]
}

/// Index of the maximum value.
///
/// Ties resolve to the **first** maximum, matching [`rank`]. Returns `0` on
/// an empty slice.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if f32_descending(v, values[best]) == Ordering::Less {
            best = i;
        }
    }
    best
}

// --- helpers ---------------------------------------------------------------

#[inline]
fn f32_descending(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

// ---------------------------------------------------------------------------
