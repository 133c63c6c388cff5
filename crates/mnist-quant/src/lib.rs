//! Affine int8 quantization for the MNIST inference harness.
//!
//! The classifier consumes and produces signed 8-bit codes. Each tensor
//! carries a `(scale, zero_point)` pair and real values map to codes with
//!
//! ```text
//! q = clamp(round(x / scale + zero_point), -128, 127)
//! x = scale * (q - zero_point)
//! ```
//!
//! The two directions are not inverses: quantization is lossy, and values
//! outside the representable range saturate.
//!
//! ```
//! use mnist_quant::{dequantize, quantize, QuantParams};
//!
//! let params = QuantParams::new(1.0 / 255.0, -128).unwrap();
//! let q = quantize(1.0, params);
//! assert_eq!(q, 127);
//! assert!((dequantize(q, params) - 1.0).abs() <= params.step());
//! ```

use std::fmt;

use thiserror::Error;

pub mod utils;

pub use utils::{dequantize, normalize_pixel, quantize, quantize_pixels};

/// Smallest representable int8 code.
pub const QMIN: i32 = i8::MIN as i32;
/// Largest representable int8 code.
pub const QMAX: i32 = i8::MAX as i32;

/// Errors produced by the quantization codec.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QuantError {
    #[error("quantization scale must be positive and finite, got {scale}")]
    InvalidScale { scale: f32 },

    #[error("buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, QuantError>;

/// Scale / zero-point pair attached to one quantized tensor.
///
/// Construct through [`QuantParams::new`] so that the scale is known to be a
/// usable divisor; the codec functions rely on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    scale: f32,
    zero_point: i32,
}

impl QuantParams {
    /// Validate and build a parameter pair.
    pub fn new(scale: f32, zero_point: i32) -> Result<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(QuantError::InvalidScale { scale });
        }
        Ok(Self { scale, zero_point })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn zero_point(&self) -> i32 {
        self.zero_point
    }

    /// Size of one quantization step in real units.
    pub fn step(&self) -> f32 {
        self.scale
    }

    /// Real interval covered by the int8 codes under these parameters.
    pub fn representable_range(&self) -> (f32, f32) {
        (dequantize(i8::MIN, *self), dequantize(i8::MAX, *self))
    }
}

impl fmt::Display for QuantParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scale={:.6}, zero_point={}", self.scale, self.zero_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_scale() {
        assert_eq!(QuantParams::new(0.0, 0), Err(QuantError::InvalidScale { scale: 0.0 }));
    }

    #[test]
    fn rejects_negative_and_non_finite_scale() {
        assert!(QuantParams::new(-0.5, 0).is_err());
        assert!(QuantParams::new(f32::NAN, 0).is_err());
        assert!(QuantParams::new(f32::INFINITY, 0).is_err());
    }

    #[test]
    fn display_shows_both_fields() {
        let p = QuantParams::new(0.003921, -128).unwrap();
        assert_eq!(p.to_string(), "scale=0.003921, zero_point=-128");
    }

    #[test]
    fn representable_range_spans_codes() {
        let p = QuantParams::new(0.5, 0).unwrap();
        assert_eq!(p.representable_range(), (-64.0, 63.5));
    }
}
