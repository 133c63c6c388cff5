//! Scalar and slice conversions between real values and int8 codes.

use crate::{QuantError, QuantParams, Result, QMAX, QMIN};

/// Full-scale value of an 8-bit grayscale pixel.
pub const PIXEL_MAX: f32 = 255.0;

/// Quantize a real value to an int8 code.
///
/// The value is rounded after the affine transform and clamped into
/// `[-128, 127]` before narrowing, so out-of-range inputs saturate instead
/// of wrapping. A NaN input maps to `0`.
pub fn quantize(value: f32, params: QuantParams) -> i8 {
    let q = (value / params.scale() + params.zero_point() as f32).round();
    q.clamp(QMIN as f32, QMAX as f32) as i8
}

/// Map an int8 code back to a real value.
///
/// The offset from the zero point is taken in `i64`, so any zero point the
/// parameters accept decodes without overflow.
pub fn dequantize(code: i8, params: QuantParams) -> f32 {
    params.scale() * (i64::from(code) - i64::from(params.zero_point())) as f32
}

/// Normalize an 8-bit pixel intensity into `[0, 1]`.
#[inline]
pub fn normalize_pixel(pixel: u8) -> f32 {
    f32::from(pixel) / PIXEL_MAX
}

/// Normalize and quantize `pixels` into the caller's `out` buffer.
///
/// `out` is usually the classifier's input tensor, so it is written in place
/// and never reallocated.
pub fn quantize_pixels(pixels: &[u8], params: QuantParams, out: &mut [i8]) -> Result<()> {
    if pixels.len() != out.len() {
        return Err(QuantError::LengthMismatch { expected: out.len(), actual: pixels.len() });
    }
    for (dst, &p) in out.iter_mut().zip(pixels) {
        *dst = quantize(normalize_pixel(p), params);
    }
    tracing::trace!(len = pixels.len(), %params, "quantized pixel block");
    Ok(())
}
