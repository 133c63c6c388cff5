//! Property-based tests for `mnist-quant`.
//!
//! Key invariants tested:
//! - `quantize` always lands in `[-128, 127]`
//! - values inside the representable range round-trip within one step
//! - `quantize` is monotone non-decreasing in its input
//! - `quantize_pixels` agrees with the scalar path element by element
//! - `dequantize` is total over every accepted zero point

use mnist_quant::{dequantize, normalize_pixel, quantize, quantize_pixels, QuantParams};
use proptest::prelude::*;

// ── helpers ───────────────────────────────────────────────────────────────

fn any_params() -> impl Strategy<Value = QuantParams> {
    (1e-4f32..4.0f32, -300i32..300i32)
        .prop_map(|(scale, zp)| QuantParams::new(scale, zp).expect("strategy yields valid scale"))
}

// ── quantize ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn quantize_stays_in_int8_range(x in 0.0f32..=1.0f32, params in any_params()) {
        let q = i32::from(quantize(x, params));
        prop_assert!((-128..=127).contains(&q), "q={q} for x={x}, {params}");
    }

    #[test]
    fn round_trip_within_one_step(x in 0.0f32..=1.0f32, params in any_params()) {
        let (lo, hi) = params.representable_range();
        prop_assume!(x >= lo && x <= hi);
        let back = dequantize(quantize(x, params), params);
        prop_assert!((back - x).abs() <= params.step() * 1.0001,
            "x={x} back={back} {params}");
    }

    #[test]
    fn quantize_is_monotone(a in 0.0f32..=1.0f32, b in 0.0f32..=1.0f32, params in any_params()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(quantize(lo, params) <= quantize(hi, params));
    }

    #[test]
    fn pixel_block_matches_scalar_path(
        pixels in prop::collection::vec(any::<u8>(), 1..64),
        params in any_params(),
    ) {
        let mut out = vec![0i8; pixels.len()];
        quantize_pixels(&pixels, params, &mut out).unwrap();
        for (i, &p) in pixels.iter().enumerate() {
            prop_assert_eq!(out[i], quantize(normalize_pixel(p), params));
        }
    }
}

// ── dequantize ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn dequantize_is_total_for_any_zero_point(
        code in any::<i8>(),
        scale in 1e-4f32..4.0f32,
        zero_point in any::<i32>(),
    ) {
        let params = QuantParams::new(scale, zero_point).unwrap();
        let x = dequantize(code, params);
        prop_assert!(x.is_finite(), "x={x} for code={code}, {params}");

        let (lo, hi) = params.representable_range();
        prop_assert!(lo <= x && x <= hi, "x={x} outside [{lo}, {hi}], {params}");
    }
}
