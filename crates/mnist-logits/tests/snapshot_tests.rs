//! Snapshot tests for the ranking and distribution output.
//!
//! Pins well-known inputs so numerical or ordering regressions show up at
//! review time.

use mnist_logits::{probabilities_from_quantized, rank, top_k};
use mnist_quant::QuantParams;

fn render(probs: &[f32]) -> String {
    rank(probs)
        .iter()
        .map(|p| format!("{}:{:.1}", p.class_index, p.probability))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn saturated_logit_dominates() {
    let logits = [127i8, -128, 0, 0, 0, 0, 0, 0, 0, 0];
    let probs = probabilities_from_quantized(&logits, QuantParams::new(1.0, 0).unwrap()).unwrap();
    let ranked = rank(&probs);
    let head = top_k(&ranked, 3)
        .iter()
        .map(|p| format!("{}:{:.1}", p.class_index, p.probability))
        .collect::<Vec<_>>()
        .join(" ");
    insta::assert_snapshot!(head, @"0:100.0 1:0.0 2:0.0");
}

#[test]
fn uniform_logits_rank_in_class_order() {
    let probs =
        probabilities_from_quantized(&[5i8; 4], QuantParams::new(0.25, 0).unwrap()).unwrap();
    insta::assert_snapshot!(render(&probs), @"0:25.0 1:25.0 2:25.0 3:25.0");
}

#[test]
fn ties_keep_ascending_class_order() {
    insta::assert_snapshot!(render(&[10.0, 40.0, 10.0, 40.0]), @"1:40.0 3:40.0 0:10.0 2:10.0");
}
