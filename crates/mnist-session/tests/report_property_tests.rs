//! Property-based tests for `Report`.
//!
//! Key invariants tested:
//! - the device screen is exactly five rows of at most `SCREEN_COLUMNS` chars
//! - the screen's ranked rows follow the report's ranking
//! - the verdict row agrees with `correct`

use mnist_session::{Report, SCREEN_COLUMNS, SCREEN_ROWS};
use proptest::prelude::*;

fn any_probabilities() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(0.0f32..=100.0f32, 3..=10)
}

proptest! {
    #[test]
    fn screen_fits_the_panel(probs in any_probabilities(), label in any::<u8>()) {
        let report = Report::build(&probs, label).unwrap();
        let screen = report.screen();
        let lines = screen.lines();

        prop_assert_eq!(lines.len(), SCREEN_ROWS);
        for line in lines {
            prop_assert!(line.chars().count() <= SCREEN_COLUMNS, "{line:?} too wide");
        }
        prop_assert_eq!(&lines[0], &format!("LABEL: {label}"));
    }

    #[test]
    fn screen_rows_follow_ranking(probs in any_probabilities(), label in 0u8..10) {
        let report = Report::build(&probs, label).unwrap();
        let screen = report.screen();
        let lines = screen.lines();

        for (i, p) in report.top().iter().enumerate() {
            let prefix = format!("{}:{} ", i + 1, p.class_index);
            prop_assert!(lines[i + 1].starts_with(&prefix), "{:?} vs {prefix}", lines[i + 1]);
        }
        let verdict = if report.correct { "OK!" } else { "ERR" };
        prop_assert_eq!(&lines[4], &format!("PRED:{} {verdict}", report.predicted));
    }
}
