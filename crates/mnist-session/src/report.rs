//! Ranking a probability vector into the console and screen reports.

use std::fmt::Write as _;

use mnist_logits::{rank, top_k, LogitsError, Prediction};
use serde::Serialize;

use crate::display::Screen;

/// Number of ranked predictions shown on the device.
pub const SCREEN_TOP_K: usize = 3;

/// Result of one inference, ready to be printed or drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Ground-truth label carried on the record.
    pub label: u8,
    pub predicted: usize,
    /// Probability of the predicted class, in percent.
    pub confidence: f32,
    pub correct: bool,
    /// Percentages indexed by class.
    pub probabilities: Vec<f32>,
    /// Classes by descending probability; ties keep class order.
    pub ranking: Vec<Prediction>,
}

impl Report {
    pub fn build(probabilities: &[f32], label: u8) -> Result<Self, LogitsError> {
        let ranking = rank(probabilities);
        let top = *ranking.first().ok_or(LogitsError::Empty)?;
        Ok(Self {
            label,
            predicted: top.class_index,
            confidence: top.probability,
            correct: top.class_index == usize::from(label),
            probabilities: probabilities.to_vec(),
            ranking,
        })
    }

    pub fn top(&self) -> &[Prediction] {
        top_k(&self.ranking, SCREEN_TOP_K)
    }

    /// Compact five-line device report.
    pub fn screen(&self) -> Screen {
        let mut screen = Screen::new().line(format!("LABEL: {}", self.label));
        for (i, p) in self.top().iter().enumerate() {
            screen = screen.line(format!("{}:{} {:.1}%", i + 1, p.class_index, p.probability));
        }
        let verdict = if self.correct { "OK!" } else { "ERR" };
        screen.line(format!("PRED:{} {verdict}", self.predicted))
    }

    /// Detailed multi-line console report.
    pub fn console_text(&self) -> String {
        let mut out = String::from("Probabilities:\n");
        for (class, p) in self.probabilities.iter().enumerate() {
            let _ = write!(out, "  {class}: {p:6.2}%");
            if class == usize::from(self.label) {
                out.push_str(" <- label");
            }
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "\nResult: pred={} label={} {} (confidence: {:.1}%)",
            self.predicted,
            self.label,
            if self.correct { "OK" } else { "ERROR" },
            self.confidence
        );
        out
    }
}
